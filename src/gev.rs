// src/gev.rs
//
// Generalized extreme value (GEV) distribution for the annual storm-surge
// peak. Parameterised by location μ, scale σ and shape ξ:
//
//   t(x) = (1 + ξ (x − μ)/σ)^(−1/ξ)   (ξ ≠ 0)
//   t(x) = exp(−(x − μ)/σ)            (ξ = 0)
//   F(x) = exp(−t(x)),  f(x) = t(x)^(ξ+1) exp(−t(x)) / σ
//
// A non-positive or non-finite scale is a degenerate (zero-width)
// distribution; callers treat it as carrying no damage.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::numeric::open_unit;

/// |ξ| below this is treated as the Gumbel limit.
const GUMBEL_SHAPE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneralizedExtremeValue {
    pub location: f64,
    pub scale: f64,
    pub shape: f64,
}

impl GeneralizedExtremeValue {
    pub fn new(location: f64, scale: f64, shape: f64) -> Self {
        Self {
            location,
            scale,
            shape,
        }
    }

    /// True when the distribution has no spread (or invalid parameters).
    pub fn is_degenerate(&self) -> bool {
        !(self.scale.is_finite() && self.scale > 0.0)
            || !self.location.is_finite()
            || !self.shape.is_finite()
    }

    fn is_gumbel(&self) -> bool {
        self.shape.abs() < GUMBEL_SHAPE_EPS
    }

    /// t(x), or None outside the support.
    fn t(&self, x: f64) -> Option<f64> {
        let z = (x - self.location) / self.scale;
        if self.is_gumbel() {
            Some((-z).exp())
        } else {
            let arg = 1.0 + self.shape * z;
            if arg <= 0.0 {
                None
            } else {
                Some(arg.powf(-1.0 / self.shape))
            }
        }
    }

    /// Probability density at `x` (0 outside the support).
    pub fn pdf(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        match self.t(x) {
            Some(t) if t.is_finite() => t.powf(self.shape + 1.0) * (-t).exp() / self.scale,
            _ => 0.0,
        }
    }

    /// Cumulative distribution at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return if x >= self.location { 1.0 } else { 0.0 };
        }
        match self.t(x) {
            Some(t) => (-t).exp(),
            // Outside the support: below the lower end point for ξ > 0,
            // above the upper end point for ξ < 0.
            None => {
                if self.shape > 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    /// Inverse CDF for `p` in (0, 1).
    pub fn quantile(&self, p: f64) -> f64 {
        if self.is_degenerate() {
            return self.location;
        }
        let y = -p.ln();
        if self.is_gumbel() {
            self.location - self.scale * y.ln()
        } else {
            self.location + self.scale * (y.powf(-self.shape) - 1.0) / self.shape
        }
    }

    /// Draw one annual surge peak by inversion.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.quantile(open_unit(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{linspace, trapezoid};

    #[test]
    fn quantile_inverts_cdf() {
        for &shape in &[-0.2, 0.0, 0.1, 0.3] {
            let d = GeneralizedExtremeValue::new(5.0, 1.5, shape);
            for &p in &[0.001, 0.1, 0.5, 0.9, 0.999] {
                let x = d.quantile(p);
                assert!((d.cdf(x) - p).abs() < 1e-10, "shape={shape} p={p}");
            }
        }
    }

    #[test]
    fn pdf_integrates_to_one_over_central_mass() {
        let d = GeneralizedExtremeValue::new(5.0, 1.0, 0.1);
        let lo = d.quantile(1e-7);
        let hi = d.quantile(1.0 - 1e-7);
        let xs = linspace(lo, hi, 4000);
        let ys: Vec<f64> = xs.iter().map(|&x| d.pdf(x)).collect();
        assert!((trapezoid(&xs, &ys) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn pdf_is_zero_outside_support() {
        // ξ > 0: lower end point at μ − σ/ξ = 5 − 10 = −5.
        let d = GeneralizedExtremeValue::new(5.0, 1.0, 0.1);
        assert_eq!(d.pdf(-6.0), 0.0);
        assert_eq!(d.cdf(-6.0), 0.0);
        // ξ < 0: upper end point at μ − σ/ξ = 5 + 5 = 10.
        let d = GeneralizedExtremeValue::new(5.0, 1.0, -0.2);
        assert_eq!(d.pdf(11.0), 0.0);
        assert_eq!(d.cdf(11.0), 1.0);
    }

    #[test]
    fn zero_scale_is_degenerate() {
        let d = GeneralizedExtremeValue::new(5.0, 0.0, 0.1);
        assert!(d.is_degenerate());
        assert_eq!(d.pdf(5.0), 0.0);
        assert_eq!(d.quantile(0.9), 5.0);
    }
}
