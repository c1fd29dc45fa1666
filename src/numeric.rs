// src/numeric.rs
//
// Small numeric helpers shared by the sampler and evaluators:
// - linspace / trapezoid: fixed-node quadrature
// - standard_normal / normal / exponential: variates drawn from an owned Rng
//
// All helpers are pure given their inputs (and the RNG state).

use std::f64::consts::PI;

use rand::Rng;

/// `n` evenly spaced points from `start` to `end` inclusive.
///
/// `n == 1` yields `[start]`; `n == 0` yields an empty vector.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / ((n - 1) as f64);
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * (i as f64)
                    }
                })
                .collect()
        }
    }
}

/// Trapezoidal rule over (possibly non-uniform) nodes `xs` with values `ys`.
///
/// Returns 0.0 for fewer than two nodes.
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}

/// Uniform draw in the open interval (0, 1).
pub fn open_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u > 0.0 {
            return u;
        }
    }
}

/// Standard normal variate via Box-Muller.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = open_unit(rng);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Normal variate with the given mean and standard deviation.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    mean + std_dev * standard_normal(rng)
}

/// Exponential variate with the given mean (scale), strictly positive.
pub fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    -mean * open_unit(rng).ln()
}

/// Ordering key for objective values: NaN ranks as +inf, so it never wins.
pub fn rank(v: f64) -> f64 {
    if v.is_nan() {
        f64::INFINITY
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn linspace_hits_both_endpoints() {
        let xs = linspace(0.0, 14.0, 101);
        assert_eq!(xs.len(), 101);
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[100], 14.0);
        assert!((xs[1] - 0.14).abs() < 1e-12);
        assert!(linspace(1.0, 2.0, 0).is_empty());
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
    }

    #[test]
    fn trapezoid_is_exact_for_linear_functions() {
        let xs = linspace(0.0, 2.0, 7);
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 1.0).collect();
        // ∫_0^2 (3x + 1) dx = 6 + 2 = 8
        assert!((trapezoid(&xs, &ys) - 8.0).abs() < 1e-12);
        assert_eq!(trapezoid(&[1.0], &[5.0]), 0.0);
    }

    #[test]
    fn trapezoid_converges_on_smooth_integrand() {
        let xs = linspace(0.0, PI, 200);
        let ys: Vec<f64> = xs.iter().map(|x| x.sin()).collect();
        assert!((trapezoid(&xs, &ys) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn normal_and_exponential_moments() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 50_000;
        let xs: Vec<f64> = (0..n).map(|_| normal(&mut rng, 5.0, 1.0)).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 5.0).abs() < 0.03);
        assert!((var - 1.0).abs() < 0.05);

        let es: Vec<f64> = (0..n).map(|_| exponential(&mut rng, 1.5)).collect();
        assert!(es.iter().all(|&e| e > 0.0));
        let emean = es.iter().sum::<f64>() / n as f64;
        assert!((emean - 1.5).abs() < 0.05);
    }
}
