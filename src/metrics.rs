// src/metrics.rs
//
// Summary statistics for per-SOW cost distributions.
// - OnlineStats: Welford running mean/variance + min/max.
// - quantile_sorted: linear-interpolated quantile of a sorted slice.
// - CostDistribution: what the recommended decision costs across the
//   ensemble (moments, quantiles, upper-tail CVaR).
//
// Costs are losses: the bad tail is the upper one.

use serde::{Deserialize, Serialize};

/// Confidence level of the reported tail metric.
pub const DEFAULT_CVAR_ALPHA: f64 = 0.95;

#[derive(Debug, Clone, Copy)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for OnlineStats {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl OnlineStats {
    /// Adds a sample if finite. Non-finite samples are ignored.
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.n += 1;
        self.min = self.min.min(x);
        self.max = self.max.max(x);

        let delta = x - self.mean;
        self.mean += delta / (self.n as f64);
        self.m2 += delta * (x - self.mean);
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn min(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.max
        }
    }

    /// Sample standard deviation (divide by n-1).
    pub fn stddev(&self) -> f64 {
        if self.n <= 1 {
            0.0
        } else {
            (self.m2 / ((self.n as f64) - 1.0)).sqrt()
        }
    }
}

/// Quantile of a sorted slice with linear interpolation; NaN when empty.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let idx = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = idx.floor() as usize;
            let hi = (idx.ceil() as usize).min(n - 1);
            let w = idx - lo as f64;
            sorted[lo] * (1.0 - w) + sorted[hi] * w
        }
    }
}

/// Distribution of one decision's cost across the ensemble (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDistribution {
    pub n: u64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p50: f64,
    pub p95: f64,
    /// Mean of the costs at or above the 95th percentile.
    pub cvar95: f64,
}

impl CostDistribution {
    /// Non-finite costs are dropped before summarising.
    pub fn from_costs(costs: &[f64]) -> Self {
        let mut stats = OnlineStats::default();
        let mut sorted: Vec<f64> = Vec::with_capacity(costs.len());
        for &c in costs {
            stats.add(c);
            if c.is_finite() {
                sorted.push(c);
            }
        }
        sorted.sort_by(f64::total_cmp);

        let p95 = quantile_sorted(&sorted, DEFAULT_CVAR_ALPHA);
        let tail: Vec<f64> = sorted.iter().copied().filter(|&c| c >= p95).collect();
        let cvar95 = if tail.is_empty() {
            p95
        } else {
            tail.iter().sum::<f64>() / tail.len() as f64
        };

        Self {
            n: stats.n(),
            mean: stats.mean(),
            std: stats.stddev(),
            min: stats.min(),
            max: stats.max(),
            p05: quantile_sorted(&sorted, 0.05),
            p50: quantile_sorted(&sorted, 0.50),
            p95,
            cvar95,
        }
    }
}
