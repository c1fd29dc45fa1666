// src/slr.rs
//
// Sea-level-rise trajectories.
//
// The evaluator only sees the `SeaLevelModel` trait: a pure callable from
// year to local mean sea level (feet, relative to the gauge datum). Two
// implementations are provided for reference data:
// - SlrTrajectory: fitted parametric curve (quadratic trend plus a linear
//   acceleration term switched on after a breakpoint year).
// - TabulatedSlr: year/level table with linear interpolation.
//
// Queries outside a model's valid years are a ModelError, never clamped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::Year;

/// Reference year of the parametric trend terms.
pub const SLR_REFERENCE_YEAR: Year = 2000;

/// Year → sea level (ft). Implementations must be pure and thread-safe.
pub trait SeaLevelModel: Send + Sync + fmt::Debug {
    fn sea_level_ft(&self, year: Year) -> Result<f64, ModelError>;
}

/// Fitted parametric trajectory:
///
/// `slr(t) = a + b (t − 2000) + c (t − 2000)² + c* · max(t − t*, 0)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlrTrajectory {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub t_star: f64,
    pub c_star: f64,
    /// Inclusive year window the fit is valid for (unbounded if absent).
    #[serde(default)]
    pub valid_years: Option<(Year, Year)>,
}

impl SlrTrajectory {
    pub fn new(a: f64, b: f64, c: f64, t_star: f64, c_star: f64) -> Self {
        Self {
            a,
            b,
            c,
            t_star,
            c_star,
            valid_years: None,
        }
    }

    pub fn with_valid_years(mut self, first: Year, last: Year) -> Self {
        self.valid_years = Some((first, last));
        self
    }
}

impl SeaLevelModel for SlrTrajectory {
    fn sea_level_ft(&self, year: Year) -> Result<f64, ModelError> {
        if let Some((first, last)) = self.valid_years {
            if year < first || year > last {
                return Err(ModelError::YearOutOfDomain { year, first, last });
            }
        }
        let t = f64::from(year);
        let dt = t - f64::from(SLR_REFERENCE_YEAR);
        let jump = (t - self.t_star).max(0.0);
        Ok(self.a + self.b * dt + self.c * dt * dt + self.c_star * jump)
    }
}

/// Tabulated trajectory, linearly interpolated between listed years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulatedSlr {
    points: Vec<(Year, f64)>,
}

impl TabulatedSlr {
    /// Build from `(year, level_ft)` points; sorted by year on construction.
    /// Returns None for an empty table.
    pub fn new(mut points: Vec<(Year, f64)>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        points.sort_by_key(|&(y, _)| y);
        Some(Self { points })
    }

    fn domain(&self) -> (Year, Year) {
        // Non-empty by construction.
        (self.points[0].0, self.points[self.points.len() - 1].0)
    }
}

impl SeaLevelModel for TabulatedSlr {
    fn sea_level_ft(&self, year: Year) -> Result<f64, ModelError> {
        let (first, last) = self.domain();
        if year < first || year > last {
            return Err(ModelError::YearOutOfDomain { year, first, last });
        }
        let idx = self.points.partition_point(|&(y, _)| y < year);
        let (y1, v1) = self.points[idx];
        if y1 == year || idx == 0 {
            return Ok(v1);
        }
        let (y0, v0) = self.points[idx - 1];
        let w = f64::from(year - y0) / f64::from(y1 - y0);
        Ok(v0 + w * (v1 - v0))
    }
}

/// Built-in set of fitted trajectories (feet) used when a run spec does not
/// list its own.
pub fn default_trajectories() -> Vec<SlrTrajectory> {
    vec![
        SlrTrajectory::new(0.00, 0.0100, 0.00005, 2060.0, 0.010),
        SlrTrajectory::new(0.00, 0.0120, 0.00010, 2050.0, 0.030),
        SlrTrajectory::new(0.02, 0.0090, 0.00002, 2080.0, 0.005),
        SlrTrajectory::new(-0.01, 0.0110, 0.00015, 2040.0, 0.050),
        SlrTrajectory::new(0.00, 0.0100, 0.00008, 2070.0, 0.020),
    ]
}
