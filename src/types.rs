// src/types.rs
//
// Common shared types for the elevation core: the decision, the optimizer's
// box constraint, the evaluation horizon and the objective sign convention.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Currency amount in USD.
pub type Usd = f64;

/// Calendar year.
pub type Year = i32;

/// A candidate decision: how many feet to raise the house.
///
/// Not validated per evaluation; the optimizer's box constraint keeps
/// candidates inside the feasible range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub elevation_ft: f64,
}

impl Decision {
    /// Number of scalar components in a decision vector.
    pub const DIMENSION: usize = 1;

    pub fn new(elevation_ft: f64) -> Self {
        Self { elevation_ft }
    }

    /// Build from the optimizer's flat representation.
    pub fn from_slice(x: &[f64]) -> Result<Self, ConfigError> {
        match x {
            [h] => Ok(Self::new(*h)),
            _ => Err(ConfigError::DimensionMismatch {
                expected: Self::DIMENSION,
                got: x.len(),
            }),
        }
    }
}

/// Per-dimension lower/upper bounds on the decision domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Validate and build a box. Every dimension needs finite `lower < upper`.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, ConfigError> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(ConfigError::BoundsShape {
                lower_len: lower.len(),
                upper_len: upper.len(),
            });
        }
        for (dimension, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(ConfigError::InvalidBounds {
                    dimension,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// One-dimensional box `[lower, upper]`.
    pub fn scalar(lower: f64, upper: f64) -> Result<Self, ConfigError> {
        Self::new(vec![lower], vec![upper])
    }

    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Project `x` into the box in place.
    pub fn clamp(&self, x: &mut [f64]) {
        for ((xi, &lo), &hi) in x.iter_mut().zip(&self.lower).zip(&self.upper) {
            *xi = xi.clamp(lo, hi);
        }
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
            && x
                .iter()
                .zip(&self.lower)
                .zip(&self.upper)
                .all(|((&xi, &lo), &hi)| xi >= lo && xi <= hi)
    }
}

/// Ordered sequence of distinct years over which damages accrue.
///
/// May be empty, in which case only the construction cost remains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawHorizon")]
pub struct Horizon {
    years: Vec<Year>,
}

#[derive(Deserialize)]
struct RawHorizon {
    years: Vec<Year>,
}

impl From<RawHorizon> for Horizon {
    fn from(raw: RawHorizon) -> Self {
        Horizon::new(raw.years)
    }
}

impl Horizon {
    /// Sorts and drops repeats, so each year is charged exactly once.
    pub fn new(mut years: Vec<Year>) -> Self {
        years.sort_unstable();
        years.dedup();
        Self { years }
    }

    /// Contiguous inclusive range `first..=last` (empty if `last < first`).
    pub fn range(first: Year, last: Year) -> Self {
        Self {
            years: (first..=last).collect(),
        }
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    /// Discounting reference year (the earliest year in the horizon).
    pub fn first_year(&self) -> Option<Year> {
        self.years.iter().copied().min()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Sign convention of the scalar objective.
///
/// - `Minimize`: objective = reduced expected cost (what [`crate::Optimizer`]
///   expects).
/// - `Maximize`: objective = negated reduced cost, for maximising optimizers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

impl Sense {
    pub fn apply(self, cost: f64) -> f64 {
        match self {
            Sense::Minimize => cost,
            Sense::Maximize => -cost,
        }
    }
}
