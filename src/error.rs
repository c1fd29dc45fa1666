// src/error.rs
//
// Error taxonomy for the elevation core.
//
// - ConfigError: invalid setup (bounds, empty ensemble, non-positive asset
//   fields). Raised before any optimisation starts.
// - ModelError: failures of the external reference-data models (missing
//   depth-damage row, trajectory lookup outside its domain, elevation beyond
//   the cost table). Never replaced with a default value.
// - Error: the union of both, used at the aggregator / optimizer boundary.
//
// Numerical degeneracies (zero-width surge support, empty horizon) are not
// errors; they resolve to zero expected damage where they occur.

use std::fmt;

/// Invalid configuration detected at setup time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Box constraint with `lower >= upper` (or non-finite) in some dimension.
    InvalidBounds {
        dimension: usize,
        lower: f64,
        upper: f64,
    },
    /// Lower and upper bound vectors differ in length, or are empty.
    BoundsShape { lower_len: usize, upper_len: usize },
    /// The ensemble handed to the aggregator holds no SOWs.
    EmptyEnsemble,
    /// The sampler was given no SLR trajectories to choose from.
    EmptyTrajectorySet,
    /// A quantity that must be strictly positive was not.
    NonPositive { field: String, value: f64 },
    /// A decision vector did not match the decision dimension.
    DimensionMismatch { expected: usize, got: usize },
    /// Any other invalid field.
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn non_positive(field: &str, value: f64) -> Self {
        ConfigError::NonPositive {
            field: field.to_string(),
            value,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBounds {
                dimension,
                lower,
                upper,
            } => write!(
                f,
                "invalid bounds in dimension {}: lower={} must be < upper={}",
                dimension, lower, upper
            ),
            ConfigError::BoundsShape {
                lower_len,
                upper_len,
            } => write!(
                f,
                "bounds shape mismatch: lower has {} entries, upper has {}",
                lower_len, upper_len
            ),
            ConfigError::EmptyEnsemble => write!(f, "ensemble must contain at least one SOW"),
            ConfigError::EmptyTrajectorySet => {
                write!(f, "at least one SLR trajectory is required")
            }
            ConfigError::NonPositive { field, value } => {
                write!(f, "'{}' must be > 0 (got {})", field, value)
            }
            ConfigError::DimensionMismatch { expected, got } => write!(
                f,
                "decision dimension mismatch: expected {}, got {}",
                expected, got
            ),
            ConfigError::Invalid { field, message } => {
                write!(f, "invalid configuration in '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure reported by an external reference-data model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No depth-damage row matched the requested key.
    MissingDamageRow {
        description: String,
        occupancy: String,
        source: String,
    },
    /// More than one depth-damage row matched the requested key.
    AmbiguousDamageRow { matches: usize, description: String },
    /// A sea-level trajectory was queried outside its valid years.
    YearOutOfDomain { year: i32, first: i32, last: i32 },
    /// The construction cost table does not cover the requested elevation.
    ElevationOutOfRange { elevation_ft: f64, max_ft: f64 },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::MissingDamageRow {
                description,
                occupancy,
                source,
            } => write!(
                f,
                "no depth-damage row for description={:?} occupancy={:?} source={:?}",
                description, occupancy, source
            ),
            ModelError::AmbiguousDamageRow {
                matches,
                description,
            } => write!(
                f,
                "{} depth-damage rows match description={:?}; expected exactly one",
                matches, description
            ),
            ModelError::YearOutOfDomain { year, first, last } => write!(
                f,
                "year {} outside sea-level trajectory domain [{}, {}]",
                year, first, last
            ),
            ModelError::ElevationOutOfRange {
                elevation_ft,
                max_ft,
            } => write!(
                f,
                "cannot price elevation of {} ft (valid range 0..={} ft)",
                elevation_ft, max_ft
            ),
        }
    }
}

impl std::error::Error for ModelError {}

/// Error surfaced by the aggregator and optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Config(ConfigError),
    Model(ModelError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Model(e) => write!(f, "model error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Model(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Error::Model(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_errors_stay_distinct_from_config_errors() {
        let e: Error = ModelError::YearOutOfDomain {
            year: 2200,
            first: 2020,
            last: 2100,
        }
        .into();
        assert!(matches!(e, Error::Model(_)));
        assert!(e.to_string().contains("2200"));

        let c: Error = ConfigError::EmptyEnsemble.into();
        assert!(matches!(c, Error::Config(ConfigError::EmptyEnsemble)));
    }
}
