// src/scenario.rs
//
// YAML run specification.
//
// A run spec pins down a reproducible study:
// - run_id + run_version for tracking
// - optional run profile (exploratory / validation)
// - ensemble size and seed
// - sampler, evaluator, aggregator, optimizer and decision sections
// - the house (area, value, height above gauge, damage curve, cost curve)
// - the horizon
// - SLR trajectories (parametric or tabulated)
// - optionally a depth-damage reference table plus the row to use
//
// Every section is optional. Sections that are present replace the
// corresponding config section wholesale, except `ensemble`, whose fields
// override one at a time so a profile's ensemble size survives a spec that
// only pins the seed.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{
    AggregatorConfig, Config, DecisionConfig, EvaluatorConfig, HorizonConfig, HouseConfig,
    OptimizerConfig, RunProfile, SamplerConfig,
};
use crate::damage::{DamageRowKey, DepthDamageRow, DepthDamageTable};
use crate::error::ModelError;
use crate::slr::{default_trajectories, SeaLevelModel, SlrTrajectory, TabulatedSlr};
use crate::types::Year;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnsembleSpec {
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// One SLR trajectory in a run spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrajectorySpec {
    Parametric(SlrTrajectory),
    Tabulated { points: Vec<(Year, f64)> },
}

/// Reference depth-damage table plus the key of the row to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageTableSpec {
    pub rows: Vec<DepthDamageRow>,
    pub select: DamageRowKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    pub run_id: String,
    pub run_version: u32,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub ensemble: EnsembleSpec,
    #[serde(default)]
    pub sampler: Option<SamplerConfig>,
    #[serde(default)]
    pub evaluator: Option<EvaluatorConfig>,
    #[serde(default)]
    pub aggregator: Option<AggregatorConfig>,
    #[serde(default)]
    pub optimizer: Option<OptimizerConfig>,
    #[serde(default)]
    pub decision: Option<DecisionConfig>,
    #[serde(default)]
    pub house: Option<HouseConfig>,
    #[serde(default)]
    pub horizon: Option<HorizonConfig>,
    /// Absent: built-in trajectory set.
    #[serde(default)]
    pub slr: Option<Vec<TrajectorySpec>>,
    #[serde(default)]
    pub damage_table: Option<DamageTableSpec>,
}

impl RunSpec {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, SpecError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| SpecError::IoError {
            path: path.as_ref().display().to_string(),
            source: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SpecError> {
        let spec: RunSpec = serde_yaml::from_str(yaml).map_err(|e| SpecError::ParseError {
            source: e.to_string(),
        })?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), SpecError> {
        if self.run_id.trim().is_empty() {
            return Err(SpecError::validation("run_id", "run_id cannot be empty"));
        }
        if self.run_version == 0 {
            return Err(SpecError::validation(
                "run_version",
                "run_version must be >= 1",
            ));
        }
        if let Some(p) = &self.profile {
            if RunProfile::parse(p).is_none() {
                return Err(SpecError::validation(
                    "profile",
                    format!("unknown profile {:?}", p),
                ));
            }
        }
        if self.ensemble.size == Some(0) {
            return Err(SpecError::validation("ensemble.size", "size must be >= 1"));
        }
        if let Some(trajectories) = &self.slr {
            if trajectories.is_empty() {
                return Err(SpecError::validation(
                    "slr",
                    "list at least one trajectory (or omit the section)",
                ));
            }
            for (i, t) in trajectories.iter().enumerate() {
                if let TrajectorySpec::Tabulated { points } = t {
                    if points.is_empty() {
                        return Err(SpecError::validation(
                            &format!("slr[{i}].points"),
                            "tabulated trajectory needs at least one point",
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Overlay this spec onto `cfg`.
    pub fn apply_to(&self, cfg: &mut Config) -> Result<(), SpecError> {
        if let Some(size) = self.ensemble.size {
            cfg.ensemble.size = size;
        }
        if let Some(seed) = self.ensemble.seed {
            cfg.ensemble.seed = seed;
        }
        if let Some(s) = &self.sampler {
            cfg.sampler = s.clone();
        }
        if let Some(e) = &self.evaluator {
            cfg.evaluator = e.clone();
        }
        if let Some(a) = &self.aggregator {
            cfg.aggregator = a.clone();
        }
        if let Some(o) = &self.optimizer {
            cfg.optimizer = o.clone();
        }
        if let Some(d) = &self.decision {
            cfg.decision = d.clone();
        }
        if let Some(h) = &self.house {
            cfg.house = h.clone();
        }
        if let Some(h) = &self.horizon {
            cfg.horizon = h.clone();
        }
        if let Some(table) = &self.damage_table {
            let curve = DepthDamageTable::new(table.rows.clone())
                .select(&table.select)
                .map_err(SpecError::Model)?
                .clone();
            cfg.house.damage_curve = curve;
        }
        Ok(())
    }

    /// SLR trajectories for the sampler.
    pub fn trajectories(&self) -> Vec<Arc<dyn SeaLevelModel>> {
        match &self.slr {
            None => builtin_trajectories(),
            Some(list) => list
                .iter()
                .filter_map(|t| match t {
                    TrajectorySpec::Parametric(p) => {
                        Some(Arc::new(p.clone()) as Arc<dyn SeaLevelModel>)
                    }
                    TrajectorySpec::Tabulated { points } => TabulatedSlr::new(points.clone())
                        .map(|t| Arc::new(t) as Arc<dyn SeaLevelModel>),
                })
                .collect(),
        }
    }
}

/// The built-in parametric trajectory set as trait objects.
pub fn builtin_trajectories() -> Vec<Arc<dyn SeaLevelModel>> {
    default_trajectories()
        .into_iter()
        .map(|t| Arc::new(t) as Arc<dyn SeaLevelModel>)
        .collect()
}

/// Errors that can occur when loading a run spec.
#[derive(Debug, Clone)]
pub enum SpecError {
    IoError { path: String, source: String },
    ParseError { source: String },
    ValidationError { field: String, message: String },
    Model(ModelError),
}

impl SpecError {
    fn validation(field: &str, message: impl Into<String>) -> Self {
        SpecError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecError::IoError { path, source } => {
                write!(f, "Failed to read run spec '{}': {}", path, source)
            }
            SpecError::ParseError { source } => {
                write!(f, "Failed to parse run spec YAML: {}", source)
            }
            SpecError::ValidationError { field, message } => {
                write!(f, "Run spec validation error in '{}': {}", field, message)
            }
            SpecError::Model(e) => write!(f, "Run spec reference data error: {}", e),
        }
    }
}

impl std::error::Error for SpecError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::DamageModel;
    use crate::evaluator::EvaluationMethod;

    const BASELINE: &str = r#"
run_id: baseline_house
run_version: 1
profile: exploratory

ensemble:
  seed: 7

evaluator:
  method: monte_carlo
  mc_samples_per_year: 2000

horizon:
  first_year: 2024
  last_year: 2060

house:
  area_ft2: 1500
  value_usd: 320000
  height_above_gauge_ft: 6.5
  damage_curve:
    depths_ft: [-1.0, 0.0, 4.0, 8.0]
    fractions: [0.0, 0.1, 0.5, 0.7]

slr:
  - kind: parametric
    a: 0.0
    b: 0.01
    c: 0.0001
    t_star: 2050
    c_star: 0.02
  - kind: tabulated
    points: [[2020, 0.0], [2100, 2.5]]
"#;

    #[test]
    fn parses_baseline_and_overlays_config() {
        let spec = RunSpec::from_yaml_str(BASELINE).unwrap();
        assert_eq!(spec.run_id, "baseline_house");
        assert_eq!(spec.trajectories().len(), 2);

        let mut cfg = Config::for_profile(RunProfile::Validation);
        spec.apply_to(&mut cfg).unwrap();
        // Ensemble size comes from the profile, seed from the spec.
        assert_eq!(cfg.ensemble.size, 200_000);
        assert_eq!(cfg.ensemble.seed, 7);
        assert_eq!(cfg.evaluator.method, EvaluationMethod::MonteCarlo);
        assert_eq!(cfg.evaluator.mc_samples_per_year, 2000);
        assert_eq!(cfg.horizon.last_year, 2060);
        assert_eq!(cfg.house.area_ft2, 1500.0);
        assert!((cfg.house.damage_curve.damage_fraction(2.0) - 0.3).abs() < 1e-12);
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_slr_section_uses_builtin_set() {
        let spec = RunSpec::from_yaml_str("run_id: x\nrun_version: 1\n").unwrap();
        assert_eq!(spec.trajectories().len(), default_trajectories().len());
    }

    #[test]
    fn validation_errors_name_the_field() {
        let err = RunSpec::from_yaml_str("run_id: ''\nrun_version: 1\n").unwrap_err();
        assert!(matches!(err, SpecError::ValidationError { ref field, .. } if field == "run_id"));

        let err = RunSpec::from_yaml_str("run_id: a\nrun_version: 1\nprofile: turbo\n").unwrap_err();
        assert!(err.to_string().contains("profile"));

        let err = RunSpec::from_yaml_str("run_id: a\nrun_version: 1\nslr: []\n").unwrap_err();
        assert!(matches!(err, SpecError::ValidationError { .. }));
    }

    #[test]
    fn bad_damage_curve_is_a_parse_error() {
        let yaml = "run_id: a\nrun_version: 1\nhouse:\n  damage_curve:\n    depths_ft: [1.0, 0.0]\n    fractions: [0.1, 0.2]\n";
        assert!(matches!(
            RunSpec::from_yaml_str(yaml),
            Err(SpecError::ParseError { .. })
        ));
    }

    #[test]
    fn damage_table_row_must_exist() {
        let yaml = r#"
run_id: table
run_version: 1
damage_table:
  rows:
    - description: one story, no basement
      occupancy: RES1
      source: USACE
      curve:
        depths_ft: [0.0, 10.0]
        fractions: [0.0, 0.5]
  select:
    description: two story
    occupancy: RES1
    source: USACE
"#;
        let spec = RunSpec::from_yaml_str(yaml).unwrap();
        let mut cfg = Config::default();
        assert!(matches!(
            spec.apply_to(&mut cfg),
            Err(SpecError::Model(ModelError::MissingDamageRow { .. }))
        ));
    }

    #[test]
    fn io_error_reports_path() {
        let err = RunSpec::from_yaml_file("/nonexistent/run.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.yaml"));
    }
}
