// src/config.rs
//
// Central configuration for an elevation study.
//
// Single source of truth for the ensemble size/seed, the scenario sampler's
// stochastic models, the evaluator (quadrature vs Monte Carlo), objective
// aggregation, the optimizer and the house/horizon being studied.
//
// Presets: `RunProfile::Exploratory` (small ensemble, short budget) and
// `RunProfile::Validation` (large ensemble for final numbers). Environment
// variables (ELEVATE_*) override individual knobs on top of a preset.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::damage::{DepthDamageCurve, ElevationCostCurve};
use crate::error::ConfigError;
use crate::evaluator::{DiscountConvention, EvaluationMethod};
use crate::objective::Reduction;
use crate::optimizer::Algorithm;
use crate::types::{Bounds, Horizon, Sense, Year};

/// Floor applied to sampled discount rates.
pub const DEFAULT_DISCOUNT_RATE_FLOOR: f64 = 0.001;

/// Trapezoid nodes per year for the surge expectation.
pub const DEFAULT_QUADRATURE_NODES: usize = 130;

/// Surge quantiles bounding the quadrature support.
pub const DEFAULT_SURGE_TAIL_QUANTILES: (f64, f64) = (0.0005, 0.9995);

/// Surge draws per year for the Monte Carlo reference evaluator.
pub const DEFAULT_MC_SAMPLES_PER_YEAR: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Human-readable config version.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub house: HouseConfig,
    #[serde(default)]
    pub horizon: HorizonConfig,
}

fn default_version() -> String {
    "elevate-v1".to_string()
}

/// Preset controlling ensemble size and time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunProfile {
    /// Hundreds of SOWs: fast iteration on the model.
    Exploratory,
    /// Hundreds of thousands of SOWs: final recommendation.
    Validation,
}

impl RunProfile {
    /// Stable lowercase name (used in logs and output files).
    pub fn as_str(&self) -> &'static str {
        match self {
            RunProfile::Exploratory => "exploratory",
            RunProfile::Validation => "validation",
        }
    }

    /// Parse a profile name (case-insensitive). Returns None if unrecognized.
    pub fn parse(s: &str) -> Option<RunProfile> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exploratory" | "explore" | "e" | "quick" => Some(RunProfile::Exploratory),
            "validation" | "validate" | "v" | "final" => Some(RunProfile::Validation),
            _ => None,
        }
    }
}

/// Where the effective run profile came from.
///
/// Precedence (highest to lowest): CLI, ELEVATE_RUN_PROFILE, run spec file,
/// default (Exploratory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    Cli,
    Env,
    Spec,
    Default,
}

impl ProfileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileSource::Cli => "cli",
            ProfileSource::Env => "env",
            ProfileSource::Spec => "spec",
            ProfileSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EffectiveProfile {
    pub profile: RunProfile,
    pub source: ProfileSource,
}

impl EffectiveProfile {
    /// Format: `effective_run_profile=<profile> source=<source>` on stderr.
    pub fn log_startup(&self) {
        eprintln!(
            "effective_run_profile={} source={}",
            self.profile.as_str(),
            self.source.as_str()
        );
    }
}

/// Resolve the run profile: CLI > ELEVATE_RUN_PROFILE > spec file > default.
pub fn resolve_effective_profile(
    cli_profile: Option<RunProfile>,
    spec_profile: Option<&str>,
) -> EffectiveProfile {
    if let Some(p) = cli_profile {
        return EffectiveProfile {
            profile: p,
            source: ProfileSource::Cli,
        };
    }

    if let Ok(env_val) = std::env::var("ELEVATE_RUN_PROFILE") {
        if !env_val.is_empty() {
            if let Some(p) = RunProfile::parse(&env_val) {
                return EffectiveProfile {
                    profile: p,
                    source: ProfileSource::Env,
                };
            }
            eprintln!(
                "[config] WARN: invalid ELEVATE_RUN_PROFILE={:?}; ignoring",
                env_val
            );
        }
    }

    if let Some(s) = spec_profile {
        if let Some(p) = RunProfile::parse(s) {
            return EffectiveProfile {
                profile: p,
                source: ProfileSource::Spec,
            };
        }
    }

    EffectiveProfile {
        profile: RunProfile::Exploratory,
        source: ProfileSource::Default,
    }
}

/// Ensemble size and the seed of the sampler's RNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub size: usize,
    pub seed: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            size: 500,
            seed: 2024,
        }
    }
}

/// Stochastic models the scenario sampler draws SOWs from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Surge GEV location ~ Normal(mean, std), ft.
    pub surge_location_mean: f64,
    pub surge_location_std: f64,
    /// Surge GEV scale ~ Exponential(mean), ft.
    pub surge_scale_mean: f64,
    /// Surge GEV shape ~ Normal(mean, std).
    pub surge_shape_mean: f64,
    pub surge_shape_std: f64,
    /// Discount rate ~ Normal(mean, std), floored at `discount_rate_floor`.
    pub discount_rate_mean: f64,
    pub discount_rate_std: f64,
    pub discount_rate_floor: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            surge_location_mean: 5.0,
            surge_location_std: 1.0,
            surge_scale_mean: 1.5,
            surge_shape_mean: 0.1,
            surge_shape_std: 0.05,
            discount_rate_mean: 0.04,
            discount_rate_std: 0.02,
            discount_rate_floor: DEFAULT_DISCOUNT_RATE_FLOOR,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, v) in [
            ("sampler.surge_location_mean", self.surge_location_mean),
            ("sampler.surge_shape_mean", self.surge_shape_mean),
            ("sampler.discount_rate_mean", self.discount_rate_mean),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::invalid(field, "mean must be finite"));
            }
        }
        for (field, v) in [
            ("sampler.surge_location_std", self.surge_location_std),
            ("sampler.surge_shape_std", self.surge_shape_std),
            ("sampler.discount_rate_std", self.discount_rate_std),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::invalid(field, "std must be finite and >= 0"));
            }
        }
        if !(self.surge_scale_mean.is_finite() && self.surge_scale_mean > 0.0) {
            return Err(ConfigError::non_positive(
                "sampler.surge_scale_mean",
                self.surge_scale_mean,
            ));
        }
        if !(self.discount_rate_floor.is_finite() && self.discount_rate_floor > 0.0) {
            return Err(ConfigError::non_positive(
                "sampler.discount_rate_floor",
                self.discount_rate_floor,
            ));
        }
        Ok(())
    }
}

/// How a single (decision, SOW) pair is priced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub method: EvaluationMethod,
    pub quadrature_nodes: usize,
    pub surge_tail_quantiles: (f64, f64),
    pub mc_samples_per_year: usize,
    pub mc_seed: u64,
    pub discount: DiscountConvention,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            method: EvaluationMethod::Quadrature,
            quadrature_nodes: DEFAULT_QUADRATURE_NODES,
            surge_tail_quantiles: DEFAULT_SURGE_TAIL_QUANTILES,
            mc_samples_per_year: DEFAULT_MC_SAMPLES_PER_YEAR,
            mc_seed: 0,
            discount: DiscountConvention::Compound,
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quadrature_nodes < 2 {
            return Err(ConfigError::invalid(
                "evaluator.quadrature_nodes",
                "need at least 2 nodes",
            ));
        }
        let (lo, hi) = self.surge_tail_quantiles;
        if !(lo > 0.0 && lo < hi && hi < 1.0) {
            return Err(ConfigError::invalid(
                "evaluator.surge_tail_quantiles",
                format!("need 0 < lo < hi < 1 (got ({lo}, {hi}))"),
            ));
        }
        if self.mc_samples_per_year == 0 {
            return Err(ConfigError::invalid(
                "evaluator.mc_samples_per_year",
                "must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Reduction of per-SOW costs into the scalar objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub sense: Sense,
    pub reduction: Reduction,
    /// Worker threads evaluating SOWs (1 = evaluate inline).
    pub threads: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sense: Sense::Minimize,
            reduction: Reduction::Sum,
            threads: 1,
        }
    }
}

/// Derivative-free search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub algorithm: Algorithm,
    /// Seed of the optimizer's own RNG.
    pub seed: u64,
    /// Wall-clock budget in seconds.
    pub time_limit_s: f64,
    pub population_size: usize,
    pub max_generations: usize,
    pub max_evaluations: Option<usize>,
    /// Stop once (max − min) of the population objective falls below this.
    pub tolerance: f64,
    /// Differential evolution mutation factor F.
    pub differential_weight: f64,
    /// Differential evolution crossover probability CR.
    pub crossover_rate: f64,
    /// Evolutionary-centres sample size per move.
    pub centre_sample_size: usize,
    /// Evolutionary-centres maximum step multiplier.
    pub centre_step_max: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::DifferentialEvolution,
            seed: 421_521,
            time_limit_s: 10.0,
            population_size: 20,
            max_generations: 200,
            max_evaluations: None,
            tolerance: 1e-6,
            differential_weight: 0.7,
            crossover_rate: 0.9,
            centre_sample_size: 5,
            centre_step_max: 2.0,
        }
    }
}

impl OptimizerConfig {
    /// Wall-clock budget as a `Duration`; errors if it does not fit.
    pub fn time_limit(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.time_limit_s).map_err(|_| {
            ConfigError::invalid(
                "optimizer.time_limit_s",
                format!("{} s does not fit a wall-clock duration", self.time_limit_s),
            )
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_limit_s.is_finite() && self.time_limit_s > 0.0) {
            return Err(ConfigError::non_positive(
                "optimizer.time_limit_s",
                self.time_limit_s,
            ));
        }
        self.time_limit()?;
        if self.population_size < 4 {
            return Err(ConfigError::invalid(
                "optimizer.population_size",
                "need at least 4 individuals",
            ));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(ConfigError::invalid(
                "optimizer.crossover_rate",
                "must lie in [0, 1]",
            ));
        }
        if !(self.differential_weight > 0.0 && self.differential_weight <= 2.0) {
            return Err(ConfigError::invalid(
                "optimizer.differential_weight",
                "must lie in (0, 2]",
            ));
        }
        if self.centre_sample_size < 2 {
            return Err(ConfigError::invalid(
                "optimizer.centre_sample_size",
                "must be >= 2",
            ));
        }
        if !(self.centre_step_max > 0.0) {
            return Err(ConfigError::non_positive(
                "optimizer.centre_step_max",
                self.centre_step_max,
            ));
        }
        Ok(())
    }
}

/// Feasible elevation range (the optimizer's box).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub lower_ft: f64,
    pub upper_ft: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            lower_ft: 0.0,
            upper_ft: 14.0,
        }
    }
}

impl DecisionConfig {
    pub fn bounds(&self) -> Result<Bounds, ConfigError> {
        Bounds::scalar(self.lower_ft, self.upper_ft)
    }
}

/// The house being studied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseConfig {
    pub area_ft2: f64,
    pub value_usd: f64,
    pub height_above_gauge_ft: f64,
    pub damage_curve: DepthDamageCurve,
    pub elevation_cost: ElevationCostCurve,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            area_ft2: 1_000.0,
            value_usd: 250_000.0,
            height_above_gauge_ft: 8.0,
            damage_curve: DepthDamageCurve::one_story_no_basement(),
            elevation_cost: ElevationCostCurve::default(),
        }
    }
}

/// Inclusive year range damages accrue over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonConfig {
    pub first_year: Year,
    pub last_year: Year,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            first_year: 2024,
            last_year: 2083,
        }
    }
}

impl HorizonConfig {
    pub fn horizon(&self) -> Horizon {
        Horizon::range(self.first_year, self.last_year)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            ensemble: EnsembleConfig::default(),
            sampler: SamplerConfig::default(),
            evaluator: EvaluatorConfig::default(),
            aggregator: AggregatorConfig::default(),
            optimizer: OptimizerConfig::default(),
            decision: DecisionConfig::default(),
            house: HouseConfig::default(),
            horizon: HorizonConfig::default(),
        }
    }
}

impl Config {
    /// Preset on top of the defaults (which are the Exploratory centre).
    pub fn for_profile(profile: RunProfile) -> Self {
        let mut cfg = Config::default();
        match profile {
            RunProfile::Exploratory => {
                cfg.ensemble.size = 500;
                cfg.optimizer.time_limit_s = 10.0;
            }
            RunProfile::Validation => {
                cfg.ensemble.size = 200_000;
                cfg.optimizer.time_limit_s = 120.0;
                cfg.optimizer.population_size = 30;
            }
        }
        cfg
    }

    /// Build from a profile, then apply environment overrides:
    ///
    ///   - ELEVATE_ENSEMBLE_SIZE     (usize)
    ///   - ELEVATE_SEED              (u64, ensemble sampler seed)
    ///   - ELEVATE_OPTIMIZER_SEED    (u64)
    ///   - ELEVATE_QUADRATURE_NODES  (usize)
    ///   - ELEVATE_DISCOUNT_FLOOR    (f64)
    ///   - ELEVATE_TIME_LIMIT_S      (f64, seconds)
    ///   - ELEVATE_THREADS           (usize)
    ///
    /// Any variable that fails to parse is ignored with a warning.
    pub fn from_env_or_profile(profile: RunProfile) -> Self {
        let mut cfg = Config::for_profile(profile);
        cfg.apply_env_overrides();
        cfg
    }

    pub fn apply_env_overrides(&mut self) {
        env_override("ELEVATE_ENSEMBLE_SIZE", &mut self.ensemble.size);
        env_override("ELEVATE_SEED", &mut self.ensemble.seed);
        env_override("ELEVATE_OPTIMIZER_SEED", &mut self.optimizer.seed);
        env_override(
            "ELEVATE_QUADRATURE_NODES",
            &mut self.evaluator.quadrature_nodes,
        );
        env_override(
            "ELEVATE_DISCOUNT_FLOOR",
            &mut self.sampler.discount_rate_floor,
        );
        env_override("ELEVATE_TIME_LIMIT_S", &mut self.optimizer.time_limit_s);
        env_override("ELEVATE_THREADS", &mut self.aggregator.threads);
    }

    /// Validate every section. Called before any sampling or search.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ensemble.size == 0 {
            return Err(ConfigError::EmptyEnsemble);
        }
        if self.aggregator.threads == 0 {
            return Err(ConfigError::invalid("aggregator.threads", "must be >= 1"));
        }
        self.sampler.validate()?;
        self.evaluator.validate()?;
        self.optimizer.validate()?;
        self.decision.bounds()?;
        self.house.elevation_cost.validate()?;
        if self.decision.upper_ft > self.house.elevation_cost.max_elevation_ft() {
            return Err(ConfigError::invalid(
                "decision.upper_ft",
                format!(
                    "exceeds the elevation cost table maximum of {} ft",
                    self.house.elevation_cost.max_elevation_ft()
                ),
            ));
        }
        if self.decision.lower_ft < 0.0 {
            return Err(ConfigError::invalid("decision.lower_ft", "must be >= 0"));
        }
        Ok(())
    }
}

fn env_override<T>(name: &str, slot: &mut T)
where
    T: FromStr + Display,
{
    let Ok(raw) = std::env::var(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => {
            eprintln!("[config] {name} = {v} (overrode default)");
            *slot = v;
        }
        Err(_) => {
            eprintln!(
                "[config] WARN: could not parse {name} = {:?}; using default {}",
                raw, slot
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parse_accepts_aliases() {
        assert_eq!(RunProfile::parse("Exploratory"), Some(RunProfile::Exploratory));
        assert_eq!(RunProfile::parse(" final "), Some(RunProfile::Validation));
        assert_eq!(RunProfile::parse("v"), Some(RunProfile::Validation));
        assert_eq!(RunProfile::parse("nope"), None);
    }

    #[test]
    fn cli_profile_wins() {
        let eff = resolve_effective_profile(Some(RunProfile::Validation), Some("exploratory"));
        assert_eq!(eff.profile, RunProfile::Validation);
        assert_eq!(eff.source, ProfileSource::Cli);
    }

    #[test]
    fn validation_profile_uses_large_ensemble() {
        let exp = Config::for_profile(RunProfile::Exploratory);
        let val = Config::for_profile(RunProfile::Validation);
        assert!(exp.ensemble.size < 1_000);
        assert!(val.ensemble.size >= 100_000);
        assert!(val.optimizer.time_limit_s > exp.optimizer.time_limit_s);
    }

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_setups() {
        let mut cfg = Config::default();
        cfg.ensemble.size = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyEnsemble));

        let mut cfg = Config::default();
        cfg.decision.lower_ft = 14.0;
        cfg.decision.upper_ft = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidBounds { .. })
        ));

        let mut cfg = Config::default();
        cfg.sampler.discount_rate_floor = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive { .. })
        ));

        let mut cfg = Config::default();
        cfg.evaluator.quadrature_nodes = 1;
        assert!(cfg.validate().is_err());

        let setters: [fn(&mut SamplerConfig); 3] = [
            |s| s.surge_location_mean = f64::NAN,
            |s| s.surge_shape_mean = f64::INFINITY,
            |s| s.discount_rate_mean = f64::NAN,
        ];
        for set in setters {
            let mut cfg = Config::default();
            set(&mut cfg.sampler);
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::Invalid { ref field, .. }) if field.ends_with("_mean")
            ));
        }

        let mut cfg = Config::default();
        cfg.optimizer.time_limit_s = 1e30;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "optimizer.time_limit_s"
        ));

        let mut cfg = Config::default();
        cfg.decision.upper_ft = 20.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_yaml_with_defaults() {
        let cfg: Config = serde_yaml::from_str("ensemble:\n  size: 12\n").unwrap();
        assert_eq!(cfg.ensemble.size, 12);
        assert_eq!(cfg.ensemble.seed, EnsembleConfig::default().seed);
        assert_eq!(cfg.evaluator.quadrature_nodes, DEFAULT_QUADRATURE_NODES);
    }
}
