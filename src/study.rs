// src/study.rs
//
// End-to-end wiring of one elevation study:
//
//   Config ──► ModelParams (house, horizon, construction cost)
//          ──► ScenarioSampler ──► frozen Ensemble
//          ──► ObjectiveAggregator (evaluator chosen by config)
//          ──► Optimizer ──► recommended decision + cost distribution
//
// The ensemble is sampled once per study and never mutated afterwards.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use crate::config::Config;
use crate::damage::{DamageModel, ElevationCost, HouseAsset, ModelParams};
use crate::error::{ConfigError, Error};
use crate::evaluator::build_evaluator;
use crate::logging::EventSink;
use crate::metrics::CostDistribution;
use crate::objective::{grid, GridScan, ObjectiveAggregator};
use crate::optimizer::{OptimizationResult, Optimizer};
use crate::slr::SeaLevelModel;
use crate::sow::{Ensemble, ScenarioSampler};
use crate::types::{Decision, Sense};

/// Outcome of an optimisation study.
#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub optimization: OptimizationResult,
    pub decision: Decision,
    /// Per-SOW cost distribution of `decision` (USD).
    pub costs: CostDistribution,
}

pub struct Study {
    config: Config,
    trajectories: Vec<Arc<dyn SeaLevelModel>>,
}

impl Study {
    /// Validates `config` before anything is sampled.
    pub fn new(
        config: Config,
        trajectories: Vec<Arc<dyn SeaLevelModel>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if trajectories.is_empty() {
            return Err(ConfigError::EmptyTrajectorySet);
        }
        Ok(Self {
            config,
            trajectories,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model_params(&self) -> Result<ModelParams, ConfigError> {
        let h = &self.config.house;
        let damage: Arc<dyn DamageModel> = Arc::new(h.damage_curve.clone());
        let house = HouseAsset::new(h.area_ft2, h.value_usd, h.height_above_gauge_ft, damage)?;
        let cost: Arc<dyn ElevationCost> = Arc::new(h.elevation_cost.clone());
        Ok(ModelParams::new(self.config.horizon.horizon(), house, cost))
    }

    pub fn sample_ensemble(&self) -> Result<Ensemble, ConfigError> {
        let rng = ChaCha8Rng::seed_from_u64(self.config.ensemble.seed);
        let mut sampler =
            ScenarioSampler::new(self.config.sampler.clone(), self.trajectories.clone(), rng)?;
        sampler.sample(self.config.ensemble.size)
    }

    pub fn aggregator(&self, ensemble: Ensemble) -> Result<ObjectiveAggregator, ConfigError> {
        ObjectiveAggregator::new(
            ensemble,
            Arc::new(self.model_params()?),
            build_evaluator(&self.config.evaluator),
            self.config.aggregator.clone(),
        )
    }

    /// Search the decision box for the lowest objective.
    ///
    /// The aggregator must use `Sense::Minimize`; a maximising objective would
    /// be minimised as-is and produce the worst decision.
    pub fn optimize(
        &self,
        aggregator: &ObjectiveAggregator,
        sink: &mut dyn EventSink,
    ) -> Result<StudyOutcome, Error> {
        if aggregator.sense() != Sense::Minimize {
            return Err(ConfigError::invalid(
                "aggregator.sense",
                "the optimizer minimises; use sense: minimize",
            )
            .into());
        }
        let bounds = self.config.decision.bounds()?;
        sink.log_event(
            "optimize_start",
            &json!({
                "algorithm": self.config.optimizer.algorithm.as_str(),
                "seed": self.config.optimizer.seed,
                "time_limit_s": self.config.optimizer.time_limit_s,
                "ensemble_size": aggregator.ensemble().len(),
                "ensemble_checksum": aggregator.ensemble().checksum(),
            }),
        );

        let mut optimizer = Optimizer::from_config(self.config.optimizer.clone());
        let optimization = optimizer.run(|x| aggregator.objective_vector(x), &bounds, sink)?;
        let decision = optimization.best_decision()?;
        let per_sow = aggregator.per_sow_costs(&decision)?;

        sink.log_event(
            "optimize_done",
            &json!({
                "elevation_ft": decision.elevation_ft,
                "objective": optimization.best_value,
                "evaluations": optimization.evaluations,
                "termination": optimization.termination,
            }),
        );

        Ok(StudyOutcome {
            optimization,
            decision,
            costs: CostDistribution::from_costs(&per_sow),
        })
    }

    /// Objective on an evenly stepped grid over the decision box.
    pub fn sweep(&self, aggregator: &ObjectiveAggregator, step_ft: f64) -> Result<GridScan, Error> {
        let xs = grid(self.config.decision.lower_ft, self.config.decision.upper_ft, step_ft)?;
        aggregator.sweep(&xs)
    }
}
