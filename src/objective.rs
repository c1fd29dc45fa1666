// src/objective.rs
//
// Ensemble → scalar objective.
//
// The canonical entry point is `ObjectiveAggregator::evaluate(Decision)`.
// `objective_scalar` and `objective_vector` are thin adapters for optimizers
// that work on a bare f64 or a flat slice; all three share one code path, so
// they agree bit-for-bit.
//
// Sign convention: with `Sense::Minimize` (default) the objective is the
// reduced expected cost in USD, lower is better. `Sense::Maximize` negates it.
//
// Per-SOW costs may be computed on scoped worker threads. Results land in an
// indexed buffer and are summed in ensemble order afterwards, so the
// objective is identical for any thread count.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::damage::ModelParams;
use crate::error::{ConfigError, Error, ModelError};
use crate::evaluator::ScenarioEvaluator;
use crate::numeric::rank;
use crate::sow::{Ensemble, StateOfWorld};
use crate::types::{Decision, Sense};

/// How per-SOW costs combine into one number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Sum over SOWs (the ensemble weights are implicit and equal).
    #[default]
    Sum,
    /// Sum divided by ensemble size.
    Mean,
}

/// Objective value at one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub elevation_ft: f64,
    pub objective: f64,
}

/// Pointwise objective over a caller-supplied grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridScan {
    pub points: Vec<SweepPoint>,
}

impl GridScan {
    /// Lowest objective; ties go to the earliest grid point and NaN ranks
    /// last, as in the optimizer.
    pub fn argmin(&self) -> Option<SweepPoint> {
        let mut best: Option<SweepPoint> = None;
        for p in &self.points {
            match best {
                Some(b) if rank(b.objective) <= rank(p.objective) => {}
                _ => best = Some(*p),
            }
        }
        best
    }
}

/// Evenly stepped grid from `lower` to `upper`, both ends included.
pub fn grid(lower: f64, upper: f64, step: f64) -> Result<Vec<f64>, ConfigError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(ConfigError::non_positive("sweep.step", step));
    }
    if !(lower.is_finite() && upper.is_finite() && lower <= upper) {
        return Err(ConfigError::InvalidBounds {
            dimension: 0,
            lower,
            upper,
        });
    }
    let intervals = ((upper - lower) / step + 1e-9).floor() as usize;
    let mut xs: Vec<f64> = (0..=intervals)
        .map(|i| (lower + step * i as f64).min(upper))
        .collect();
    if let Some(&last) = xs.last() {
        if upper - last > step * 1e-9 {
            xs.push(upper);
        }
    }
    Ok(xs)
}

/// Reduces a frozen ensemble into a scalar objective for a decision.
#[derive(Debug, Clone)]
pub struct ObjectiveAggregator {
    ensemble: Ensemble,
    params: Arc<ModelParams>,
    evaluator: Arc<dyn ScenarioEvaluator>,
    config: AggregatorConfig,
}

impl ObjectiveAggregator {
    pub fn new(
        ensemble: Ensemble,
        params: Arc<ModelParams>,
        evaluator: Arc<dyn ScenarioEvaluator>,
        config: AggregatorConfig,
    ) -> Result<Self, ConfigError> {
        if ensemble.is_empty() {
            return Err(ConfigError::EmptyEnsemble);
        }
        if config.threads == 0 {
            return Err(ConfigError::invalid("aggregator.threads", "must be >= 1"));
        }
        Ok(Self {
            ensemble,
            params,
            evaluator,
            config,
        })
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn sense(&self) -> Sense {
        self.config.sense
    }

    /// Cost of `decision` in every SOW, in ensemble order.
    pub fn per_sow_costs(&self, decision: &Decision) -> Result<Vec<f64>, ModelError> {
        let sows = self.ensemble.sows();
        let threads = self.config.threads.min(sows.len()).max(1);
        if threads == 1 {
            return sows.iter().map(|sow| self.cost(decision, sow)).collect();
        }

        let chunk = sows.len().div_ceil(threads);
        let mut out: Vec<Result<f64, ModelError>> = vec![Ok(0.0); sows.len()];
        std::thread::scope(|scope| {
            for (src, dst) in sows.chunks(chunk).zip(out.chunks_mut(chunk)) {
                scope.spawn(move || {
                    for (sow, slot) in src.iter().zip(dst.iter_mut()) {
                        *slot = self.cost(decision, sow);
                    }
                });
            }
        });
        out.into_iter().collect()
    }

    fn cost(&self, decision: &Decision, sow: &StateOfWorld) -> Result<f64, ModelError> {
        self.evaluator.evaluate(decision, sow, &self.params)
    }

    /// Canonical objective.
    pub fn evaluate(&self, decision: &Decision) -> Result<f64, Error> {
        let costs = self.per_sow_costs(decision)?;
        let total: f64 = costs.iter().sum();
        let reduced = match self.config.reduction {
            Reduction::Sum => total,
            Reduction::Mean => total / costs.len() as f64,
        };
        Ok(self.config.sense.apply(reduced))
    }

    pub fn objective_scalar(&self, elevation_ft: f64) -> Result<f64, Error> {
        self.evaluate(&Decision::new(elevation_ft))
    }

    /// Slice adapter for optimizers; the slice must hold exactly one element.
    pub fn objective_vector(&self, x: &[f64]) -> Result<f64, Error> {
        let decision = Decision::from_slice(x)?;
        self.evaluate(&decision)
    }

    /// Objective at every elevation in `elevations_ft`.
    pub fn sweep(&self, elevations_ft: &[f64]) -> Result<GridScan, Error> {
        let points = elevations_ft
            .iter()
            .map(|&h| {
                Ok(SweepPoint {
                    elevation_ft: h,
                    objective: self.objective_scalar(h)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(GridScan { points })
    }
}
