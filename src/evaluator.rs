// src/evaluator.rs
//
// Per-scenario cost simulation: one (decision, SOW) pair → net present cost.
//
//   cost = construction(Δh)
//        + Σ_year  E_surge[damage(depth)] · house value · discount(r, year − first)
//
//   depth(s) = sea_level(year) + s − (height_above_gauge + Δh)
//
// The surge expectation is computed either by fixed-node trapezoidal
// quadrature over the central quantile range of the surge GEV (default) or by
// Monte Carlo (legacy reference, used to validate the quadrature).
//
// Evaluators are stateless across calls: the Monte Carlo RNG is rebuilt from
// its seed on every call, so every candidate decision sees the same surge
// draws and the result never depends on call order.

use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{
    EvaluatorConfig, DEFAULT_MC_SAMPLES_PER_YEAR, DEFAULT_QUADRATURE_NODES,
    DEFAULT_SURGE_TAIL_QUANTILES,
};
use crate::damage::{HouseAsset, ModelParams};
use crate::error::ModelError;
use crate::numeric::{linspace, trapezoid};
use crate::sow::StateOfWorld;
use crate::types::{Decision, Usd, Year};

/// How the surge expectation is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMethod {
    #[default]
    Quadrature,
    MonteCarlo,
}

/// Discount factor for a damage incurred `k` years after the first horizon
/// year at rate `r`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountConvention {
    /// (1 + r)^−k
    #[default]
    Compound,
    /// (1 − r)^k
    Decay,
}

impl DiscountConvention {
    pub fn factor(self, rate: f64, k: i32) -> f64 {
        match self {
            DiscountConvention::Compound => (1.0 + rate).powi(-k),
            DiscountConvention::Decay => (1.0 - rate).powi(k),
        }
    }
}

/// Flood depth at the finished floor (ft) for a given still-water level.
pub fn flood_depth_ft(
    sea_level_ft: f64,
    surge_ft: f64,
    house: &HouseAsset,
    decision: &Decision,
) -> f64 {
    sea_level_ft + surge_ft - (house.height_above_gauge_ft() + decision.elevation_ft)
}

/// Maps one (decision, SOW) pair to a discounted net present cost in USD.
///
/// Implementations must be pure with respect to their inputs.
pub trait ScenarioEvaluator: Send + Sync + fmt::Debug {
    /// E_surge[damage fraction] for one year.
    fn expected_damage_fraction(
        &self,
        decision: &Decision,
        sow: &StateOfWorld,
        params: &ModelParams,
        year: Year,
    ) -> Result<f64, ModelError>;

    fn discount(&self) -> DiscountConvention;

    /// Construction cost plus discounted expected damages over the horizon.
    fn evaluate(
        &self,
        decision: &Decision,
        sow: &StateOfWorld,
        params: &ModelParams,
    ) -> Result<Usd, ModelError> {
        let construction = params.construction_cost(decision.elevation_ft)?;
        let Some(first) = params.horizon.first_year() else {
            return Ok(construction);
        };

        let value = params.house.value_usd();
        let convention = self.discount();
        let mut damages = 0.0;
        for &year in params.horizon.years() {
            let fraction = self.expected_damage_fraction(decision, sow, params, year)?;
            damages += fraction * value * convention.factor(sow.discount_rate, year - first);
        }
        Ok(construction + damages)
    }
}

/// Fixed-node trapezoidal integration over the surge distribution.
#[derive(Debug, Clone)]
pub struct QuadratureEvaluator {
    nodes: usize,
    tail_quantiles: (f64, f64),
    discount: DiscountConvention,
}

impl Default for QuadratureEvaluator {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_QUADRATURE_NODES,
            tail_quantiles: DEFAULT_SURGE_TAIL_QUANTILES,
            discount: DiscountConvention::Compound,
        }
    }
}

impl QuadratureEvaluator {
    pub fn new(nodes: usize, tail_quantiles: (f64, f64), discount: DiscountConvention) -> Self {
        Self {
            nodes: nodes.max(2),
            tail_quantiles,
            discount,
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }
}

impl ScenarioEvaluator for QuadratureEvaluator {
    fn expected_damage_fraction(
        &self,
        decision: &Decision,
        sow: &StateOfWorld,
        params: &ModelParams,
        year: Year,
    ) -> Result<f64, ModelError> {
        let sea_level = sow.slr.sea_level_ft(year)?;
        let surge = &sow.surge;
        if surge.is_degenerate() {
            return Ok(0.0);
        }
        let lo = surge.quantile(self.tail_quantiles.0);
        let hi = surge.quantile(self.tail_quantiles.1);
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Ok(0.0);
        }

        let house = &params.house;
        let xs = linspace(lo, hi, self.nodes);
        let ys: Vec<f64> = xs
            .iter()
            .map(|&s| {
                house.damage_fraction(flood_depth_ft(sea_level, s, house, decision)) * surge.pdf(s)
            })
            .collect();
        Ok(trapezoid(&xs, &ys))
    }

    fn discount(&self) -> DiscountConvention {
        self.discount
    }
}

/// Monte Carlo reference evaluator.
///
/// Each year draws `samples_per_year` surges from a ChaCha8 stream keyed by
/// (seed, year), so results are identical across calls and candidates.
#[derive(Debug, Clone)]
pub struct MonteCarloEvaluator {
    samples_per_year: usize,
    seed: u64,
    discount: DiscountConvention,
}

impl Default for MonteCarloEvaluator {
    fn default() -> Self {
        Self {
            samples_per_year: DEFAULT_MC_SAMPLES_PER_YEAR,
            seed: 0,
            discount: DiscountConvention::Compound,
        }
    }
}

impl MonteCarloEvaluator {
    pub fn new(samples_per_year: usize, seed: u64, discount: DiscountConvention) -> Self {
        Self {
            samples_per_year: samples_per_year.max(1),
            seed,
            discount,
        }
    }

    pub fn samples_per_year(&self) -> usize {
        self.samples_per_year
    }

    fn rng_for_year(&self, year: Year) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(i64::from(year) as u64);
        rng
    }
}

impl ScenarioEvaluator for MonteCarloEvaluator {
    fn expected_damage_fraction(
        &self,
        decision: &Decision,
        sow: &StateOfWorld,
        params: &ModelParams,
        year: Year,
    ) -> Result<f64, ModelError> {
        let sea_level = sow.slr.sea_level_ft(year)?;
        if sow.surge.is_degenerate() {
            return Ok(0.0);
        }
        let house = &params.house;
        let mut rng = self.rng_for_year(year);
        let mut total = 0.0;
        for _ in 0..self.samples_per_year {
            let s = sow.surge.sample(&mut rng);
            total += house.damage_fraction(flood_depth_ft(sea_level, s, house, decision));
        }
        Ok(total / self.samples_per_year as f64)
    }

    fn discount(&self) -> DiscountConvention {
        self.discount
    }
}

/// Build the evaluator selected by `cfg.method`.
pub fn build_evaluator(cfg: &EvaluatorConfig) -> Arc<dyn ScenarioEvaluator> {
    match cfg.method {
        EvaluationMethod::Quadrature => Arc::new(QuadratureEvaluator::new(
            cfg.quadrature_nodes,
            cfg.surge_tail_quantiles,
            cfg.discount,
        )),
        EvaluationMethod::MonteCarlo => Arc::new(MonteCarloEvaluator::new(
            cfg.mc_samples_per_year,
            cfg.mc_seed,
            cfg.discount,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::{DamageModel, DepthDamageCurve, ElevationCostCurve};
    use crate::gev::GeneralizedExtremeValue;
    use crate::slr::{SeaLevelModel, SlrTrajectory};
    use crate::types::Horizon;

    fn params(horizon: Horizon) -> ModelParams {
        let damage: Arc<dyn DamageModel> = Arc::new(DepthDamageCurve::one_story_no_basement());
        let house = HouseAsset::new(1_000.0, 250_000.0, 4.0, damage).unwrap();
        ModelParams::new(horizon, house, Arc::new(ElevationCostCurve::default()))
    }

    fn sow(surge: GeneralizedExtremeValue, rate: f64) -> StateOfWorld {
        let slr: Arc<dyn SeaLevelModel> = Arc::new(SlrTrajectory::new(0.0, 0.01, 0.0, 2050.0, 0.02));
        StateOfWorld {
            slr,
            slr_index: 0,
            surge,
            discount_rate: rate,
        }
    }

    #[test]
    fn discount_conventions() {
        assert_eq!(DiscountConvention::Compound.factor(0.05, 0), 1.0);
        assert!((DiscountConvention::Compound.factor(0.05, 2) - 1.0 / 1.1025).abs() < 1e-12);
        assert!((DiscountConvention::Decay.factor(0.05, 2) - 0.9025).abs() < 1e-12);
    }

    #[test]
    fn empty_horizon_leaves_construction_cost_only() {
        let p = params(Horizon::new(Vec::new()));
        let w = sow(GeneralizedExtremeValue::new(5.0, 1.5, 0.1), 0.04);
        let eval = QuadratureEvaluator::default();
        let d = Decision::new(5.0);
        let cost = eval.evaluate(&d, &w, &p).unwrap();
        assert_eq!(cost, p.construction_cost(5.0).unwrap());
        assert_eq!(eval.evaluate(&Decision::new(0.0), &w, &p).unwrap(), 0.0);
    }

    #[test]
    fn degenerate_surge_carries_no_damage() {
        let p = params(Horizon::range(2024, 2030));
        let w = sow(GeneralizedExtremeValue::new(5.0, 0.0, 0.1), 0.04);
        for eval in [
            Arc::new(QuadratureEvaluator::default()) as Arc<dyn ScenarioEvaluator>,
            Arc::new(MonteCarloEvaluator::new(100, 1, DiscountConvention::Compound))
                as Arc<dyn ScenarioEvaluator>,
        ] {
            assert_eq!(eval.evaluate(&Decision::new(0.0), &w, &p).unwrap(), 0.0);
        }
    }

    #[test]
    fn damage_is_non_increasing_in_elevation() {
        let p = params(Horizon::range(2024, 2083));
        let w = sow(GeneralizedExtremeValue::new(5.0, 1.5, 0.1), 0.03);
        let eval = QuadratureEvaluator::default();
        let mut last = f64::INFINITY;
        for h in linspace(0.0, 14.0, 29) {
            let d = Decision::new(h);
            let damage = eval.evaluate(&d, &w, &p).unwrap() - p.construction_cost(h).unwrap();
            assert!(damage <= last + 1e-9, "h={h} damage={damage} last={last}");
            last = damage;
        }
    }

    #[test]
    fn year_order_does_not_change_cost() {
        let years: Vec<Year> = (2024..=2060).collect();
        let mut shuffled = years.clone();
        shuffled.reverse();
        shuffled.swap(3, 17);
        let w = sow(GeneralizedExtremeValue::new(5.0, 1.5, 0.1), 0.04);
        let eval = QuadratureEvaluator::default();
        let d = Decision::new(2.0);
        let a = eval.evaluate(&d, &w, &params(Horizon::new(years))).unwrap();
        let b = eval.evaluate(&d, &w, &params(Horizon::new(shuffled))).unwrap();
        assert!(((a - b) / a).abs() < 1e-12);
    }

    #[test]
    fn repeated_horizon_year_is_charged_once() {
        let w = sow(GeneralizedExtremeValue::new(5.0, 1.5, 0.1), 0.04);
        let eval = QuadratureEvaluator::default();
        let d = Decision::new(0.0);
        let once = eval
            .evaluate(&d, &w, &params(Horizon::new(vec![2024, 2025])))
            .unwrap();
        let repeated = eval
            .evaluate(&d, &w, &params(Horizon::new(vec![2024, 2025, 2025])))
            .unwrap();
        assert_eq!(once.to_bits(), repeated.to_bits());
    }

    #[test]
    fn out_of_domain_year_is_an_error() {
        let slr: Arc<dyn SeaLevelModel> =
            Arc::new(SlrTrajectory::new(0.0, 0.01, 0.0, 2050.0, 0.0).with_valid_years(2020, 2050));
        let w = StateOfWorld {
            slr,
            slr_index: 0,
            surge: GeneralizedExtremeValue::new(5.0, 1.5, 0.1),
            discount_rate: 0.04,
        };
        let p = params(Horizon::range(2040, 2060));
        let r = QuadratureEvaluator::default().evaluate(&Decision::new(0.0), &w, &p);
        assert!(matches!(r, Err(ModelError::YearOutOfDomain { year: 2051, .. })));
    }

    #[test]
    fn monte_carlo_is_reproducible_across_calls() {
        let p = params(Horizon::range(2024, 2030));
        let w = sow(GeneralizedExtremeValue::new(5.0, 1.5, 0.1), 0.04);
        let eval = MonteCarloEvaluator::new(2_000, 7, DiscountConvention::Compound);
        let d = Decision::new(1.0);
        let a = eval.evaluate(&d, &w, &p).unwrap();
        let b = eval.evaluate(&d, &w, &p).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn build_evaluator_follows_method() {
        let mut cfg = EvaluatorConfig::default();
        let q = build_evaluator(&cfg);
        assert!(format!("{q:?}").contains("Quadrature"));
        cfg.method = EvaluationMethod::MonteCarlo;
        let m = build_evaluator(&cfg);
        assert!(format!("{m:?}").contains("MonteCarlo"));
    }
}
