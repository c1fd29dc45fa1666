// End-to-end toy study with a known minimiser.
//
// Damage is exp(depth) (the house sits high enough above the gauge that the
// fraction stays far below 1) and construction costs k·Δh. Raising the house
// by Δh shifts every flood depth by −Δh, so the quadrature damage total is
// exactly D0·e^(−Δh) and, over two SOWs,
//
//   objective(Δh) = 2kΔh + D0·e^(−Δh),   argmin = ln(D0 / 2k).
//
// Choosing k = D0·e^(−6) / 2 puts the optimum at 6 ft.

use std::sync::Arc;

use elevate::config::{AggregatorConfig, OptimizerConfig};
use elevate::damage::{DamageModel, ElevationCost, HouseAsset, ModelParams};
use elevate::error::ModelError;
use elevate::evaluator::QuadratureEvaluator;
use elevate::gev::GeneralizedExtremeValue;
use elevate::logging::NoopSink;
use elevate::objective::{grid, ObjectiveAggregator};
use elevate::optimizer::{Algorithm, Optimizer};
use elevate::slr::{SeaLevelModel, SlrTrajectory};
use elevate::sow::{Ensemble, StateOfWorld};
use elevate::types::{Bounds, Horizon};

#[derive(Debug)]
struct ExpDamage;

impl DamageModel for ExpDamage {
    fn damage_fraction(&self, depth_ft: f64) -> f64 {
        depth_ft.exp()
    }
}

#[derive(Debug)]
struct LinearCost {
    usd_per_ft: f64,
}

impl ElevationCost for LinearCost {
    fn cost_usd(&self, _area_ft2: f64, elevation_ft: f64) -> Result<f64, ModelError> {
        if elevation_ft < 0.0 {
            return Err(ModelError::ElevationOutOfRange {
                elevation_ft,
                max_ft: f64::INFINITY,
            });
        }
        Ok(self.usd_per_ft * elevation_ft)
    }
}

fn toy_ensemble() -> Ensemble {
    let slr: Arc<dyn SeaLevelModel> = Arc::new(SlrTrajectory::new(0.5, 0.0, 0.0, 2100.0, 0.0));
    Ensemble::new(vec![
        StateOfWorld {
            slr: Arc::clone(&slr),
            slr_index: 0,
            surge: GeneralizedExtremeValue::new(5.0, 0.5, 0.0),
            discount_rate: 0.03,
        },
        StateOfWorld {
            slr,
            slr_index: 0,
            surge: GeneralizedExtremeValue::new(5.5, 0.7, 0.1),
            discount_rate: 0.05,
        },
    ])
    .unwrap()
}

fn toy_aggregator(usd_per_ft: f64) -> ObjectiveAggregator {
    let house = HouseAsset::new(1_000.0, 250_000.0, 18.0, Arc::new(ExpDamage)).unwrap();
    let params = ModelParams::new(
        Horizon::range(2024, 2033),
        house,
        Arc::new(LinearCost { usd_per_ft }),
    );
    ObjectiveAggregator::new(
        toy_ensemble(),
        Arc::new(params),
        Arc::new(QuadratureEvaluator::default()),
        AggregatorConfig::default(),
    )
    .unwrap()
}

/// Damage-only objective at Δh = 0.
fn d0() -> f64 {
    toy_aggregator(0.0).objective_scalar(0.0).unwrap()
}

fn optimizer(algorithm: Algorithm) -> Optimizer {
    Optimizer::from_config(OptimizerConfig {
        algorithm,
        seed: 11,
        time_limit_s: 60.0,
        max_generations: 120,
        tolerance: 1e-10,
        ..OptimizerConfig::default()
    })
}

#[test]
fn objective_matches_closed_form() {
    let d0 = d0();
    assert!(d0 > 0.0);
    let k = d0 * (-6.0f64).exp() / 2.0;
    let agg = toy_aggregator(k);
    for h in [0.0, 1.5, 6.0, 9.25, 14.0] {
        let expected = 2.0 * k * h + d0 * (-h).exp();
        let got = agg.objective_scalar(h).unwrap();
        assert!(
            ((got - expected) / expected).abs() < 1e-9,
            "h={h} got={got} expected={expected}"
        );
    }
}

#[test]
fn optimizer_finds_interior_minimiser() {
    let d0 = d0();
    let agg = toy_aggregator(d0 * (-6.0f64).exp() / 2.0);
    let bounds = Bounds::scalar(0.0, 14.0).unwrap();

    for algorithm in [Algorithm::DifferentialEvolution, Algorithm::EvolutionaryCenters] {
        let res = optimizer(algorithm)
            .run(|x| agg.objective_vector(x), &bounds, &mut NoopSink)
            .unwrap();
        assert!(
            (res.best_x[0] - 6.0).abs() < 0.05,
            "{algorithm:?}: best_x={:?}",
            res.best_x
        );
        assert_eq!(
            res.best_value.to_bits(),
            agg.objective_vector(&res.best_x).unwrap().to_bits()
        );
    }
}

#[test]
fn grid_scan_at_0_14_ft_agrees_with_minimiser() {
    let d0 = d0();
    let agg = toy_aggregator(d0 * (-6.0f64).exp() / 2.0);
    let xs = grid(0.0, 14.0, 0.14).unwrap();
    assert_eq!(xs.len(), 101);
    let scan = agg.sweep(&xs).unwrap();
    let best = scan.argmin().unwrap();
    assert!((best.elevation_ft - 6.0).abs() <= 0.14 + 1e-9, "{best:?}");

    let opt = optimizer(Algorithm::DifferentialEvolution)
        .run(
            |x| agg.objective_vector(x),
            &Bounds::scalar(0.0, 14.0).unwrap(),
            &mut NoopSink,
        )
        .unwrap();
    assert!(opt.best_value <= best.objective);
}

#[test]
fn expensive_construction_puts_optimum_at_lower_bound() {
    let d0 = d0();
    let agg = toy_aggregator(10.0 * d0);
    let res = optimizer(Algorithm::DifferentialEvolution)
        .run(
            |x| agg.objective_vector(x),
            &Bounds::scalar(0.0, 14.0).unwrap(),
            &mut NoopSink,
        )
        .unwrap();
    assert_eq!(res.best_x, vec![0.0]);
}

#[test]
fn cheap_construction_puts_optimum_at_upper_bound() {
    let d0 = d0();
    let agg = toy_aggregator(d0 * (-20.0f64).exp() / 2.0);
    let res = optimizer(Algorithm::EvolutionaryCenters)
        .run(
            |x| agg.objective_vector(x),
            &Bounds::scalar(0.0, 14.0).unwrap(),
            &mut NoopSink,
        )
        .unwrap();
    assert_eq!(res.best_x, vec![14.0]);
}
