// Quadrature against Monte Carlo on a SOW with substantial flood exposure.

use std::sync::Arc;

use elevate::config::DEFAULT_SURGE_TAIL_QUANTILES;
use elevate::damage::{DepthDamageCurve, ElevationCostCurve, HouseAsset, ModelParams};
use elevate::evaluator::{
    DiscountConvention, MonteCarloEvaluator, QuadratureEvaluator, ScenarioEvaluator,
};
use elevate::gev::GeneralizedExtremeValue;
use elevate::slr::SlrTrajectory;
use elevate::sow::StateOfWorld;
use elevate::types::{Decision, Horizon};

fn exposed_params() -> ModelParams {
    let house = HouseAsset::new(
        1_000.0,
        250_000.0,
        4.0,
        Arc::new(DepthDamageCurve::one_story_no_basement()),
    )
    .unwrap();
    ModelParams::new(
        Horizon::range(2024, 2026),
        house,
        Arc::new(ElevationCostCurve::default()),
    )
}

fn exposed_sow() -> StateOfWorld {
    StateOfWorld {
        slr: Arc::new(SlrTrajectory::new(0.3, 0.01, 0.0, 2100.0, 0.0)),
        slr_index: 0,
        surge: GeneralizedExtremeValue::new(4.0, 0.5, 0.1),
        discount_rate: 0.04,
    }
}

fn damages_only(eval: &dyn ScenarioEvaluator, decision: &Decision) -> f64 {
    let params = exposed_params();
    let construction = params.construction_cost(decision.elevation_ft).unwrap();
    eval.evaluate(decision, &exposed_sow(), &params).unwrap() - construction
}

#[test]
fn monte_carlo_agrees_with_quadrature_within_one_percent() {
    let quad = QuadratureEvaluator::default();
    let mc = MonteCarloEvaluator::new(200_000, 17, DiscountConvention::Compound);

    for h in [0.0, 1.0] {
        let decision = Decision::new(h);
        let q = damages_only(&quad, &decision);
        let m = damages_only(&mc, &decision);
        assert!(q > 0.0, "h={h}: expected flood exposure");
        let rel = (q - m).abs() / q;
        assert!(rel < 0.01, "h={h}: quadrature={q} monte_carlo={m} rel={rel}");
    }
}

#[test]
fn quadrature_is_stable_under_node_refinement() {
    let decision = Decision::new(0.0);
    let coarse = QuadratureEvaluator::new(
        130,
        DEFAULT_SURGE_TAIL_QUANTILES,
        DiscountConvention::Compound,
    );
    let fine = QuadratureEvaluator::new(
        5_000,
        DEFAULT_SURGE_TAIL_QUANTILES,
        DiscountConvention::Compound,
    );
    let a = damages_only(&coarse, &decision);
    let b = damages_only(&fine, &decision);
    assert!((a - b).abs() / b < 1e-3, "130 nodes={a} 5000 nodes={b}");
}

#[test]
fn expected_damage_fraction_is_a_probability_weighted_fraction() {
    let quad = QuadratureEvaluator::default();
    let params = exposed_params();
    let sow = exposed_sow();
    for year in 2024..=2026 {
        let f = quad
            .expected_damage_fraction(&Decision::new(0.0), &sow, &params, year)
            .unwrap();
        assert!((0.0..=1.0).contains(&f), "year={year} fraction={f}");
    }
}
