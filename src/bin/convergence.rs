// src/bin/convergence.rs
//
// Quadrature vs Monte Carlo benchmark.
//
// Draws one seeded state of the world, prices a fixed decision with the
// quadrature evaluator at several node counts and with the Monte Carlo
// evaluator at several sample counts, and reports each estimate's relative
// gap to a high-resolution quadrature reference together with its runtime.
//
// Run examples:
//   cargo run --bin convergence
//   cargo run --bin convergence -- --seed 7 --elevation-ft 4 --output-dir runs/convergence
//
// Output:
//   <output-dir>/convergence.json

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use elevate::config::{Config, DEFAULT_SURGE_TAIL_QUANTILES};
use elevate::evaluator::{MonteCarloEvaluator, QuadratureEvaluator, ScenarioEvaluator};
use elevate::output::atomic_write;
use elevate::scenario::builtin_trajectories;
use elevate::study::Study;
use elevate::types::Decision;

const REFERENCE_NODES: usize = 20_000;

#[derive(Debug, Parser)]
#[command(
    name = "convergence",
    about = "Compare quadrature and Monte Carlo expected-damage estimates"
)]
struct Args {
    /// Seed of the single sampled state of the world.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Decision to price (ft of elevation).
    #[arg(long, default_value_t = 0.0)]
    elevation_ft: f64,

    /// Quadrature node counts to try.
    #[arg(long, value_delimiter = ',', default_values_t = vec![10usize, 30, 130, 500])]
    nodes: Vec<usize>,

    /// Monte Carlo samples per year to try.
    #[arg(long, value_delimiter = ',', default_values_t = vec![1_000usize, 10_000, 100_000])]
    samples: Vec<usize>,

    #[arg(long, default_value = "runs/convergence")]
    output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct Row {
    method: &'static str,
    resolution: usize,
    cost_usd: f64,
    rel_error: f64,
    runtime_ms: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    seed: u64,
    elevation_ft: f64,
    reference_nodes: usize,
    reference_cost_usd: f64,
    rows: Vec<Row>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = Config::default();
    cfg.ensemble.size = 1;
    cfg.ensemble.seed = args.seed;
    let study = Study::new(cfg, builtin_trajectories()).context("invalid configuration")?;
    let ensemble = study.sample_ensemble()?;
    let params = study.model_params()?;
    let sow = &ensemble.sows()[0];
    let decision = Decision::new(args.elevation_ft);

    println!(
        "convergence | seed={} | elevation_ft={} | surge=GEV(loc={:.3}, scale={:.3}, shape={:.3}) | discount_rate={:.4}",
        args.seed,
        args.elevation_ft,
        sow.surge.location,
        sow.surge.scale,
        sow.surge.shape,
        sow.discount_rate
    );

    let discount = study.config().evaluator.discount;
    let reference = QuadratureEvaluator::new(REFERENCE_NODES, DEFAULT_SURGE_TAIL_QUANTILES, discount)
        .evaluate(&decision, sow, &params)?;

    let mut rows = Vec::new();
    let mut record = |method: &'static str, resolution: usize, eval: &dyn ScenarioEvaluator| -> Result<()> {
        let t0 = Instant::now();
        let cost = eval.evaluate(&decision, sow, &params)?;
        let runtime_ms = t0.elapsed().as_secs_f64() * 1e3;
        let rel_error = if reference != 0.0 {
            (cost - reference).abs() / reference.abs()
        } else {
            (cost - reference).abs()
        };
        println!(
            "{:<12} {:>8} cost_usd={:>14.2} rel_error={:>10.3e} runtime_ms={:>9.2}",
            method, resolution, cost, rel_error, runtime_ms
        );
        rows.push(Row {
            method,
            resolution,
            cost_usd: cost,
            rel_error,
            runtime_ms,
        });
        Ok(())
    };

    // Rows report the resolution the evaluator actually uses.
    for &n in &args.nodes {
        let eval = QuadratureEvaluator::new(n, DEFAULT_SURGE_TAIL_QUANTILES, discount);
        record("quadrature", eval.nodes(), &eval)?;
    }
    for &n in &args.samples {
        let eval = MonteCarloEvaluator::new(n, args.seed, discount);
        record("monte_carlo", eval.samples_per_year(), &eval)?;
    }

    let report = Report {
        seed: args.seed,
        elevation_ft: args.elevation_ft,
        reference_nodes: REFERENCE_NODES,
        reference_cost_usd: reference,
        rows,
    };
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let path = args.output_dir.join("convergence.json");
    atomic_write(&path, &serde_json::to_vec_pretty(&report)?)
        .with_context(|| format!("writing {}", path.display()))?;
    eprintln!("[convergence] wrote {}", path.display());
    Ok(())
}
