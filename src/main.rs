// src/main.rs
//
// Research-harness CLI for elevation studies.
//
//   elevate optimize [--spec run.yaml] [--profile exploratory|validation] ...
//   elevate sweep    [--spec run.yaml] [--step 0.14] ...
//
// Precedence for every knob: CLI flag > ELEVATE_* env > run spec > profile
// preset. The effective profile is printed on stderr at startup and a
// one-line run header on stdout.
//
// Outputs land in --output-dir:
//   run_summary.json   (always, written atomically)
//   generations.jsonl  (optimize)
//   sweep.csv          (sweep, or optimize --sweep-step)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use sha2::{Digest, Sha256};

use elevate::config::{resolve_effective_profile, Config, RunProfile};
use elevate::logging::{EventSink, FanoutSink, FileSink, NoopSink, StderrSink};
use elevate::output::{
    write_sweep_csv, Recommendation, RunSummary, GENERATIONS_FILE, RUN_SUMMARY_FILE, SWEEP_FILE,
};
use elevate::scenario::{builtin_trajectories, RunSpec};
use elevate::study::Study;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ProfileArg {
    Exploratory,
    Validation,
}

#[derive(Debug, Parser)]
#[command(
    name = "elevate",
    about = "Robust house-elevation search under sea-level, surge and discount-rate uncertainty",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search for the elevation with the lowest expected cost.
    Optimize {
        #[command(flatten)]
        common: CommonArgs,

        /// Also sweep the decision box at this step (ft) and write sweep.csv.
        #[arg(long)]
        sweep_step: Option<f64>,
    },
    /// Evaluate the objective on a fixed elevation grid only.
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        /// Grid step in feet.
        #[arg(long, default_value_t = 0.14)]
        step: f64,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// YAML run spec.
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Run profile preset.
    /// If omitted, uses ELEVATE_RUN_PROFILE, then the spec, then exploratory.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Ensemble sampler seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of states of the world.
    #[arg(long)]
    ensemble_size: Option<usize>,

    /// Optimizer wall-clock budget in seconds.
    #[arg(long)]
    time_limit: Option<f64>,

    /// Worker threads for ensemble evaluation.
    #[arg(long)]
    threads: Option<usize>,

    /// Directory for run outputs.
    #[arg(long, default_value = "runs/latest")]
    output_dir: PathBuf,

    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

struct Prepared {
    run_id: String,
    profile: RunProfile,
    study: Study,
}

fn prepare(args: &CommonArgs) -> Result<Prepared> {
    let spec = match &args.spec {
        Some(path) => Some(
            RunSpec::from_yaml_file(path)
                .with_context(|| format!("loading run spec {}", path.display()))?,
        ),
        None => None,
    };

    let cli_profile = args.profile.map(|p| match p {
        ProfileArg::Exploratory => RunProfile::Exploratory,
        ProfileArg::Validation => RunProfile::Validation,
    });
    let effective =
        resolve_effective_profile(cli_profile, spec.as_ref().and_then(|s| s.profile.as_deref()));
    effective.log_startup();

    let mut cfg = Config::for_profile(effective.profile);
    if let Some(spec) = &spec {
        spec.apply_to(&mut cfg)?;
    }
    cfg.apply_env_overrides();
    if let Some(seed) = args.seed {
        cfg.ensemble.seed = seed;
    }
    if let Some(n) = args.ensemble_size {
        cfg.ensemble.size = n;
    }
    if let Some(t) = args.time_limit {
        cfg.optimizer.time_limit_s = t;
    }
    if let Some(n) = args.threads {
        cfg.aggregator.threads = n;
    }

    let trajectories = spec
        .as_ref()
        .map(|s| s.trajectories())
        .unwrap_or_else(builtin_trajectories);
    let run_id = spec
        .as_ref()
        .map(|s| s.run_id.clone())
        .unwrap_or_else(|| "default".to_string());

    let study = Study::new(cfg, trajectories).context("invalid configuration")?;
    Ok(Prepared {
        run_id,
        profile: effective.profile,
        study,
    })
}

fn config_hash(cfg: &Config) -> Result<String> {
    let bytes = serde_json::to_vec(cfg)?;
    let digest = format!("{:x}", Sha256::digest(&bytes));
    Ok(digest[..16].to_string())
}

fn run(cli: Cli) -> Result<()> {
    let (common, sweep_step, optimize) = match &cli.command {
        Command::Optimize { common, sweep_step } => (common, *sweep_step, true),
        Command::Sweep { common, step } => (common, Some(*step), false),
    };

    let prepared = prepare(common)?;
    let study = &prepared.study;
    let cfg = study.config();

    let ensemble = study.sample_ensemble().context("sampling ensemble")?;
    let checksum = ensemble.checksum();
    println!(
        "elevate | cfg={} | cfg_hash={} | profile={} | run_id={} | ensemble={} | seed={} | evaluator={:?} | threads={}",
        cfg.version,
        config_hash(cfg)?,
        prepared.profile.as_str(),
        prepared.run_id,
        cfg.ensemble.size,
        cfg.ensemble.seed,
        cfg.evaluator.method,
        cfg.aggregator.threads,
    );
    if common.verbose > 0 {
        eprintln!("[run] ensemble_checksum={checksum}");
    }

    let out_dir: &Path = &common.output_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;

    let mut summary = RunSummary::new(
        &prepared.run_id,
        prepared.profile.as_str(),
        cfg,
        ensemble.len(),
        checksum,
    );
    let aggregator = study.aggregator(ensemble)?;

    if optimize {
        let mut file_sink = FileSink::create(out_dir.join(GENERATIONS_FILE))
            .context("creating generations log")?;
        let mut stderr_sink = StderrSink::new(if common.verbose > 1 { 1 } else { 10 });
        let mut noop = NoopSink;
        let progress: &mut dyn EventSink = if common.verbose > 0 {
            &mut stderr_sink
        } else {
            &mut noop
        };
        let mut sink = FanoutSink::new(vec![&mut file_sink as &mut dyn EventSink, progress]);

        let outcome = study.optimize(&aggregator, &mut sink)?;
        println!(
            "elevate | recommended_elevation_ft={:.3} | objective_usd={:.2} | termination={:?} | generations={} | evaluations={} | elapsed_s={:.2}",
            outcome.decision.elevation_ft,
            outcome.optimization.best_value,
            outcome.optimization.termination,
            outcome.optimization.generations,
            outcome.optimization.evaluations,
            outcome.optimization.elapsed_s,
        );
        println!(
            "elevate | cost_mean_usd={:.2} | cost_p95_usd={:.2} | cost_cvar95_usd={:.2}",
            outcome.costs.mean, outcome.costs.p95, outcome.costs.cvar95
        );
        summary.recommendation = Some(Recommendation::from_result(
            &outcome.optimization,
            outcome.decision.elevation_ft,
        ));
        summary.cost_distribution = Some(outcome.costs);
    }

    if let Some(step) = sweep_step {
        let scan = study.sweep(&aggregator, step)?;
        let sweep_path = out_dir.join(SWEEP_FILE);
        write_sweep_csv(&sweep_path, &scan)
            .with_context(|| format!("writing {}", sweep_path.display()))?;
        if let Some(best) = scan.argmin() {
            println!(
                "elevate | sweep_points={} | sweep_argmin_ft={:.3} | sweep_min_usd={:.2}",
                scan.points.len(),
                best.elevation_ft,
                best.objective
            );
        }
        summary.sweep_argmin = scan.argmin();
    }

    let summary_path = out_dir.join(RUN_SUMMARY_FILE);
    summary
        .write_to_file(&summary_path)
        .with_context(|| format!("writing {}", summary_path.display()))?;
    eprintln!("[run] wrote {}", summary_path.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
