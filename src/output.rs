// src/output.rs
//
// Run outputs.
//
// - run_summary.json: stable summary of one optimisation study (written
//   atomically: temp file + rename, so readers never see a partial file)
// - sweep.csv: elevation_ft,objective rows of a validation sweep
// - generations.jsonl: written by logging::FileSink during the search

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::metrics::CostDistribution;
use crate::objective::{GridScan, SweepPoint};
use crate::optimizer::{OptimizationResult, TerminationReason};

/// Output schema version.
pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
pub const SWEEP_FILE: &str = "sweep.csv";
pub const GENERATIONS_FILE: &str = "generations.jsonl";

/// Recommended decision and how it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub elevation_ft: f64,
    /// Objective at the recommendation (USD, lower is better).
    pub objective: f64,
    pub termination: TerminationReason,
    pub generations: usize,
    pub evaluations: usize,
    pub elapsed_s: f64,
}

impl Recommendation {
    pub fn from_result(result: &OptimizationResult, elevation_ft: f64) -> Self {
        Self {
            elevation_ft,
            objective: result.best_value,
            termination: result.termination,
            generations: result.generations,
            evaluations: result.evaluations,
            elapsed_s: result.elapsed_s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub crate_version: String,
    pub run_id: String,
    pub profile: String,
    pub ensemble_size: usize,
    /// SHA-256 of the sampled ensemble parameters.
    pub ensemble_checksum: String,
    pub config: Config,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cost_distribution: Option<CostDistribution>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sweep_argmin: Option<SweepPoint>,
}

impl RunSummary {
    pub fn new(
        run_id: &str,
        profile: &str,
        config: &Config,
        ensemble_size: usize,
        ensemble_checksum: String,
    ) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            run_id: run_id.to_string(),
            profile: profile.to_string(),
            ensemble_size,
            ensemble_checksum,
            config: config.clone(),
            recommendation: None,
            cost_distribution: None,
            sweep_argmin: None,
        }
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        atomic_write(path.as_ref(), &bytes)
    }
}

/// Write `data` to a sibling temp file, fsync, then rename over `path`.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let temp_name = format!(
        ".tmp_{}_{}",
        std::process::id(),
        path.file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    );
    let temp_path = parent.join(&temp_name);

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// `elevation_ft,objective` CSV with a header row.
pub fn write_sweep_csv<P: AsRef<Path>>(path: P, scan: &GridScan) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "elevation_ft,objective")?;
    for p in &scan.points {
        writeln!(w, "{},{}", p.elevation_ft, p.objective)?;
    }
    w.flush()
}
