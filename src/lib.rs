//! Elevate core library.
//!
//! Picks how high to raise a house against coastal flooding when future
//! sea-level rise, storm surge and the discount rate are deeply uncertain.
//! The binaries (`src/main.rs`, `src/bin/convergence.rs`) are thin research
//! harnesses around these components.
//!
//! # Architecture
//!
//! - **Sampler** (`sow`): seeded draws of states of the world (SLR trajectory,
//!   surge GEV parameters, discount rate) into a frozen `Ensemble`.
//! - **Evaluator** (`evaluator`): one (decision, SOW) pair → construction
//!   cost plus discounted expected annual flood damage. The surge expectation
//!   uses trapezoidal quadrature (default) or Monte Carlo.
//! - **Aggregator** (`objective`): ensemble → scalar objective, with scalar
//!   and slice adapters and optional scoped worker threads.
//! - **Optimizer** (`optimizer`): derivative-free box search (differential
//!   evolution or evolutionary centres) under a wall-clock budget.
//! - **Study** (`study`): wires the above from a `Config`.
//!
//! External models (`slr::SeaLevelModel`, `damage::DamageModel`,
//! `damage::ElevationCost`) are narrow traits; the crate ships simple
//! reference implementations of each.

pub mod config;
pub mod damage;
pub mod error;
pub mod evaluator;
pub mod gev;
pub mod logging;
pub mod metrics;
pub mod numeric;
pub mod objective;
pub mod optimizer;
pub mod output;
pub mod scenario;
pub mod slr;
pub mod sow;
pub mod study;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{Config, RunProfile};

pub use damage::{
    DamageModel, DepthDamageCurve, DepthDamageTable, ElevationCost, ElevationCostCurve,
    HouseAsset, ModelParams,
};

pub use error::{ConfigError, Error, ModelError};

pub use evaluator::{
    build_evaluator, DiscountConvention, EvaluationMethod, MonteCarloEvaluator,
    QuadratureEvaluator, ScenarioEvaluator,
};

pub use gev::GeneralizedExtremeValue;

pub use logging::{EventSink, FileSink, NoopSink, StderrSink};

pub use metrics::CostDistribution;

pub use objective::{grid, GridScan, ObjectiveAggregator, Reduction, SweepPoint};

pub use optimizer::{Algorithm, OptimizationResult, Optimizer, TerminationReason};

pub use scenario::{RunSpec, SpecError};

pub use slr::{SeaLevelModel, SlrTrajectory, TabulatedSlr};

pub use sow::{Ensemble, ScenarioSampler, StateOfWorld};

pub use study::{Study, StudyOutcome};

pub use types::{Bounds, Decision, Horizon, Sense};
