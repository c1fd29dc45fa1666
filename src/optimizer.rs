// src/optimizer.rs
//
// Derivative-free global search over a box under a wall-clock budget.
//
// Two population methods share one driver:
// - DifferentialEvolution: DE/rand/1/bin with greedy replacement.
// - EvolutionaryCenters: each individual moves along (centre of mass of a
//   random subsample, weighted by fitness) − (worst point of that subsample).
//
// The initial population always contains the all-lower and all-upper corners
// of the box, so boundary optima are hit exactly. Every trial is clamped into
// the box before evaluation.
//
// The time budget is checked before every objective evaluation and between
// generations. Running out of time is a normal stop: the best point seen so
// far is returned. With the same seed, config and objective the search is
// deterministic unless it stops on time.

use std::time::{Duration, Instant};

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::error::{ConfigError, Error};
use crate::logging::EventSink;
use crate::numeric::rank;
use crate::types::{Bounds, Decision};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    DifferentialEvolution,
    EvolutionaryCenters,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::DifferentialEvolution => "differential_evolution",
            Algorithm::EvolutionaryCenters => "evolutionary_centers",
        }
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TimeBudget,
    MaxGenerations,
    MaxEvaluations,
    Converged,
}

/// Progress snapshot emitted after each generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub evaluations: usize,
    pub best_value: f64,
    pub best_x: Vec<f64>,
    /// max − min of the population objective.
    pub spread: f64,
    pub elapsed_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_x: Vec<f64>,
    pub best_value: f64,
    pub generations: usize,
    pub evaluations: usize,
    pub elapsed_s: f64,
    pub termination: TerminationReason,
}

impl OptimizationResult {
    /// Best point as a house-elevation decision (one-dimensional searches).
    pub fn best_decision(&self) -> Result<Decision, ConfigError> {
        Decision::from_slice(&self.best_x)
    }
}


/// Evaluation bookkeeping shared by both algorithms.
struct Budget<F> {
    objective: F,
    start: Instant,
    limit: Duration,
    max_evaluations: Option<usize>,
    evaluations: usize,
    best_x: Vec<f64>,
    best_value: f64,
    stop: Option<TerminationReason>,
}

impl<F> Budget<F>
where
    F: FnMut(&[f64]) -> Result<f64, Error>,
{
    /// Evaluate `x`, or return None once a budget is spent.
    ///
    /// The very first evaluation always runs so there is a best point.
    fn eval(&mut self, x: &[f64]) -> Result<Option<f64>, Error> {
        if self.evaluations > 0 {
            if self.start.elapsed() >= self.limit {
                self.stop = Some(TerminationReason::TimeBudget);
                return Ok(None);
            }
            if self.max_evaluations.is_some_and(|m| self.evaluations >= m) {
                self.stop = Some(TerminationReason::MaxEvaluations);
                return Ok(None);
            }
        }
        let value = (self.objective)(x)?;
        self.evaluations += 1;
        if self.evaluations == 1 || rank(value) < rank(self.best_value) {
            self.best_value = value;
            self.best_x.clear();
            self.best_x.extend_from_slice(x);
        }
        Ok(Some(value))
    }

    fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

pub struct Optimizer {
    config: OptimizerConfig,
    rng: ChaCha8Rng,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig, rng: ChaCha8Rng) -> Self {
        Self { config, rng }
    }

    /// Seed the optimizer's RNG from `config.seed`.
    pub fn from_config(config: OptimizerConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::new(config, rng)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Minimise `objective` over `bounds`.
    pub fn run<F>(
        &mut self,
        objective: F,
        bounds: &Bounds,
        sink: &mut dyn EventSink,
    ) -> Result<OptimizationResult, Error>
    where
        F: FnMut(&[f64]) -> Result<f64, Error>,
    {
        self.config.validate()?;

        let mut budget = Budget {
            objective,
            start: Instant::now(),
            limit: self.config.time_limit()?,
            max_evaluations: self.config.max_evaluations,
            evaluations: 0,
            best_x: bounds.lower().to_vec(),
            best_value: f64::INFINITY,
            stop: None,
        };

        let (mut pop, mut fit) = self.initial_population(&mut budget, bounds)?;
        let mut generation = 0usize;

        while budget.stop.is_none() {
            if budget.start.elapsed() >= budget.limit {
                budget.stop = Some(TerminationReason::TimeBudget);
                break;
            }
            if generation >= self.config.max_generations {
                budget.stop = Some(TerminationReason::MaxGenerations);
                break;
            }

            match self.config.algorithm {
                Algorithm::DifferentialEvolution => {
                    self.de_generation(&mut budget, bounds, &mut pop, &mut fit)?
                }
                Algorithm::EvolutionaryCenters => {
                    self.eca_generation(&mut budget, bounds, &mut pop, &mut fit)?
                }
            }
            generation += 1;

            let spread = population_spread(&fit);
            sink.log_generation(&GenerationRecord {
                generation,
                evaluations: budget.evaluations,
                best_value: budget.best_value,
                best_x: budget.best_x.clone(),
                spread,
                elapsed_s: budget.elapsed_s(),
            });

            if budget.stop.is_none() && spread < self.config.tolerance {
                budget.stop = Some(TerminationReason::Converged);
            }
        }

        Ok(OptimizationResult {
            best_x: budget.best_x.clone(),
            best_value: budget.best_value,
            generations: generation,
            evaluations: budget.evaluations,
            elapsed_s: budget.elapsed_s(),
            termination: budget.stop.unwrap_or(TerminationReason::MaxGenerations),
        })
    }

    /// Box corners first, then uniform random points.
    fn initial_population<F>(
        &mut self,
        budget: &mut Budget<F>,
        bounds: &Bounds,
    ) -> Result<(Vec<Vec<f64>>, Vec<f64>), Error>
    where
        F: FnMut(&[f64]) -> Result<f64, Error>,
    {
        let np = self.config.population_size;
        let mut pop: Vec<Vec<f64>> = Vec::with_capacity(np);
        pop.push(bounds.lower().to_vec());
        pop.push(bounds.upper().to_vec());
        while pop.len() < np {
            let x: Vec<f64> = bounds
                .lower()
                .iter()
                .zip(bounds.upper())
                .map(|(&lo, &hi)| self.rng.gen_range(lo..=hi))
                .collect();
            pop.push(x);
        }

        let mut fit = Vec::with_capacity(np);
        for x in &pop {
            match budget.eval(x)? {
                Some(v) => fit.push(v),
                None => break,
            }
        }
        // Budget ran out mid-initialisation: keep only evaluated members.
        pop.truncate(fit.len());
        Ok((pop, fit))
    }

    fn de_generation<F>(
        &mut self,
        budget: &mut Budget<F>,
        bounds: &Bounds,
        pop: &mut [Vec<f64>],
        fit: &mut [f64],
    ) -> Result<(), Error>
    where
        F: FnMut(&[f64]) -> Result<f64, Error>,
    {
        let np = pop.len();
        if np < 4 {
            return Ok(());
        }
        let d = bounds.dimension();
        let f_weight = self.config.differential_weight;
        let cr = self.config.crossover_rate;

        for i in 0..np {
            let mut picks = index::sample(&mut self.rng, np, 4)
                .into_iter()
                .filter(|&r| r != i);
            let (Some(r1), Some(r2), Some(r3)) = (picks.next(), picks.next(), picks.next()) else {
                continue;
            };
            let j_rand = self.rng.gen_range(0..d);

            let mut trial = pop[i].clone();
            for j in 0..d {
                if j == j_rand || self.rng.gen::<f64>() < cr {
                    trial[j] = pop[r1][j] + f_weight * (pop[r2][j] - pop[r3][j]);
                }
            }
            bounds.clamp(&mut trial);

            let Some(value) = budget.eval(&trial)? else {
                return Ok(());
            };
            if rank(value) <= rank(fit[i]) {
                pop[i] = trial;
                fit[i] = value;
            }
        }
        Ok(())
    }

    fn eca_generation<F>(
        &mut self,
        budget: &mut Budget<F>,
        bounds: &Bounds,
        pop: &mut [Vec<f64>],
        fit: &mut [f64],
    ) -> Result<(), Error>
    where
        F: FnMut(&[f64]) -> Result<f64, Error>,
    {
        let np = pop.len();
        let k = self.config.centre_sample_size.min(np);
        if k < 2 {
            return Ok(());
        }
        let d = bounds.dimension();

        for i in 0..np {
            let sample = index::sample(&mut self.rng, np, k).into_vec();

            let worst = sample
                .iter()
                .copied()
                .fold(sample[0], |w, r| if rank(fit[r]) > rank(fit[w]) { r } else { w });
            let f_worst = rank(fit[worst]);

            // Masses: distance below the worst member of the subsample.
            let masses: Vec<f64> = sample
                .iter()
                .map(|&r| {
                    let m = f_worst - rank(fit[r]);
                    if m.is_finite() {
                        m
                    } else {
                        0.0
                    }
                })
                .collect();
            let total: f64 = masses.iter().sum();

            let mut centre = vec![0.0; d];
            for (&r, &m) in sample.iter().zip(&masses) {
                let w = if total > 0.0 { m / total } else { 1.0 / k as f64 };
                for j in 0..d {
                    centre[j] += w * pop[r][j];
                }
            }

            let eta = self.rng.gen_range(0.0..self.config.centre_step_max);
            let mut trial: Vec<f64> = (0..d)
                .map(|j| pop[i][j] + eta * (centre[j] - pop[worst][j]))
                .collect();
            bounds.clamp(&mut trial);

            let Some(value) = budget.eval(&trial)? else {
                return Ok(());
            };
            if rank(value) <= rank(fit[i]) {
                pop[i] = trial;
                fit[i] = value;
            }
        }
        Ok(())
    }
}

fn population_spread(fit: &[f64]) -> f64 {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in fit {
        let v = rank(v);
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if fit.is_empty() {
        return 0.0;
    }
    let spread = hi - lo;
    if spread.is_nan() {
        f64::INFINITY
    } else {
        spread
    }
}
