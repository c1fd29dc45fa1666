// src/sow.rs
//
// States of the world (SOWs) and the scenario sampler.
//
// A SOW fixes everything uncertain about the future of one house:
// - which sea-level-rise trajectory plays out,
// - the GEV distribution of the annual surge peak,
// - the discount rate.
//
// The sampler owns a seeded ChaCha8Rng; the same seed, config and trajectory
// set always produce the same ensemble. An ensemble is frozen once built and
// shared read-only by every objective evaluation.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::config::SamplerConfig;
use crate::error::ConfigError;
use crate::gev::GeneralizedExtremeValue;
use crate::numeric::{exponential, normal};
use crate::slr::SeaLevelModel;

/// One sampled future.
#[derive(Debug, Clone)]
pub struct StateOfWorld {
    /// Sea-level trajectory shared with every other SOW that drew it.
    pub slr: Arc<dyn SeaLevelModel>,
    /// Index of `slr` in the sampler's trajectory set.
    pub slr_index: usize,
    /// Annual surge peak distribution (ft).
    pub surge: GeneralizedExtremeValue,
    /// Annual discount rate, always > 0.
    pub discount_rate: f64,
}

/// Ordered, fixed-size, non-empty set of SOWs.
#[derive(Debug, Clone)]
pub struct Ensemble {
    sows: Arc<[StateOfWorld]>,
}

impl Ensemble {
    pub fn new(sows: Vec<StateOfWorld>) -> Result<Self, ConfigError> {
        if sows.is_empty() {
            return Err(ConfigError::EmptyEnsemble);
        }
        Ok(Self { sows: sows.into() })
    }

    pub fn len(&self) -> usize {
        self.sows.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.sows.is_empty()
    }

    pub fn sows(&self) -> &[StateOfWorld] {
        &self.sows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StateOfWorld> {
        self.sows.iter()
    }

    /// SHA-256 over the sampled parameters, lowercase hex.
    ///
    /// Two ensembles with the same checksum hold bit-identical surge and
    /// discount parameters and the same trajectory indices.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for sow in self.sows.iter() {
            hasher.update((sow.slr_index as u64).to_le_bytes());
            hasher.update(sow.surge.location.to_bits().to_le_bytes());
            hasher.update(sow.surge.scale.to_bits().to_le_bytes());
            hasher.update(sow.surge.shape.to_bits().to_le_bytes());
            hasher.update(sow.discount_rate.to_bits().to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a Ensemble {
    type Item = &'a StateOfWorld;
    type IntoIter = std::slice::Iter<'a, StateOfWorld>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Deterministic SOW sampler.
pub struct ScenarioSampler {
    config: SamplerConfig,
    trajectories: Vec<Arc<dyn SeaLevelModel>>,
    rng: ChaCha8Rng,
}

impl ScenarioSampler {
    pub fn new(
        config: SamplerConfig,
        trajectories: Vec<Arc<dyn SeaLevelModel>>,
        rng: ChaCha8Rng,
    ) -> Result<Self, ConfigError> {
        if trajectories.is_empty() {
            return Err(ConfigError::EmptyTrajectorySet);
        }
        config.validate()?;
        Ok(Self {
            config,
            trajectories,
            rng,
        })
    }

    pub fn from_seed(
        config: SamplerConfig,
        trajectories: Vec<Arc<dyn SeaLevelModel>>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::new(config, trajectories, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Draw one SOW.
    pub fn sample_one(&mut self) -> StateOfWorld {
        let cfg = &self.config;
        let slr_index = self.rng.gen_range(0..self.trajectories.len());

        let location = normal(&mut self.rng, cfg.surge_location_mean, cfg.surge_location_std);
        let scale = exponential(&mut self.rng, cfg.surge_scale_mean);
        let shape = normal(&mut self.rng, cfg.surge_shape_mean, cfg.surge_shape_std);

        let raw_rate = normal(&mut self.rng, cfg.discount_rate_mean, cfg.discount_rate_std);
        let discount_rate = raw_rate.max(cfg.discount_rate_floor);

        StateOfWorld {
            slr: Arc::clone(&self.trajectories[slr_index]),
            slr_index,
            surge: GeneralizedExtremeValue::new(location, scale, shape),
            discount_rate,
        }
    }

    /// Draw `n` SOWs into a frozen ensemble.
    pub fn sample(&mut self, n: usize) -> Result<Ensemble, ConfigError> {
        let sows: Vec<StateOfWorld> = self.by_ref().take(n).collect();
        Ensemble::new(sows)
    }
}

impl Iterator for ScenarioSampler {
    type Item = StateOfWorld;

    fn next(&mut self) -> Option<StateOfWorld> {
        Some(self.sample_one())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slr::{default_trajectories, SlrTrajectory};

    fn trajectories() -> Vec<Arc<dyn SeaLevelModel>> {
        default_trajectories()
            .into_iter()
            .map(|t| Arc::new(t) as Arc<dyn SeaLevelModel>)
            .collect()
    }

    #[test]
    fn same_seed_gives_identical_ensemble() {
        let mut a = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 42).unwrap();
        let mut b = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 42).unwrap();
        let ea = a.sample(200).unwrap();
        let eb = b.sample(200).unwrap();
        assert_eq!(ea.checksum(), eb.checksum());
        for (x, y) in ea.iter().zip(eb.iter()) {
            assert_eq!(x.slr_index, y.slr_index);
            assert_eq!(x.surge, y.surge);
            assert_eq!(x.discount_rate.to_bits(), y.discount_rate.to_bits());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 1).unwrap();
        let mut b = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 2).unwrap();
        assert_ne!(a.sample(50).unwrap().checksum(), b.sample(50).unwrap().checksum());
    }

    #[test]
    fn lazy_iteration_matches_eager_sampling() {
        let mut a = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 9).unwrap();
        let b = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 9).unwrap();
        let eager = a.sample(10).unwrap();
        let lazy = Ensemble::new(b.take(10).collect()).unwrap();
        assert_eq!(eager.checksum(), lazy.checksum());
    }

    #[test]
    fn discount_rate_is_floored_and_scale_positive() {
        let cfg = SamplerConfig {
            discount_rate_mean: -0.5,
            discount_rate_std: 0.01,
            discount_rate_floor: 0.002,
            ..SamplerConfig::default()
        };
        let mut s = ScenarioSampler::from_seed(cfg, trajectories(), 3).unwrap();
        for sow in s.sample(500).unwrap().iter() {
            assert_eq!(sow.discount_rate, 0.002);
            assert!(sow.surge.scale > 0.0);
        }
    }

    #[test]
    fn sampled_parameters_have_expected_moments() {
        let mut s = ScenarioSampler::from_seed(SamplerConfig::default(), trajectories(), 11).unwrap();
        let e = s.sample(20_000).unwrap();
        let n = e.len() as f64;
        let loc = e.iter().map(|w| w.surge.location).sum::<f64>() / n;
        let scale = e.iter().map(|w| w.surge.scale).sum::<f64>() / n;
        let shape = e.iter().map(|w| w.surge.shape).sum::<f64>() / n;
        assert!((loc - 5.0).abs() < 0.05);
        assert!((scale - 1.5).abs() < 0.05);
        assert!((shape - 0.1).abs() < 0.005);

        let mut counts = vec![0usize; 5];
        for w in e.iter() {
            counts[w.slr_index] += 1;
        }
        assert!(counts.iter().all(|&c| c > 3_500 && c < 4_500));
    }

    #[test]
    fn empty_trajectory_set_is_rejected() {
        let r = ScenarioSampler::from_seed(SamplerConfig::default(), Vec::new(), 0);
        assert!(matches!(r, Err(ConfigError::EmptyTrajectorySet)));
    }

    #[test]
    fn empty_ensemble_is_rejected() {
        assert!(matches!(Ensemble::new(Vec::new()), Err(ConfigError::EmptyEnsemble)));
        let mut s = ScenarioSampler::from_seed(
            SamplerConfig::default(),
            vec![Arc::new(SlrTrajectory::new(0.0, 0.01, 0.0, 2050.0, 0.0)) as Arc<dyn SeaLevelModel>],
            0,
        )
        .unwrap();
        assert!(s.sample(0).is_err());
    }
}
