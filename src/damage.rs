// src/damage.rs
//
// House asset, depth-damage curves and construction cost.
//
// - DamageModel: flood depth at the house (ft, relative to the finished
//   floor) → fraction of replacement value lost, in [0, 1].
// - DepthDamageCurve: piecewise-linear table, flat beyond both ends.
// - DepthDamageTable: reference rows keyed by (description, occupancy,
//   source); a run selects exactly one.
// - ElevationCost: up-front cost of raising the house by Δh feet.
// - HouseAsset / ModelParams: immutable inputs shared by every evaluation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModelError};
use crate::types::{Horizon, Usd};

/// Depth → fractional structure damage. Must be pure and thread-safe.
pub trait DamageModel: Send + Sync + fmt::Debug {
    fn damage_fraction(&self, depth_ft: f64) -> f64;
}

/// Piecewise-linear depth-damage curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve", into = "RawCurve")]
pub struct DepthDamageCurve {
    depths_ft: Vec<f64>,
    fractions: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawCurve {
    depths_ft: Vec<f64>,
    fractions: Vec<f64>,
}

impl TryFrom<RawCurve> for DepthDamageCurve {
    type Error = ConfigError;

    fn try_from(raw: RawCurve) -> Result<Self, Self::Error> {
        DepthDamageCurve::new(raw.depths_ft, raw.fractions)
    }
}

impl From<DepthDamageCurve> for RawCurve {
    fn from(c: DepthDamageCurve) -> Self {
        RawCurve {
            depths_ft: c.depths_ft,
            fractions: c.fractions,
        }
    }
}

impl DepthDamageCurve {
    /// Depths must be strictly increasing and fractions within [0, 1].
    pub fn new(depths_ft: Vec<f64>, fractions: Vec<f64>) -> Result<Self, ConfigError> {
        if depths_ft.is_empty() || depths_ft.len() != fractions.len() {
            return Err(ConfigError::invalid(
                "damage_curve",
                format!(
                    "need matching non-empty depth/fraction columns (got {} and {})",
                    depths_ft.len(),
                    fractions.len()
                ),
            ));
        }
        if depths_ft.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ConfigError::invalid(
                "damage_curve.depths_ft",
                "depths must be strictly increasing",
            ));
        }
        if fractions
            .iter()
            .any(|f| !f.is_finite() || *f < 0.0 || *f > 1.0)
        {
            return Err(ConfigError::invalid(
                "damage_curve.fractions",
                "fractions must lie in [0, 1]",
            ));
        }
        Ok(Self {
            depths_ft,
            fractions,
        })
    }

    /// One-story, no-basement residential structure curve.
    pub fn one_story_no_basement() -> Self {
        let depths_ft = vec![
            -2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 14.0, 16.0,
        ];
        let fractions = vec![
            0.0, 0.025, 0.134, 0.233, 0.321, 0.401, 0.471, 0.532, 0.586, 0.632, 0.672, 0.705,
            0.732, 0.772, 0.797, 0.810,
        ];
        Self {
            depths_ft,
            fractions,
        }
    }

    pub fn depths_ft(&self) -> &[f64] {
        &self.depths_ft
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }
}

impl DamageModel for DepthDamageCurve {
    fn damage_fraction(&self, depth_ft: f64) -> f64 {
        let d = &self.depths_ft;
        let f = &self.fractions;
        if depth_ft <= d[0] {
            return f[0];
        }
        for i in 1..d.len() {
            if depth_ft <= d[i] {
                let t = (depth_ft - d[i - 1]) / (d[i] - d[i - 1]);
                return f[i - 1] + t * (f[i] - f[i - 1]);
            }
        }
        f[f.len() - 1]
    }
}

/// Key selecting one row of a depth-damage reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRowKey {
    pub description: String,
    pub occupancy: String,
    pub source: String,
}

/// One reference row: key columns plus its curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthDamageRow {
    #[serde(flatten)]
    pub key: DamageRowKey,
    pub curve: DepthDamageCurve,
}

/// Depth-damage reference table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthDamageTable {
    pub rows: Vec<DepthDamageRow>,
}

impl DepthDamageTable {
    pub fn new(rows: Vec<DepthDamageRow>) -> Self {
        Self { rows }
    }

    /// Exactly one row must match `key`.
    pub fn select(&self, key: &DamageRowKey) -> Result<&DepthDamageCurve, ModelError> {
        let mut matches = self.rows.iter().filter(|r| &r.key == key);
        match (matches.next(), matches.next()) {
            (Some(row), None) => Ok(&row.curve),
            (None, _) => Err(ModelError::MissingDamageRow {
                description: key.description.clone(),
                occupancy: key.occupancy.clone(),
                source: key.source.clone(),
            }),
            (Some(_), Some(_)) => Err(ModelError::AmbiguousDamageRow {
                matches: self.rows.iter().filter(|r| &r.key == key).count(),
                description: key.description.clone(),
            }),
        }
    }
}

/// Up-front cost of raising a house of `area_ft2` by `elevation_ft`.
pub trait ElevationCost: Send + Sync + fmt::Debug {
    fn cost_usd(&self, area_ft2: f64, elevation_ft: f64) -> Result<Usd, ModelError>;
}

/// Base cost plus per-square-foot rate interpolated over elevation
/// thresholds. Zero when the house is not raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationCostCurve {
    pub thresholds_ft: Vec<f64>,
    pub rates_usd_per_ft2: Vec<f64>,
    pub base_cost_usd: Usd,
}

impl Default for ElevationCostCurve {
    fn default() -> Self {
        Self {
            thresholds_ft: vec![0.0, 5.0, 8.5, 12.0, 14.0],
            rates_usd_per_ft2: vec![80.36, 82.5, 86.25, 103.75, 113.75],
            base_cost_usd: 10_000.0 + 300.0 + 470.0 + 4_300.0 + 2_175.0 + 3_500.0,
        }
    }
}

impl ElevationCostCurve {
    pub fn max_elevation_ft(&self) -> f64 {
        self.thresholds_ft.last().copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds_ft.is_empty()
            || self.thresholds_ft.len() != self.rates_usd_per_ft2.len()
        {
            return Err(ConfigError::invalid(
                "elevation_cost",
                "thresholds and rates must be non-empty and the same length",
            ));
        }
        if self.thresholds_ft.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ConfigError::invalid(
                "elevation_cost.thresholds_ft",
                "thresholds must be strictly increasing",
            ));
        }
        if self.base_cost_usd < 0.0 || self.rates_usd_per_ft2.iter().any(|r| *r < 0.0) {
            return Err(ConfigError::invalid(
                "elevation_cost",
                "costs must be non-negative",
            ));
        }
        Ok(())
    }

    fn rate(&self, elevation_ft: f64) -> f64 {
        let x = &self.thresholds_ft;
        let y = &self.rates_usd_per_ft2;
        if elevation_ft <= x[0] {
            return y[0];
        }
        for i in 1..x.len() {
            if elevation_ft <= x[i] {
                let t = (elevation_ft - x[i - 1]) / (x[i] - x[i - 1]);
                return y[i - 1] + t * (y[i] - y[i - 1]);
            }
        }
        y[y.len() - 1]
    }
}

impl ElevationCost for ElevationCostCurve {
    fn cost_usd(&self, area_ft2: f64, elevation_ft: f64) -> Result<Usd, ModelError> {
        let max_ft = self.max_elevation_ft();
        if !(elevation_ft >= 0.0 && elevation_ft <= max_ft) {
            return Err(ModelError::ElevationOutOfRange {
                elevation_ft,
                max_ft,
            });
        }
        if elevation_ft == 0.0 {
            return Ok(0.0);
        }
        Ok(self.base_cost_usd + area_ft2 * self.rate(elevation_ft))
    }
}

/// Static description of the house being protected.
#[derive(Debug, Clone)]
pub struct HouseAsset {
    area_ft2: f64,
    value_usd: Usd,
    height_above_gauge_ft: f64,
    damage: Arc<dyn DamageModel>,
}

impl HouseAsset {
    pub fn new(
        area_ft2: f64,
        value_usd: Usd,
        height_above_gauge_ft: f64,
        damage: Arc<dyn DamageModel>,
    ) -> Result<Self, ConfigError> {
        if !(area_ft2.is_finite() && area_ft2 > 0.0) {
            return Err(ConfigError::non_positive("house.area_ft2", area_ft2));
        }
        if !(value_usd.is_finite() && value_usd > 0.0) {
            return Err(ConfigError::non_positive("house.value_usd", value_usd));
        }
        if !height_above_gauge_ft.is_finite() {
            return Err(ConfigError::invalid(
                "house.height_above_gauge_ft",
                "must be finite",
            ));
        }
        Ok(Self {
            area_ft2,
            value_usd,
            height_above_gauge_ft,
            damage,
        })
    }

    pub fn area_ft2(&self) -> f64 {
        self.area_ft2
    }

    pub fn value_usd(&self) -> Usd {
        self.value_usd
    }

    pub fn height_above_gauge_ft(&self) -> f64 {
        self.height_above_gauge_ft
    }

    pub fn damage_fraction(&self, depth_ft: f64) -> f64 {
        self.damage.damage_fraction(depth_ft)
    }
}

/// Inputs shared read-only by every (decision, SOW) evaluation.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub horizon: Horizon,
    pub house: HouseAsset,
    pub elevation_cost: Arc<dyn ElevationCost>,
}

impl ModelParams {
    pub fn new(horizon: Horizon, house: HouseAsset, elevation_cost: Arc<dyn ElevationCost>) -> Self {
        Self {
            horizon,
            house,
            elevation_cost,
        }
    }

    /// Construction cost of a decision for this house.
    pub fn construction_cost(&self, elevation_ft: f64) -> Result<Usd, ModelError> {
        self.elevation_cost
            .cost_usd(self.house.area_ft2, elevation_ft)
    }
}
