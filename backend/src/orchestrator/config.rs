//! Simulation configuration
//!
//! The parameter object handed to [`initialize`](super::initialize) and to
//! every [`step`](super::step). It is immutable for the run; everything that
//! changes over time is expressed as a lookup table keyed by timestep:
//!
//! - [`StepSchedule`]: piecewise-constant values (target yields)
//! - [`EventSchedule`]: one-off triggers (replenishment, admin actions)
//!
//! Missing JSON fields fall back to the defaults below.

use super::engine::SimulationError;
use crate::models::agent::SUM_TOLERANCE;
use crate::models::asset::{AssetKind, AssetMap};
use crate::models::pool::PoolConfig;
use crate::rewards::{BoostConfig, InflationCurve};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// ============================================================================
// Timestep-keyed tables
// ============================================================================

/// Piecewise-constant value over timesteps
///
/// The value at `t` is the entry with the greatest key `<= t`; timesteps
/// before the first key use the first entry.
///
/// # Example
/// ```
/// use staking_simulator_core_rs::orchestrator::StepSchedule;
///
/// let schedule = StepSchedule::from_entries([(1, 0.035), (50, 0.1)]);
/// assert_eq!(schedule.value_at(0), Some(&0.035));
/// assert_eq!(schedule.value_at(49), Some(&0.035));
/// assert_eq!(schedule.value_at(400), Some(&0.1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSchedule<T>(BTreeMap<usize, T>);

impl<T> StepSchedule<T> {
    pub fn from_entries(entries: impl IntoIterator<Item = (usize, T)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn value_at(&self, timestep: usize) -> Option<&T> {
        self.0
            .range(..=timestep)
            .next_back()
            .or_else(|| self.0.iter().next())
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<usize, T> {
        &self.0
    }
}

/// Values that fire only on their exact timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventSchedule<T>(BTreeMap<usize, T>);

impl<T> EventSchedule<T> {
    pub fn from_entries(entries: impl IntoIterator<Item = (usize, T)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn at(&self, timestep: usize) -> Option<&T> {
        self.0.get(&timestep)
    }

    pub fn entries(&self) -> &BTreeMap<usize, T> {
        &self.0
    }
}

impl<T> Default for EventSchedule<T> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Initial maxi agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// USD value staked at start, split by `composition`
    pub initial_tvl: f64,
    pub composition: AssetMap<f64>,
    /// Restake percentage of each asset's maxi agent
    pub restake_percentages: AssetMap<f64>,
    /// AVL lock preference (days) of each asset's maxi agent
    pub lock_preferences: AssetMap<u32>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            initial_tvl: 10.0,
            composition: AssetMap::new(0.4, 0.4, 0.2),
            restake_percentages: AssetMap::new(1.0, 1.0, 1.0),
            lock_preferences: AssetMap::new(180, 0, 0),
        }
    }
}

/// Cold-start phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColdStartConfig {
    /// Timesteps `t < duration` are in cold start
    pub duration_timesteps: usize,
    /// Multiplier on the APY fed to the flow model during cold start
    pub boost_factor: f64,
    /// Pool parameters swapped in when cold start ends
    pub post_cold_start_pools: BTreeMap<AssetKind, PoolConfig>,
}

impl Default for ColdStartConfig {
    fn default() -> Self {
        Self {
            duration_timesteps: 365,
            boost_factor: 1.0,
            post_cold_start_pools: BTreeMap::new(),
        }
    }
}

impl ColdStartConfig {
    pub fn is_cold_start(&self, timestep: usize) -> bool {
        timestep < self.duration_timesteps
    }
}

/// BTC pool activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BtcActivationConfig {
    pub enabled: bool,
    pub timestep: usize,
    /// Budget split applied on activation
    pub allocation: BTreeMap<AssetKind, f64>,
    pub pool: PoolConfig,
}

impl Default for BtcActivationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timestep: 180,
            allocation: BTreeMap::from([(AssetKind::Avl, 0.5), (AssetKind::Eth, 0.2), (AssetKind::Btc, 0.3)]),
            pool: PoolConfig::btc_default(),
        }
    }
}

/// Admin pool actions by timestep
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSchedule {
    pub pause_deposits: EventSchedule<Vec<AssetKind>>,
    pub resume_deposits: EventSchedule<Vec<AssetKind>>,
    pub delete_pools: EventSchedule<Vec<AssetKind>>,
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Timestep length in days
    pub delta_time_days: f64,
    /// Refresh prices every N timesteps
    pub price_update_interval: usize,
    /// AVL total supply
    pub total_supply: f64,
    /// Share of supply staked natively, added to the fusion staking ratio
    pub native_staking_ratio: f64,
    /// Share of annual inflation (USD) earmarked for fusion pools
    pub fusion_rewards_allocation: f64,
    pub initial_prices: AssetMap<f64>,
    pub agents: AgentsConfig,
    /// Seed budget of the pool manager (AVL)
    pub initial_budget: f64,
    pub budget_allocation: BTreeMap<AssetKind, f64>,
    /// Overrides for the initial pool parameters
    pub pools: BTreeMap<AssetKind, PoolConfig>,
    pub target_yields: StepSchedule<AssetMap<f64>>,
    pub inflation: InflationCurve,
    pub boost: BoostConfig,
    pub cold_start: ColdStartConfig,
    pub btc_activation: BtcActivationConfig,
    /// AVL added to the budget at each timestep, split by allocation weights
    pub budget_replenishment: EventSchedule<f64>,
    pub admin: AdminSchedule,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delta_time_days: 1.0,
            price_update_interval: 1,
            total_supply: 10e9,
            native_staking_ratio: 0.5,
            fusion_rewards_allocation: 0.1,
            initial_prices: AssetMap::new(0.05, 2500.0, 100000.0),
            agents: AgentsConfig::default(),
            initial_budget: 30e6,
            budget_allocation: BTreeMap::from([(AssetKind::Avl, 0.7), (AssetKind::Eth, 0.3)]),
            pools: BTreeMap::new(),
            target_yields: StepSchedule::from_entries([
                (0, AssetMap::new(0.15, 0.035, 0.0)),
                (50, AssetMap::new(0.15, 0.1, 0.0)),
                (180, AssetMap::new(0.15, 0.035, 0.05)),
            ]),
            inflation: InflationCurve::default(),
            boost: BoostConfig::default(),
            cold_start: ColdStartConfig::default(),
            btc_activation: BtcActivationConfig::default(),
            budget_replenishment: EventSchedule::from_entries([
                (30, 5e6),
                (60, 5e6),
                (90, 5e6),
                (120, 5e6),
                (150, 5e6),
                (180, 10e6),
            ]),
            admin: AdminSchedule::default(),
        }
    }
}

fn check_split(name: &str, sum: f64) -> Result<(), SimulationError> {
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(SimulationError::InvalidConfig(format!(
            "{} must sum to 1.0 (got {})",
            name, sum
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Example
    /// ```
    /// use staking_simulator_core_rs::orchestrator::SimulationConfig;
    ///
    /// let config = SimulationConfig::from_json_str(r#"{"total_supply": 1e9}"#).unwrap();
    /// assert_eq!(config.total_supply, 1e9);
    /// assert_eq!(config.delta_time_days, 1.0);
    ///
    /// assert!(SimulationConfig::from_json_str(r#"{"delta_time_days": 0}"#).is_err());
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig = serde_json::from_str(json)
            .map_err(|e| SimulationError::Serialization(format!("Config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimulationError::Serialization(format!("Config serialization failed: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.delta_time_days <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "delta_time_days must be > 0".to_string(),
            ));
        }

        if self.price_update_interval == 0 {
            return Err(SimulationError::InvalidConfig(
                "price_update_interval must be > 0".to_string(),
            ));
        }

        if self.total_supply < 0.0 || self.initial_budget < 0.0 || self.agents.initial_tvl < 0.0 {
            return Err(SimulationError::InvalidConfig(
                "total_supply, initial_budget and initial_tvl must be >= 0".to_string(),
            ));
        }

        if self.native_staking_ratio < 0.0 {
            return Err(SimulationError::InvalidConfig(
                "native_staking_ratio must be >= 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.fusion_rewards_allocation) {
            return Err(SimulationError::InvalidConfig(
                "fusion_rewards_allocation must be within [0, 1]".to_string(),
            ));
        }

        if let Some((kind, price)) = self.initial_prices.iter().find(|(_, price)| **price < 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "initial price of {} must be >= 0 (got {})",
                kind, price
            )));
        }

        check_split("agents.composition", self.agents.composition.values().sum())?;
        if let Some((kind, pct)) = self
            .agents
            .restake_percentages
            .iter()
            .find(|(_, pct)| !(0.0..=1.0).contains(*pct))
        {
            return Err(SimulationError::InvalidConfig(format!(
                "restake percentage of {} must be within [0, 1] (got {})",
                kind, pct
            )));
        }

        check_split("budget_allocation", self.budget_allocation.values().sum())?;
        if self.btc_activation.enabled {
            check_split("btc_activation.allocation", self.btc_activation.allocation.values().sum())?;
        }

        if self.target_yields.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "target_yields must have at least one entry".to_string(),
            ));
        }

        if self.cold_start.boost_factor < 0.0 {
            return Err(SimulationError::InvalidConfig(
                "cold_start.boost_factor must be >= 0".to_string(),
            ));
        }

        self.inflation.validate().map_err(SimulationError::InvalidConfig)?;

        Ok(())
    }

    /// Target yields in effect at `timestep` (zero if none configured)
    pub fn target_yields_at(&self, timestep: usize) -> AssetMap<f64> {
        self.target_yields.value_at(timestep).copied().unwrap_or_default()
    }

    /// SHA-256 of the canonical (key-sorted) JSON form
    ///
    /// Two configs with the same fingerprint produce identical runs for the
    /// same seed and prices.
    pub fn fingerprint(&self) -> Result<String, SimulationError> {
        use serde_json::Value;

        let value = serde_json::to_value(self)
            .map_err(|e| SimulationError::Serialization(format!("Config serialization failed: {}", e)))?;

        fn canonicalize(value: Value) -> Value {
            match value {
                Value::Object(map) => {
                    let sorted: BTreeMap<String, Value> =
                        map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                    Value::Object(sorted.into_iter().collect())
                }
                Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
                other => other,
            }
        }

        let json = serde_json::to_string(&canonicalize(value))
            .map_err(|e| SimulationError::Serialization(format!("Config serialization failed: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_composition() {
        let mut config = SimulationConfig::default();
        config.agents.composition = AssetMap::new(0.5, 0.2, 0.0);
        assert!(matches!(config.validate(), Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn test_schedules_parse_from_json() {
        let config = SimulationConfig::from_json_str(
            r#"{
                "admin": {"delete_pools": {"100": ["ETH"]}},
                "budget_replenishment": {"10": 1000.0},
                "target_yields": {"0": {"AVL": 0.2, "ETH": 0.04}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.admin.delete_pools.at(100), Some(&vec![AssetKind::Eth]));
        assert_eq!(config.budget_replenishment.at(10), Some(&1000.0));
        assert_eq!(config.budget_replenishment.at(30), None);
        assert_eq!(config.target_yields_at(7)[AssetKind::Btc], 0.0);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = SimulationConfig::default();
        let mut b = SimulationConfig::default();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.total_supply = 1.0;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }
}
