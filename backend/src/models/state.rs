//! Simulation State
//!
//! The per-timestep snapshot: agents, the pool manager and the aggregate
//! metrics computed by the pipeline. Exactly one snapshot is live at a time;
//! each step consumes it and produces the next.
//!
//! # Critical Invariants
//!
//! 1. One agent per asset ("avl_maxi", "eth_maxi", "btc_maxi") for the whole run
//! 2. `metrics` always describes `agents` and `pool_manager` as of `timestep`
//! 3. Snapshots share nothing: cloning yields an independent run state

use crate::models::agent::{AgentRoster, AgentStake};
use crate::models::asset::{AssetKind, AssetMap};
use crate::models::pool::{PoolFlows, PoolManager};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What one pool asked for and received in a reward round
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolRewardOutcome {
    /// Per-timestep amount requested from the budget (AVL)
    pub requested: f64,
    /// Amount actually granted (AVL)
    pub granted: f64,
    /// `granted / requested` (1.0 when nothing was requested)
    pub scaling_factor: f64,
}

/// Aggregate metrics of one timestep
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub prices: AssetMap<f64>,
    /// USD value staked per asset
    pub asset_tvl: AssetMap<f64>,
    /// USD value staked across all assets
    pub total_security: f64,
    /// `asset_tvl / total_security` per asset
    pub staking_ratio_fusion: AssetMap<f64>,
    /// AVL TVL over FDV plus native staking; feeds the inflation curve
    pub staking_ratio_all: f64,
    pub total_fdv: f64,
    pub inflation_rate: f64,
    /// Annual inflation in AVL
    pub total_annual_inflation_rewards: f64,
    pub total_annual_inflation_rewards_usd: f64,
    /// Fusion's share of annual inflation, USD
    pub total_annual_rewards_fusion_usd: f64,
    pub target_yields: AssetMap<f64>,
    /// Effective APY paid by each pool last round
    pub pool_apy: AssetMap<f64>,
    pub flows: BTreeMap<AssetKind, PoolFlows>,
    pub pool_rewards: BTreeMap<AssetKind, PoolRewardOutcome>,
    /// Agent APR (annual reward USD over TVL)
    pub yield_pcts: BTreeMap<String, f64>,
    pub avg_yield: f64,
    pub compounded_yield_pcts: BTreeMap<String, f64>,
    pub avg_compounded_yield: f64,
    /// Share of aggregate TVL held in each asset
    pub agent_composition: AssetMap<f64>,
}

/// Complete simulation state at one timestep
///
/// # Example
///
/// ```rust
/// use staking_simulator_core_rs::{AgentStake, AssetMap, PoolManager, SimulationState};
///
/// let agents = AgentStake::create_maxi_agents(
///     &AssetMap::new(0.5, 0.5, 0.0),
///     1_000.0,
///     &AssetMap::new(0.1, 2500.0, 100000.0),
///     &AssetMap::new(1.0, 1.0, 1.0),
///     &AssetMap::new(0, 0, 0),
///     1.0,
/// )
/// .unwrap();
///
/// let state = SimulationState::new(agents, PoolManager::new(1_000.0), 42, String::new());
/// assert_eq!(state.timestep(), 0);
/// assert_eq!(state.num_agents(), 3);
/// assert_eq!(state.total_tvl(), 1_000.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub(crate) timestep: usize,
    pub(crate) seed: u64,
    /// Fingerprint of the configuration that produced this state
    pub(crate) config_fingerprint: String,
    pub(crate) agents: AgentRoster,
    pub(crate) pool_manager: PoolManager,
    pub(crate) metrics: Metrics,
}

impl SimulationState {
    pub fn new(agents: AgentRoster, pool_manager: PoolManager, seed: u64, config_fingerprint: String) -> Self {
        Self {
            timestep: 0,
            seed,
            config_fingerprint,
            agents,
            pool_manager,
            metrics: Metrics::default(),
        }
    }

    /// Independent deep copy, used when forking a run
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config_fingerprint(&self) -> &str {
        &self.config_fingerprint
    }

    pub fn agents(&self) -> &AgentRoster {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&AgentStake> {
        self.agents.get(id)
    }

    pub fn pool_manager(&self) -> &PoolManager {
        &self.pool_manager
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    /// USD value of `kind` held across all agents
    pub fn asset_tvl(&self, kind: AssetKind) -> f64 {
        self.agents.values().map(|agent| agent.tvl_of(kind)).sum()
    }

    /// Token balance of `kind` held across all agents
    pub fn asset_balance(&self, kind: AssetKind) -> f64 {
        self.agents.values().map(|agent| agent.asset(kind).balance()).sum()
    }

    pub fn total_tvl(&self) -> f64 {
        self.agents.values().map(AgentStake::total_tvl).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
