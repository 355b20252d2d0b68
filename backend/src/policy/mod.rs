//! Stage Policy Module
//!
//! One policy per pipeline stage. A stage reads the snapshot produced by the
//! previous stage and returns a [`StatePatch`] holding only what it changed.
//! Stages never mutate the snapshot they are given.
//!
//! # Stage Order
//!
//! ```text
//! 1. prices      refresh asset prices (every N timesteps)
//! 2. flows       cold start / steady-state deposits and withdrawals
//! 3. security    TVL, total security, staking ratios
//! 4. inflation   inflation rate and annual reward budget
//! 5. btc         BTC pool activation
//! 6. rewards     budget replenishment, boosted distribution
//! 7. yields      per-agent APR/APY
//! 8. restake     unlock expired stakes, restake and lock rewards
//! 9. admin       scheduled pause / resume / delete
//! ```
//!
//! # Policy Interface
//!
//! ```rust
//! use staking_simulator_core_rs::policy::{StageContext, StagePolicy, StatePatch};
//! use staking_simulator_core_rs::{SimulationError, SimulationState};
//!
//! struct NoOp;
//!
//! impl StagePolicy for NoOp {
//!     fn name(&self) -> &'static str {
//!         "noop"
//!     }
//!
//!     fn run(&self, _ctx: &StageContext<'_>, _state: &SimulationState) -> Result<StatePatch, SimulationError> {
//!         Ok(StatePatch::default())
//!     }
//! }
//! ```

use crate::models::agent::AgentRoster;
use crate::models::event::Event;
use crate::models::pool::PoolManager;
use crate::models::state::{Metrics, SimulationState};
use crate::orchestrator::{SimulationConfig, SimulationError};
use crate::prices::PriceFeed;

pub mod flows;
pub mod inflation;
pub mod lifecycle;
pub mod prices;
pub mod restake;
pub mod rewards;
pub mod security;
pub mod yields;

pub use flows::FlowPolicy;
pub use inflation::InflationPolicy;
pub use lifecycle::{AdminActionPolicy, BtcActivationPolicy};
pub use prices::PriceUpdatePolicy;
pub use restake::RestakePolicy;
pub use rewards::RewardTuningPolicy;
pub use security::SecurityMetricsPolicy;
pub use yields::YieldPolicy;

/// Read-only inputs shared by every stage of one timestep
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub config: &'a SimulationConfig,
    pub prices: &'a PriceFeed,
    /// Timestep being computed
    pub timestep: usize,
}

/// Partial state produced by one stage
///
/// `None` means "unchanged". Applying a patch replaces whole components.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub agents: Option<AgentRoster>,
    pub pool_manager: Option<PoolManager>,
    pub metrics: Option<Metrics>,
    pub events: Vec<Event>,
}

impl StatePatch {
    /// Merge into `state`, handing back the events
    pub fn apply(self, state: &mut SimulationState) -> Vec<Event> {
        if let Some(agents) = self.agents {
            state.agents = agents;
        }
        if let Some(pool_manager) = self.pool_manager {
            state.pool_manager = pool_manager;
        }
        if let Some(metrics) = self.metrics {
            state.metrics = metrics;
        }
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_none() && self.pool_manager.is_none() && self.metrics.is_none() && self.events.is_empty()
    }
}

/// One stage of the per-timestep pipeline
pub trait StagePolicy: Send + Sync {
    /// Stable stage name, used in errors and logs
    fn name(&self) -> &'static str;

    /// Compute this stage's changes from the current snapshot
    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError>;
}
