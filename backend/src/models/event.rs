//! Event logging for auditing a simulation run.
//!
//! Every significant state change made by a pipeline stage is recorded as an
//! [`Event`]. Events are returned from each step and accumulated by the
//! orchestrator, so a reporting collaborator can reconstruct what happened
//! without diffing snapshots.
//!
//! # Event Types
//!
//! Events are grouped by pipeline stage:
//! - **Prices**: refreshed asset prices
//! - **Flows**: deposits/withdrawals applied, cap pauses, cold-start end
//! - **Lifecycle**: BTC activation, admin pause/resume/delete
//! - **Rewards**: budget replenishment, distribution, depletion
//! - **Restake**: restakes and unlocks
//!
//! # Example
//!
//! ```rust
//! use staking_simulator_core_rs::models::{Event, EventLog};
//! use staking_simulator_core_rs::AssetKind;
//!
//! let mut log = EventLog::new();
//! log.log(Event::PoolDeleted {
//!     timestep: 12,
//!     pool: AssetKind::Eth,
//!     stranded_budget: 1_000.0,
//! });
//!
//! assert_eq!(log.events_for_pool(AssetKind::Eth).len(), 1);
//! assert_eq!(log.events()[0].event_type(), "PoolDeleted");
//! ```

use crate::models::asset::{AssetKind, AssetMap};
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
///
/// All events carry the timestep they happened in. Within a timestep they
/// are logged in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum Event {
    /// Prices refreshed from the price feed
    PricesUpdated {
        timestep: usize,
        prices: AssetMap<f64>,
    },

    /// Deposit/withdrawal flows applied to a pool
    ///
    /// USD figures come from the flow model; token figures are what actually
    /// moved after the cap and unlocked-balance limits.
    FlowsApplied {
        timestep: usize,
        pool: AssetKind,
        apy: f64,
        deposit_usd: f64,
        withdrawal_usd: f64,
        deposited_tokens: f64,
        withdrawn_tokens: f64,
    },

    /// Pool hit its cap and stopped taking deposits
    CapReached {
        timestep: usize,
        pool: AssetKind,
        tvl: f64,
    },

    /// Cap-paused pool fell back under the resume threshold
    CapCleared {
        timestep: usize,
        pool: AssetKind,
        tvl: f64,
    },

    /// Post-cold-start pool parameters took effect
    ColdStartEnded { timestep: usize },

    /// BTC pool created and budget reallocated
    BtcPoolActivated {
        timestep: usize,
        allocation: AssetMap<f64>,
    },

    /// Scheduled top-up of a pool's budget
    BudgetReplenished {
        timestep: usize,
        pool: AssetKind,
        amount: f64,
    },

    /// Per-timestep rewards granted to a pool
    RewardsDistributed {
        timestep: usize,
        pool: AssetKind,
        requested: f64,
        granted: f64,
        scaling_factor: f64,
    },

    /// Pool granted ≤ 1% of what it asked for
    BudgetDepleted { timestep: usize, pool: AssetKind },

    /// Agent restaked part of its reward into AVL
    Restaked {
        timestep: usize,
        agent_id: String,
        amount: f64,
        locked: bool,
    },

    /// Agent's expired locks were released
    StakeUnlocked {
        timestep: usize,
        agent_id: String,
        amount: f64,
    },

    /// Admin paused deposits
    PoolPaused { timestep: usize, pool: AssetKind },

    /// Admin resumed deposits
    PoolResumed { timestep: usize, pool: AssetKind },

    /// Admin deleted a pool
    PoolDeleted {
        timestep: usize,
        pool: AssetKind,
        stranded_budget: f64,
    },
}

impl Event {
    /// Get the timestep when this event occurred
    pub fn timestep(&self) -> usize {
        match self {
            Event::PricesUpdated { timestep, .. }
            | Event::FlowsApplied { timestep, .. }
            | Event::CapReached { timestep, .. }
            | Event::CapCleared { timestep, .. }
            | Event::ColdStartEnded { timestep }
            | Event::BtcPoolActivated { timestep, .. }
            | Event::BudgetReplenished { timestep, .. }
            | Event::RewardsDistributed { timestep, .. }
            | Event::BudgetDepleted { timestep, .. }
            | Event::Restaked { timestep, .. }
            | Event::StakeUnlocked { timestep, .. }
            | Event::PoolPaused { timestep, .. }
            | Event::PoolResumed { timestep, .. }
            | Event::PoolDeleted { timestep, .. } => *timestep,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PricesUpdated { .. } => "PricesUpdated",
            Event::FlowsApplied { .. } => "FlowsApplied",
            Event::CapReached { .. } => "CapReached",
            Event::CapCleared { .. } => "CapCleared",
            Event::ColdStartEnded { .. } => "ColdStartEnded",
            Event::BtcPoolActivated { .. } => "BtcPoolActivated",
            Event::BudgetReplenished { .. } => "BudgetReplenished",
            Event::RewardsDistributed { .. } => "RewardsDistributed",
            Event::BudgetDepleted { .. } => "BudgetDepleted",
            Event::Restaked { .. } => "Restaked",
            Event::StakeUnlocked { .. } => "StakeUnlocked",
            Event::PoolPaused { .. } => "PoolPaused",
            Event::PoolResumed { .. } => "PoolResumed",
            Event::PoolDeleted { .. } => "PoolDeleted",
        }
    }

    /// Get the pool if the event relates to one
    pub fn pool(&self) -> Option<AssetKind> {
        match self {
            Event::FlowsApplied { pool, .. }
            | Event::CapReached { pool, .. }
            | Event::CapCleared { pool, .. }
            | Event::BudgetReplenished { pool, .. }
            | Event::RewardsDistributed { pool, .. }
            | Event::BudgetDepleted { pool, .. }
            | Event::PoolPaused { pool, .. }
            | Event::PoolResumed { pool, .. }
            | Event::PoolDeleted { pool, .. } => Some(*pool),
            Event::BtcPoolActivated { .. } => Some(AssetKind::Btc),
            _ => None,
        }
    }

    /// Get agent ID if the event relates to a specific agent
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Event::Restaked { agent_id, .. } | Event::StakeUnlocked { agent_id, .. } => Some(agent_id),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_at_timestep(&self, timestep: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.timestep() == timestep).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_agent(&self, agent_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.agent_id() == Some(agent_id))
            .collect()
    }

    pub fn events_for_pool(&self, pool: AssetKind) -> Vec<&Event> {
        self.events.iter().filter(|e| e.pool() == Some(pool)).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
