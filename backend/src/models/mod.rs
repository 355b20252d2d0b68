//! Domain models for the staking simulator

pub mod agent;
pub mod allocation;
pub mod asset;
pub mod event;
pub mod pool;
pub mod state;

// Re-exports
pub use agent::{AgentError, AgentRoster, AgentStake, LockMultipliers, ShareMultipliers, ShareTier};
pub use allocation::{AssetAllocation, LockedStake};
pub use asset::{AssetKind, AssetMap};
pub use event::{Event, EventLog};
pub use pool::{BudgetSummary, PoolConfig, PoolError, PoolFlows, PoolManager, PoolStatus};
pub use state::{Metrics, PoolRewardOutcome, SimulationState};
