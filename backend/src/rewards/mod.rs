//! Inflation and reward engine
//!
//! - **inflation**: inflation rate from the staking ratio, annual reward budget
//! - **distribution**: per-pool reward requests against the shared budget,
//!   boosted per-agent shares, budget-pressure scaling
//! - **yields**: per-agent and average APR/APY

pub mod distribution;
pub mod inflation;
pub mod yields;

pub use distribution::{distribute_rewards, BoostConfig, DistributionOutcome, DEPLETION_SCALING_THRESHOLD};
pub use inflation::{calc_inflation_rate, InflationCurve, RewardBudget};
pub use yields::{compound_apr, YieldReport};
