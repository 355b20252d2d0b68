//! Pool manager
//!
//! Owns the shared AVL reward budget and the per-asset pools that draw on it.
//! Each pool has a sigmoid deposit/withdrawal response to its APY, an optional
//! TVL cap, and a lifecycle:
//!
//! ```text
//! NotCreated ──add_pool──▶ Active ◀──resume──▶ Paused / CapPaused
//!                            │                        │
//!                            └──────delete_pool───────┴──▶ Deleted (terminal)
//! ```
//!
//! # Critical Invariants
//!
//! 1. `get_pool_rewards` is the only path that spends budget; it never drives
//!    an allocation below zero
//! 2. Spent budget (global and per pool) never decreases
//! 3. A deleted pool is always also paused
//!
//! Lookups of pools that do not exist resolve to zero or "not created"
//! rather than failing.

use crate::models::agent::SUM_TOLERANCE;
use crate::models::asset::AssetKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Share of TVL withdrawn per timestep from a deleted pool
pub const DELETED_POOL_DRAIN_RATE: f64 = 0.30;

/// Floor on withdrawals (share of TVL) while a pool's budget is depleted
pub const PANIC_WITHDRAWAL_RATE: f64 = 0.15;

/// Cap-paused pools resume once TVL falls below this share of the cap
pub const CAP_RESUME_RATIO: f64 = 0.95;

/// Errors that can occur during pool manager operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("Allocations must sum to 1.0 (got {sum})")]
    InvalidAllocation { sum: f64 },

    #[error("Amount must be non-negative, got {0}")]
    NegativeAmount(f64),
}

/// Deposit/withdrawal response parameters of one pool
///
/// Flows are in USD per timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub base_deposit: f64,
    pub max_extra_deposit: f64,
    /// Sensitivity of deposits to APY
    pub deposit_k: f64,
    /// APY at which both sigmoids sit at their midpoint
    pub apy_threshold: f64,
    pub base_withdrawal: f64,
    pub max_extra_withdrawal: f64,
    /// Sensitivity of withdrawals to APY
    pub withdrawal_k: f64,
    /// TVL (USD) at which deposits pause; `None` means uncapped
    #[serde(default)]
    pub max_cap: Option<f64>,
}

impl PoolConfig {
    pub fn avl_default() -> Self {
        Self {
            base_deposit: 5e4,
            max_extra_deposit: 1e5,
            deposit_k: 5.0,
            apy_threshold: 0.10,
            base_withdrawal: 5e3,
            max_extra_withdrawal: 1e5,
            withdrawal_k: 7.0,
            max_cap: None,
        }
    }

    pub fn eth_default() -> Self {
        Self {
            base_deposit: 5e4,
            max_extra_deposit: 5e5,
            deposit_k: 8.0,
            apy_threshold: 0.03,
            base_withdrawal: 5e3,
            max_extra_withdrawal: 1.5e5,
            withdrawal_k: 10.0,
            max_cap: None,
        }
    }

    /// Parameters used when the BTC pool is activated
    pub fn btc_default() -> Self {
        Self {
            base_deposit: 1e5,
            max_extra_deposit: 4e5,
            deposit_k: 6.0,
            apy_threshold: 0.02,
            base_withdrawal: 8e3,
            max_extra_withdrawal: 2e5,
            withdrawal_k: 9.0,
            max_cap: None,
        }
    }

    pub fn default_for(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Avl => Self::avl_default(),
            AssetKind::Eth => Self::eth_default(),
            AssetKind::Btc => Self::btc_default(),
        }
    }
}

/// Flows computed for one pool, in USD
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoolFlows {
    pub deposit: f64,
    pub withdrawal: f64,
}

impl PoolFlows {
    pub fn net(&self) -> f64 {
        self.deposit - self.withdrawal
    }
}

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    NotCreated,
    Active,
    Paused,
    CapPaused,
    Deleted,
}

/// Snapshot of budget usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub initial_budget: f64,
    pub current_total_budget: f64,
    /// Sum of what is still allocated to pools
    pub allocated_budget: f64,
    pub spent_budget: f64,
    pub spent_budget_per_pool: BTreeMap<AssetKind, f64>,
    pub unallocated_budget: f64,
    /// `spent / initial × 100` (0 when the initial budget is 0)
    pub budget_utilization_pct: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Shared budget and per-asset pools
///
/// # Example
/// ```
/// use staking_simulator_core_rs::{AssetKind, PoolManager};
/// use std::collections::BTreeMap;
///
/// let mut manager = PoolManager::new(30_000_000.0);
/// manager
///     .allocate_budget(&BTreeMap::from([(AssetKind::Avl, 0.7), (AssetKind::Eth, 0.3)]))
///     .unwrap();
/// assert_eq!(manager.remaining_budget(AssetKind::Avl), 21_000_000.0);
///
/// let granted = manager.get_pool_rewards(AssetKind::Eth, 1_000.0);
/// assert_eq!(granted, 1_000.0);
/// assert_eq!(manager.spent_budget(), 1_000.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolManager {
    total_budget: f64,
    initial_budget: f64,
    pools: BTreeMap<AssetKind, PoolConfig>,
    allocated_budgets: BTreeMap<AssetKind, f64>,
    /// Percentages passed to the last `allocate_budget`
    allocation_weights: BTreeMap<AssetKind, f64>,
    spent_budget: f64,
    spent_budget_per_pool: BTreeMap<AssetKind, f64>,
    paused: BTreeSet<AssetKind>,
    cap_paused: BTreeSet<AssetKind>,
    deleted: BTreeSet<AssetKind>,
    budget_depleted: BTreeSet<AssetKind>,
}

impl PoolManager {
    /// Create a manager with the default AVL and ETH pools
    pub fn new(total_budget: f64) -> Self {
        Self::with_pools(total_budget, BTreeMap::new())
    }

    /// Create a manager with explicit pool configs
    ///
    /// AVL and ETH always exist; a config supplied for them replaces the
    /// defaults. BTC only exists if supplied here or added later.
    pub fn with_pools(total_budget: f64, mut pools: BTreeMap<AssetKind, PoolConfig>) -> Self {
        for kind in [AssetKind::Avl, AssetKind::Eth] {
            pools.entry(kind).or_insert_with(|| PoolConfig::default_for(kind));
        }

        let zeroes: BTreeMap<AssetKind, f64> = pools.keys().map(|kind| (*kind, 0.0)).collect();

        Self {
            total_budget: total_budget.max(0.0),
            initial_budget: total_budget.max(0.0),
            pools,
            allocated_budgets: zeroes.clone(),
            allocation_weights: BTreeMap::new(),
            spent_budget: 0.0,
            spent_budget_per_pool: zeroes,
            paused: BTreeSet::new(),
            cap_paused: BTreeSet::new(),
            deleted: BTreeSet::new(),
            budget_depleted: BTreeSet::new(),
        }
    }

    // ========================================================================
    // Budget
    // ========================================================================

    /// Set each pool's allocation to `total_budget × percentage`
    ///
    /// Replaces prior allocations of the listed pools; deleted pools and
    /// pools that do not exist yet are skipped. Pools not listed keep their
    /// allocation.
    ///
    /// # Errors
    /// `InvalidAllocation` if the percentages do not sum to 1 ± 0.01.
    pub fn allocate_budget(&mut self, percentages: &BTreeMap<AssetKind, f64>) -> Result<(), PoolError> {
        let sum: f64 = percentages.values().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(PoolError::InvalidAllocation { sum });
        }
        if let Some(negative) = percentages.values().find(|pct| **pct < 0.0) {
            return Err(PoolError::NegativeAmount(*negative));
        }

        for (kind, pct) in percentages {
            if self.deleted.contains(kind) {
                continue;
            }
            if !self.pools.contains_key(kind) {
                debug!(pool = %kind, share = pct, "allocation for a pool that does not exist skipped");
                continue;
            }
            self.allocated_budgets.insert(*kind, self.total_budget * pct);
        }
        self.allocation_weights = percentages.clone();
        Ok(())
    }

    /// Grant up to `required_amount` from a pool's allocation
    ///
    /// Returns `min(required_amount, allocated)`; deleted and non-existent
    /// pools always get 0. The granted amount moves from the allocation to
    /// spent budget.
    pub fn get_pool_rewards(&mut self, kind: AssetKind, required_amount: f64) -> f64 {
        if self.deleted.contains(&kind) || !self.pools.contains_key(&kind) {
            return 0.0;
        }

        let available = self.remaining_budget(kind);
        let granted = required_amount.max(0.0).min(available);
        if granted <= 0.0 {
            return 0.0;
        }

        self.allocated_budgets.insert(kind, available - granted);
        self.spent_budget += granted;
        *self.spent_budget_per_pool.entry(kind).or_insert(0.0) += granted;
        granted
    }

    /// Add `amount` to a pool's allocation and to the total budget
    ///
    /// Deleted or non-existent pools are skipped; returns whether the
    /// top-up was applied.
    pub fn replenish_budget(&mut self, kind: AssetKind, amount: f64) -> Result<bool, PoolError> {
        if amount < 0.0 {
            return Err(PoolError::NegativeAmount(amount));
        }
        if self.deleted.contains(&kind) || !self.pools.contains_key(&kind) {
            return Ok(false);
        }

        *self.allocated_budgets.entry(kind).or_insert(0.0) += amount;
        self.total_budget += amount;
        Ok(true)
    }

    /// Split `amount` across live pools by the last allocation weights
    ///
    /// Weights of deleted or missing pools are dropped and the rest
    /// renormalized; with no usable weights the amount is split evenly.
    /// Returns what each pool received.
    pub fn replenish_by_weights(&mut self, amount: f64) -> Result<BTreeMap<AssetKind, f64>, PoolError> {
        if amount < 0.0 {
            return Err(PoolError::NegativeAmount(amount));
        }

        let live: Vec<AssetKind> = self.active_pools();
        let mut weights: BTreeMap<AssetKind, f64> = live
            .iter()
            .filter_map(|kind| {
                self.allocation_weights
                    .get(kind)
                    .filter(|weight| **weight > 0.0)
                    .map(|weight| (*kind, *weight))
            })
            .collect();
        if weights.is_empty() {
            weights = live.iter().map(|kind| (*kind, 1.0)).collect();
        }

        let total_weight: f64 = weights.values().sum();
        let mut applied = BTreeMap::new();
        if total_weight <= 0.0 {
            return Ok(applied);
        }

        for (kind, weight) in weights {
            let share = amount * weight / total_weight;
            if self.replenish_budget(kind, share)? {
                applied.insert(kind, share);
            }
        }
        Ok(applied)
    }

    pub fn total_budget(&self) -> f64 {
        self.total_budget
    }

    pub fn initial_budget(&self) -> f64 {
        self.initial_budget
    }

    pub fn spent_budget(&self) -> f64 {
        self.spent_budget
    }

    pub fn spent_budget_of(&self, kind: AssetKind) -> f64 {
        self.spent_budget_per_pool.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn spent_budget_per_pool(&self) -> &BTreeMap<AssetKind, f64> {
        &self.spent_budget_per_pool
    }

    /// Budget still allocated to a pool (0 for unknown pools)
    pub fn remaining_budget(&self, kind: AssetKind) -> f64 {
        self.allocated_budgets.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn remaining_budgets(&self) -> &BTreeMap<AssetKind, f64> {
        &self.allocated_budgets
    }

    pub fn total_remaining_budget(&self) -> f64 {
        self.allocated_budgets.values().sum()
    }

    pub fn allocation_weights(&self) -> &BTreeMap<AssetKind, f64> {
        &self.allocation_weights
    }

    pub fn budget_summary(&self) -> BudgetSummary {
        let allocated = self.total_remaining_budget();
        BudgetSummary {
            initial_budget: self.initial_budget,
            current_total_budget: self.total_budget,
            allocated_budget: allocated,
            spent_budget: self.spent_budget,
            spent_budget_per_pool: self.spent_budget_per_pool.clone(),
            unallocated_budget: self.total_budget - allocated,
            budget_utilization_pct: if self.initial_budget > 0.0 {
                self.spent_budget / self.initial_budget * 100.0
            } else {
                0.0
            },
        }
    }

    // ========================================================================
    // Flows
    // ========================================================================

    /// Deposit and withdrawal flows (USD) for a pool at `current_apy`
    ///
    /// Deleted pools drain 30% of TVL and take no deposits. Paused or
    /// budget-depleted pools take no deposits; depleted pools also withdraw at
    /// least 15% of TVL. Unknown pools use the default parameters of their
    /// asset.
    ///
    /// # Example
    /// ```
    /// use staking_simulator_core_rs::{AssetKind, PoolManager};
    ///
    /// let manager = PoolManager::new(0.0);
    /// let flows = manager.calculate_flows(AssetKind::Avl, 0.10, 1_000_000.0);
    /// // base 5e4 + 1e5 × sigmoid(0)
    /// assert_eq!(flows.deposit, 100_000.0);
    /// ```
    pub fn calculate_flows(&self, kind: AssetKind, current_apy: f64, current_tvl: f64) -> PoolFlows {
        if self.deleted.contains(&kind) {
            return PoolFlows {
                deposit: 0.0,
                withdrawal: current_tvl.max(0.0) * DELETED_POOL_DRAIN_RATE,
            };
        }

        let config = self
            .pools
            .get(&kind)
            .copied()
            .unwrap_or_else(|| PoolConfig::default_for(kind));
        let depleted = self.budget_depleted.contains(&kind);

        let mut deposit = config.base_deposit
            + config.max_extra_deposit * sigmoid(config.deposit_k * (current_apy - config.apy_threshold));
        if self.paused.contains(&kind) || depleted {
            deposit = 0.0;
        }

        let mut withdrawal = config.base_withdrawal
            + config.max_extra_withdrawal
                * sigmoid(config.withdrawal_k * (config.apy_threshold - current_apy));
        if depleted {
            withdrawal = withdrawal.max(current_tvl.max(0.0) * PANIC_WITHDRAWAL_RATE);
        }

        PoolFlows { deposit, withdrawal }
    }

    /// Pause or resume deposits against the pool's cap
    ///
    /// Pauses (cap-flagged) once `current_tvl >= max_cap`. A cap-flagged
    /// pause lifts when TVL drops below 95% of the cap, or as soon as the
    /// pool has no cap. Other pauses are left alone. Returns whether deposits
    /// are paused afterwards.
    pub fn check_cap_status(&mut self, kind: AssetKind, current_tvl: f64) -> bool {
        let Some(max_cap) = self.pools.get(&kind).and_then(|config| config.max_cap) else {
            if self.cap_paused.contains(&kind) {
                info!(pool = %kind, tvl = current_tvl, "cap removed, deposits resumed");
                self.resume_deposits(kind);
            }
            return self.paused.contains(&kind);
        };

        if current_tvl >= max_cap {
            if !self.cap_paused.contains(&kind) {
                info!(pool = %kind, tvl = current_tvl, max_cap, "pool reached cap, deposits paused");
            }
            self.pause_deposits(kind, true);
            return true;
        }

        if self.cap_paused.contains(&kind) && current_tvl < max_cap * CAP_RESUME_RATIO {
            info!(pool = %kind, tvl = current_tvl, max_cap, "pool back under cap, deposits resumed");
            self.resume_deposits(kind);
            return self.paused.contains(&kind);
        }

        self.paused.contains(&kind)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a pool (or replace the config of an existing one)
    ///
    /// Deleted pools cannot be recreated; returns whether the pool was added.
    pub fn add_pool(&mut self, kind: AssetKind, config: PoolConfig) -> bool {
        if self.deleted.contains(&kind) {
            warn!(pool = %kind, "refusing to recreate a deleted pool");
            return false;
        }
        self.pools.insert(kind, config);
        self.allocated_budgets.entry(kind).or_insert(0.0);
        self.spent_budget_per_pool.entry(kind).or_insert(0.0);
        true
    }

    /// Replace the config of an existing pool; unknown pools are ignored
    pub fn set_pool_config(&mut self, kind: AssetKind, config: PoolConfig) {
        if let Some(existing) = self.pools.get_mut(&kind) {
            *existing = config;
        }
    }

    pub fn pool_config(&self, kind: AssetKind) -> Option<&PoolConfig> {
        self.pools.get(&kind)
    }

    pub fn pools(&self) -> &BTreeMap<AssetKind, PoolConfig> {
        &self.pools
    }

    pub fn pause_deposits(&mut self, kind: AssetKind, due_to_cap: bool) {
        if self.paused.insert(kind) && !due_to_cap {
            info!(pool = %kind, "deposits paused");
        }
        if due_to_cap {
            self.cap_paused.insert(kind);
        }
    }

    /// Lift any pause; deleted pools stay paused
    pub fn resume_deposits(&mut self, kind: AssetKind) {
        if self.deleted.contains(&kind) {
            warn!(pool = %kind, "cannot resume deposits on a deleted pool");
            return;
        }
        self.cap_paused.remove(&kind);
        if self.paused.remove(&kind) {
            info!(pool = %kind, "deposits resumed");
        }
    }

    /// Delete a pool: deposits stop, funds drain, allocation is zeroed
    ///
    /// The zeroed allocation is not redistributed. Idempotent; returns the
    /// budget that was stranded by this call.
    pub fn delete_pool(&mut self, kind: AssetKind) -> f64 {
        if self.deleted.insert(kind) {
            self.paused.insert(kind);
            info!(pool = %kind, "pool deleted by admin action");
        }

        let stranded = self.remaining_budget(kind);
        if stranded > 0.0 {
            self.allocated_budgets.insert(kind, 0.0);
            info!(pool = %kind, stranded, "deleted pool allocation zeroed");
        }
        stranded
    }

    /// Flag (or clear) a pool as budget-depleted for the next flow calculation
    pub fn set_budget_depleted(&mut self, kind: AssetKind, depleted: bool) {
        if depleted {
            if self.budget_depleted.insert(kind) {
                warn!(pool = %kind, "pool budget depleted, yields drop to zero");
            }
        } else {
            self.budget_depleted.remove(&kind);
        }
    }

    pub fn is_budget_depleted(&self, kind: AssetKind) -> bool {
        self.budget_depleted.contains(&kind)
    }

    pub fn is_paused(&self, kind: AssetKind) -> bool {
        self.paused.contains(&kind)
    }

    pub fn is_deleted(&self, kind: AssetKind) -> bool {
        self.deleted.contains(&kind)
    }

    /// Existing, not deleted and accepting deposits
    pub fn is_pool_active(&self, kind: AssetKind) -> bool {
        self.pools.contains_key(&kind) && !self.deleted.contains(&kind) && !self.paused.contains(&kind)
    }

    /// Existing pools that are not deleted (paused pools included)
    pub fn active_pools(&self) -> Vec<AssetKind> {
        self.pools
            .keys()
            .filter(|kind| !self.deleted.contains(kind))
            .copied()
            .collect()
    }

    pub fn pool_status(&self, kind: AssetKind) -> PoolStatus {
        if self.deleted.contains(&kind) {
            PoolStatus::Deleted
        } else if !self.pools.contains_key(&kind) {
            PoolStatus::NotCreated
        } else if self.cap_paused.contains(&kind) {
            PoolStatus::CapPaused
        } else if self.paused.contains(&kind) {
            PoolStatus::Paused
        } else {
            PoolStatus::Active
        }
    }
}
