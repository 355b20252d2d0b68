//! Per-asset stake held by one agent
//!
//! An [`AssetAllocation`] carries a token balance, the asset's current price
//! and the time-locked slices of that balance. Locked slices are owned by the
//! allocation and disappear once their unlock timestep is reached.
//!
//! # Critical Invariants
//!
//! 1. `balance >= locked_balance()` at all times
//! 2. `tvl() = balance × price >= 0`

use crate::models::agent::AgentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A slice of balance locked for a fixed number of days
///
/// Immutable once created; removed by [`AssetAllocation::process_unlocks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedStake {
    pub amount: f64,
    pub lock_period_days: u32,
    pub lock_start_timestep: usize,
    pub unlock_timestep: usize,
}

impl LockedStake {
    /// Whether the lock has expired at `timestep`
    pub fn is_unlocked_at(&self, timestep: usize) -> bool {
        self.unlock_timestep <= timestep
    }
}

/// Balance, price and locks of one asset inside an agent's portfolio
///
/// # Example
/// ```
/// use staking_simulator_core_rs::models::AssetAllocation;
///
/// let mut avl = AssetAllocation::new(1_000.0, 0.1);
/// assert_eq!(avl.tvl(), 100.0);
///
/// avl.lock(400.0, 30, 5, 35).unwrap();
/// assert_eq!(avl.locked_balance(), 400.0);
/// assert_eq!(avl.unlocked_balance(), 600.0);
///
/// assert_eq!(avl.process_unlocks(34), 0.0);
/// assert_eq!(avl.process_unlocks(35), 400.0);
/// assert_eq!(avl.locked_balance(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetAllocation {
    /// Share of the owning agent's TVL, maintained by `AgentStake`
    pub(crate) percentage: f64,
    balance: f64,
    price: f64,
    locked_stakes: Vec<LockedStake>,
}

impl AssetAllocation {
    pub fn new(balance: f64, price: f64) -> Self {
        Self {
            percentage: 0.0,
            balance: balance.max(0.0),
            price: price.max(0.0),
            locked_stakes: Vec::new(),
        }
    }

    /// Share of the owning agent's total TVL (0..=1)
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Token balance, locked slices included
    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// USD value of the full balance
    pub fn tvl(&self) -> f64 {
        self.balance * self.price
    }

    pub fn locked_stakes(&self) -> &[LockedStake] {
        &self.locked_stakes
    }

    /// Sum of all active locks
    pub fn locked_balance(&self) -> f64 {
        self.locked_stakes.iter().map(|lock| lock.amount).sum()
    }

    pub fn unlocked_balance(&self) -> f64 {
        (self.balance - self.locked_balance()).max(0.0)
    }

    /// Replace the balance
    ///
    /// # Errors
    /// `NonFiniteAmount` for NaN or infinity, `NegativeAmount` for a negative
    /// balance, `BalanceBelowLocked` when the new balance would not cover the
    /// active locks. The allocation is left untouched on error.
    pub fn set_balance(&mut self, balance: f64) -> Result<(), AgentError> {
        if !balance.is_finite() {
            return Err(AgentError::NonFiniteAmount(balance));
        }
        if balance < 0.0 {
            return Err(AgentError::NegativeAmount(balance));
        }
        let locked = self.locked_balance();
        if balance + f64::EPSILON < locked {
            return Err(AgentError::BalanceBelowLocked { balance, locked });
        }
        self.balance = balance;
        Ok(())
    }

    pub fn set_price(&mut self, price: f64) -> Result<(), AgentError> {
        if !price.is_finite() {
            return Err(AgentError::NonFiniteAmount(price));
        }
        if price < 0.0 {
            return Err(AgentError::NegativeAmount(price));
        }
        self.price = price;
        Ok(())
    }

    /// Add tokens to the unlocked part of the balance
    pub fn deposit(&mut self, amount: f64) {
        self.balance += amount.max(0.0);
    }

    /// Remove up to `amount` tokens from the unlocked part
    ///
    /// Returns the amount actually removed; locked stake is never touched.
    pub fn withdraw_unlocked(&mut self, amount: f64) -> f64 {
        let removed = amount.max(0.0).min(self.unlocked_balance());
        self.balance -= removed;
        removed
    }

    /// Lock `amount` of the unlocked balance until `unlock_timestep`
    ///
    /// # Errors
    /// `InsufficientUnlockedBalance` when `amount` exceeds the unlocked
    /// balance.
    pub fn lock(
        &mut self,
        amount: f64,
        lock_period_days: u32,
        lock_start_timestep: usize,
        unlock_timestep: usize,
    ) -> Result<(), AgentError> {
        if amount < 0.0 {
            return Err(AgentError::NegativeAmount(amount));
        }
        let available = self.unlocked_balance();
        if amount > available {
            return Err(AgentError::InsufficientUnlockedBalance {
                requested: amount,
                available,
            });
        }
        self.locked_stakes.push(LockedStake {
            amount,
            lock_period_days,
            lock_start_timestep,
            unlock_timestep,
        });
        Ok(())
    }

    /// Drop every lock whose `unlock_timestep <= timestep`
    ///
    /// Returns the total amount freed. The balance itself does not change:
    /// freed tokens simply become unlocked.
    pub fn process_unlocks(&mut self, timestep: usize) -> f64 {
        let mut freed = 0.0;
        self.locked_stakes.retain(|lock| {
            if lock.is_unlocked_at(timestep) {
                freed += lock.amount;
                false
            } else {
                true
            }
        });
        freed
    }

    /// Locked amount grouped by lock period (days → amount)
    pub fn lock_distribution(&self) -> BTreeMap<u32, f64> {
        let mut distribution = BTreeMap::new();
        for lock in &self.locked_stakes {
            *distribution.entry(lock.lock_period_days).or_insert(0.0) += lock.amount;
        }
        distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_rejects_more_than_unlocked() {
        let mut allocation = AssetAllocation::new(100.0, 1.0);
        allocation.lock(80.0, 30, 0, 30).unwrap();

        let err = allocation.lock(30.0, 30, 0, 30).unwrap_err();
        assert_eq!(
            err,
            AgentError::InsufficientUnlockedBalance {
                requested: 30.0,
                available: 20.0
            }
        );
        assert_eq!(allocation.locked_balance(), 80.0);
    }

    #[test]
    fn test_set_balance_cannot_undercut_locks() {
        let mut allocation = AssetAllocation::new(100.0, 1.0);
        allocation.lock(60.0, 60, 0, 60).unwrap();

        assert!(allocation.set_balance(50.0).is_err());
        assert_eq!(allocation.balance(), 100.0);
        assert!(allocation.set_balance(60.0).is_ok());
    }

    #[test]
    fn test_withdraw_leaves_locked_stake() {
        let mut allocation = AssetAllocation::new(100.0, 2.0);
        allocation.lock(70.0, 180, 0, 180).unwrap();

        let removed = allocation.withdraw_unlocked(50.0);
        assert_eq!(removed, 30.0);
        assert_eq!(allocation.balance(), 70.0);
        assert_eq!(allocation.unlocked_balance(), 0.0);
    }

    #[test]
    fn test_lock_distribution_groups_by_period() {
        let mut allocation = AssetAllocation::new(100.0, 1.0);
        allocation.lock(10.0, 30, 0, 30).unwrap();
        allocation.lock(15.0, 30, 1, 31).unwrap();
        allocation.lock(20.0, 180, 1, 181).unwrap();

        let distribution = allocation.lock_distribution();
        assert_eq!(distribution.get(&30), Some(&25.0));
        assert_eq!(distribution.get(&180), Some(&20.0));
    }
}
