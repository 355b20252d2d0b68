//! Agent (staker) model
//!
//! Represents a staker participating in the fusion pools. Each agent has:
//! - One [`AssetAllocation`] per supported asset (balance, price, locks)
//! - A restake percentage and an AVL lock preference
//! - Its current annualized reward (in AVL) and an accrual ledger
//!
//! One agent exists per asset ("avl_maxi", "eth_maxi", "btc_maxi"). Agents are
//! created once at initialization and mutated every timestep.
//!
//! # Reward ledger vs. restake source
//!
//! `accumulated_unclaimed_reward` is bookkeeping only. Restaking draws the
//! per-timestep equivalent of `current_annual_reward`, not the ledger, so the
//! ledger keeps growing even when everything is restaked.
//!
//! # Critical Invariants
//!
//! 1. Allocation percentages sum to 1.0 when total TVL > 0, all zero otherwise
//! 2. Percentages are recomputed on every balance or price change

use crate::core::time::{annual_to_period, days_to_timesteps};
use crate::models::allocation::AssetAllocation;
use crate::models::asset::{AssetKind, AssetMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Agents keyed by id, iterated in a stable order
pub type AgentRoster = BTreeMap<String, AgentStake>;

/// Tolerance on compositions and budget splits that must sum to 1.0
pub const SUM_TOLERANCE: f64 = 0.01;

/// Errors that can occur during agent operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Amount must be non-negative, got {0}")]
    NegativeAmount(f64),

    #[error("Amount must be finite, got {0}")]
    NonFiniteAmount(f64),

    #[error("Balance {balance} would fall below locked stake {locked}")]
    BalanceBelowLocked { balance: f64, locked: f64 },

    #[error("Insufficient unlocked balance: requested {requested}, available {available}")]
    InsufficientUnlockedBalance { requested: f64, available: f64 },

    #[error("Expected {expected} balances, got {actual}")]
    BalanceLengthMismatch { expected: usize, actual: usize },

    #[error("Composition must sum to 1.0 (got {0})")]
    InvalidComposition(f64),
}

/// Lock period (days) → reward multiplier
///
/// Lookup picks the entry with the largest period not above the requested
/// one; periods below every key get 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockMultipliers(BTreeMap<u32, f64>);

impl LockMultipliers {
    pub fn new(table: BTreeMap<u32, f64>) -> Self {
        Self(table)
    }

    pub fn multiplier_for(&self, lock_period_days: u32) -> f64 {
        self.0
            .range(..=lock_period_days)
            .next_back()
            .map(|(_, multiplier)| *multiplier)
            .unwrap_or(1.0)
    }

    pub fn entries(&self) -> &BTreeMap<u32, f64> {
        &self.0
    }
}

impl Default for LockMultipliers {
    fn default() -> Self {
        Self(BTreeMap::from([(0, 1.0), (30, 1.05), (60, 1.1), (180, 1.5)]))
    }
}

/// Pool-share threshold (fraction of total AVL stake) and its multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareTier {
    pub threshold: f64,
    pub multiplier: f64,
}

/// Share-of-pool tiers
///
/// The tier with the highest threshold at or below the agent's share wins;
/// no qualifying tier means 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareMultipliers(Vec<ShareTier>);

impl ShareMultipliers {
    pub fn new(tiers: Vec<ShareTier>) -> Self {
        Self(tiers)
    }

    pub fn multiplier_for(&self, share: f64) -> f64 {
        self.0
            .iter()
            .filter(|tier| tier.threshold <= share)
            .fold(None::<ShareTier>, |best, tier| match best {
                Some(current) if current.threshold > tier.threshold => Some(current),
                _ => Some(*tier),
            })
            .map(|tier| tier.multiplier)
            .unwrap_or(1.0)
    }

    pub fn tiers(&self) -> &[ShareTier] {
        &self.0
    }
}

impl Default for ShareMultipliers {
    fn default() -> Self {
        Self(vec![ShareTier {
            threshold: 0.01,
            multiplier: 1.1,
        }])
    }
}

/// What a single restake did
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RestakeOutcome {
    /// AVL added to the balance
    pub restaked: f64,
    /// Whether the restaked amount was locked
    pub locked: bool,
}

/// A staker's multi-asset position
///
/// # Example
/// ```
/// use staking_simulator_core_rs::{AgentStake, AssetKind, AssetMap};
///
/// let mut agent = AgentStake::new(
///     "avl_maxi".to_string(),
///     AssetMap::new(1_000.0, 0.0, 0.0),
///     AssetMap::new(0.1, 3000.0, 30000.0),
/// );
/// assert_eq!(agent.total_tvl(), 100.0);
/// assert_eq!(agent.asset(AssetKind::Avl).percentage(), 1.0);
///
/// agent.update_asset("ETH", Some(0.1), None).unwrap();
/// assert_eq!(agent.total_tvl(), 400.0);
/// assert_eq!(agent.asset(AssetKind::Eth).percentage(), 0.75);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStake {
    id: String,
    assets: AssetMap<AssetAllocation>,
    /// Fraction of each timestep's reward restaked into AVL (0..=1)
    restake_percentage: f64,
    /// Lock period applied to restaked AVL (0 = no lock)
    lock_preference_days: u32,
    /// Annualized reward in AVL as of the last distribution
    current_annual_reward: f64,
    /// Ledger of accrued per-timestep rewards in AVL
    accumulated_unclaimed_reward: f64,
    /// Timestep length in days
    delta_time_days: f64,
}

impl AgentStake {
    /// Create an agent holding `balances` valued at `prices`
    ///
    /// Defaults: no restaking, no lock preference, one-day timesteps.
    pub fn new(id: String, balances: AssetMap<f64>, prices: AssetMap<f64>) -> Self {
        let assets = AssetMap::from_fn(|kind| AssetAllocation::new(balances[kind], prices[kind]));
        let mut agent = Self {
            id,
            assets,
            restake_percentage: 0.0,
            lock_preference_days: 0,
            current_annual_reward: 0.0,
            accumulated_unclaimed_reward: 0.0,
            delta_time_days: 1.0,
        };
        agent.recompute_percentages();
        agent
    }

    /// Set the restake percentage
    ///
    /// # Panics
    /// Panics if `restake_percentage` is outside `[0, 1]`.
    pub fn with_restake_percentage(mut self, restake_percentage: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&restake_percentage),
            "restake_percentage must be within [0, 1]"
        );
        self.restake_percentage = restake_percentage;
        self
    }

    pub fn with_lock_preference(mut self, lock_preference_days: u32) -> Self {
        self.lock_preference_days = lock_preference_days;
        self
    }

    /// # Panics
    /// Panics if `delta_time_days` is not strictly positive.
    pub fn with_delta_time(mut self, delta_time_days: f64) -> Self {
        assert!(delta_time_days > 0.0, "delta_time_days must be positive");
        self.delta_time_days = delta_time_days;
        self
    }

    /// Create the three maxi agents from a USD composition
    ///
    /// Each maxi agent holds `total_tvl × composition[asset] / price[asset]`
    /// tokens of its own asset and nothing else.
    ///
    /// # Errors
    /// `InvalidComposition` if the composition does not sum to 1 ± 0.01.
    ///
    /// # Example
    /// ```
    /// use staking_simulator_core_rs::{AgentStake, AssetKind, AssetMap};
    ///
    /// let agents = AgentStake::create_maxi_agents(
    ///     &AssetMap::new(0.5, 0.5, 0.0),
    ///     1_000.0,
    ///     &AssetMap::new(0.1, 2500.0, 100000.0),
    ///     &AssetMap::new(1.0, 1.0, 1.0),
    ///     &AssetMap::new(180, 0, 0),
    ///     1.0,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(agents.len(), 3);
    /// assert_eq!(agents["avl_maxi"].asset(AssetKind::Avl).balance(), 5_000.0);
    /// assert_eq!(agents["eth_maxi"].asset(AssetKind::Eth).balance(), 0.2);
    /// ```
    pub fn create_maxi_agents(
        composition: &AssetMap<f64>,
        total_tvl: f64,
        prices: &AssetMap<f64>,
        restake_percentages: &AssetMap<f64>,
        lock_preferences: &AssetMap<u32>,
        delta_time_days: f64,
    ) -> Result<AgentRoster, AgentError> {
        let balances = calculate_required_balances(composition, total_tvl, prices)?;

        Ok(AssetKind::ALL
            .into_iter()
            .map(|kind| {
                let holdings = AssetMap::from_fn(|asset| if asset == kind { balances[kind] } else { 0.0 });
                let agent = AgentStake::new(kind.maxi_agent_id().to_string(), holdings, *prices)
                    .with_restake_percentage(restake_percentages[kind].clamp(0.0, 1.0))
                    .with_lock_preference(lock_preferences[kind])
                    .with_delta_time(delta_time_days);
                (agent.id.clone(), agent)
            })
            .collect())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn assets(&self) -> &AssetMap<AssetAllocation> {
        &self.assets
    }

    pub fn asset(&self, kind: AssetKind) -> &AssetAllocation {
        &self.assets[kind]
    }

    pub fn restake_percentage(&self) -> f64 {
        self.restake_percentage
    }

    pub fn lock_preference_days(&self) -> u32 {
        self.lock_preference_days
    }

    pub fn current_annual_reward(&self) -> f64 {
        self.current_annual_reward
    }

    pub fn accumulated_unclaimed_reward(&self) -> f64 {
        self.accumulated_unclaimed_reward
    }

    pub fn delta_time_days(&self) -> f64 {
        self.delta_time_days
    }

    /// USD value across all assets
    pub fn total_tvl(&self) -> f64 {
        self.assets.values().map(AssetAllocation::tvl).sum()
    }

    /// USD value of one asset
    pub fn tvl_of(&self, kind: AssetKind) -> f64 {
        self.assets[kind].tvl()
    }

    /// Annual reward in USD over total TVL (0 when TVL is 0)
    pub fn current_yield(&self) -> f64 {
        let tvl = self.total_tvl();
        if tvl > 0.0 {
            self.current_annual_reward * self.assets[AssetKind::Avl].price() / tvl
        } else {
            0.0
        }
    }

    /// Update one asset by ticker symbol
    ///
    /// # Errors
    /// `AssetNotFound` for an unknown symbol, plus any error from
    /// [`AgentStake::set_asset`].
    pub fn update_asset(
        &mut self,
        symbol: &str,
        balance: Option<f64>,
        price: Option<f64>,
    ) -> Result<(), AgentError> {
        let kind =
            AssetKind::from_symbol(symbol).ok_or_else(|| AgentError::AssetNotFound(symbol.to_string()))?;
        self.set_asset(kind, balance, price)
    }

    /// Update balance and/or price of one asset, then recompute percentages
    ///
    /// Both values are validated before either is applied.
    pub fn set_asset(
        &mut self,
        kind: AssetKind,
        balance: Option<f64>,
        price: Option<f64>,
    ) -> Result<(), AgentError> {
        let mut updated = self.assets[kind].clone();
        if let Some(balance) = balance {
            updated.set_balance(balance)?;
        }
        if let Some(price) = price {
            updated.set_price(price)?;
        }
        self.assets[kind] = updated;
        self.recompute_percentages();
        Ok(())
    }

    /// Replace several balances at once, keyed by parallel symbol/balance slices
    ///
    /// Nothing is applied unless every entry is valid.
    pub fn update_balances(&mut self, symbols: &[&str], balances: &[f64]) -> Result<(), AgentError> {
        if symbols.len() != balances.len() {
            return Err(AgentError::BalanceLengthMismatch {
                expected: symbols.len(),
                actual: balances.len(),
            });
        }

        let mut assets = self.assets.clone();
        for (symbol, balance) in symbols.iter().zip(balances) {
            let kind = AssetKind::from_symbol(symbol)
                .ok_or_else(|| AgentError::AssetNotFound(symbol.to_string()))?;
            assets[kind].set_balance(*balance)?;
        }
        self.assets = assets;
        self.recompute_percentages();
        Ok(())
    }

    /// Add tokens of `kind` to the unlocked balance
    pub fn deposit(&mut self, kind: AssetKind, amount: f64) {
        self.assets[kind].deposit(amount);
        self.recompute_percentages();
    }

    /// Remove up to `amount` unlocked tokens of `kind`; returns what was removed
    pub fn withdraw_unlocked(&mut self, kind: AssetKind, amount: f64) -> f64 {
        let removed = self.assets[kind].withdraw_unlocked(amount);
        self.recompute_percentages();
        removed
    }

    fn recompute_percentages(&mut self) {
        let total = self.total_tvl();
        for kind in AssetKind::ALL {
            let allocation = &mut self.assets[kind];
            allocation.percentage = if total > 0.0 {
                allocation.tvl() / total
            } else {
                0.0
            };
        }
    }

    /// Record a new annual reward (AVL) and accrue its per-timestep share
    pub fn add_reward(&mut self, annual_amount: f64) {
        self.current_annual_reward = annual_amount;
        self.accumulated_unclaimed_reward += annual_to_period(annual_amount, self.delta_time_days);
    }

    /// Restake this timestep's share of the current annual reward into AVL
    ///
    /// The restaked amount is `current_annual_reward / (365/Δt) ×
    /// restake_percentage`. With a positive lock preference it is locked
    /// from `timestep`; a failed lock leaves it unlocked.
    pub fn restake_accumulated(&mut self, timestep: usize) -> RestakeOutcome {
        let per_period = annual_to_period(self.current_annual_reward, self.delta_time_days);
        let amount = per_period * self.restake_percentage;
        if amount <= 0.0 {
            return RestakeOutcome::default();
        }

        self.deposit(AssetKind::Avl, amount);

        let mut locked = false;
        if self.lock_preference_days > 0 {
            match self.lock_avl_tokens(amount, self.lock_preference_days, timestep) {
                Ok(()) => locked = true,
                Err(err) => {
                    debug!(agent = %self.id, %err, "restaked amount left unlocked");
                }
            }
        }

        RestakeOutcome {
            restaked: amount,
            locked,
        }
    }

    /// Lock `amount` AVL for `lock_period_days` starting at `timestep`
    pub fn lock_avl_tokens(
        &mut self,
        amount: f64,
        lock_period_days: u32,
        timestep: usize,
    ) -> Result<(), AgentError> {
        let unlock_timestep = timestep + days_to_timesteps(lock_period_days, self.delta_time_days);
        self.assets[AssetKind::Avl].lock(amount, lock_period_days, timestep, unlock_timestep)
    }

    /// Release every lock due at `timestep`; returns the total freed
    ///
    /// Locks are only ever created on AVL, so the total is in AVL.
    pub fn process_unlocks(&mut self, timestep: usize) -> f64 {
        AssetKind::ALL
            .into_iter()
            .map(|kind| self.assets[kind].process_unlocks(timestep))
            .sum()
    }

    /// Locked AVL grouped by lock period
    pub fn avl_lock_distribution(&self) -> BTreeMap<u32, f64> {
        self.assets[AssetKind::Avl].lock_distribution()
    }

    /// Reward multiplier from AVL locks and share of the AVL pool
    ///
    /// The lock factor is the balance-weighted average of the lock
    /// multipliers (unlocked tokens count at the 0-day multiplier). It is
    /// multiplied by the share tier reached by `balance / total_pool_balance`.
    /// Agents without AVL get 1.0.
    ///
    /// # Example
    /// ```
    /// use staking_simulator_core_rs::{AgentStake, AssetMap, LockMultipliers, ShareMultipliers};
    ///
    /// let agent = AgentStake::new(
    ///     "avl_maxi".to_string(),
    ///     AssetMap::new(300.0, 0.0, 0.0),
    ///     AssetMap::new(1.0, 1.0, 1.0),
    /// );
    /// let boost = agent.calculate_boost_multiplier(
    ///     400.0,
    ///     &LockMultipliers::default(),
    ///     &ShareMultipliers::default(),
    /// );
    /// assert!(boost >= 1.1);
    /// ```
    pub fn calculate_boost_multiplier(
        &self,
        total_pool_balance: f64,
        lock_multipliers: &LockMultipliers,
        share_multipliers: &ShareMultipliers,
    ) -> f64 {
        let avl = &self.assets[AssetKind::Avl];
        let balance = avl.balance();
        if balance <= 0.0 {
            return 1.0;
        }

        let mut lock_factor = avl.unlocked_balance() / balance * lock_multipliers.multiplier_for(0);
        for (days, amount) in avl.lock_distribution() {
            lock_factor += amount / balance * lock_multipliers.multiplier_for(days);
        }

        let share = if total_pool_balance > 0.0 {
            balance / total_pool_balance
        } else {
            0.0
        };

        lock_factor * share_multipliers.multiplier_for(share)
    }
}

/// Token balances needed to hit a USD composition
///
/// # Errors
/// `InvalidComposition` if the composition does not sum to 1 ± 0.01.
pub fn calculate_required_balances(
    composition: &AssetMap<f64>,
    total_tvl: f64,
    prices: &AssetMap<f64>,
) -> Result<AssetMap<f64>, AgentError> {
    let sum: f64 = composition.values().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(AgentError::InvalidComposition(sum));
    }

    Ok(AssetMap::from_fn(|kind| {
        let price = prices[kind];
        if price > 0.0 {
            total_tvl * composition[kind] / price
        } else {
            0.0
        }
    }))
}

/// Share of aggregate TVL held in each asset (all zero when TVL is 0)
pub fn calculate_agent_composition<'a>(agents: impl IntoIterator<Item = &'a AgentStake>) -> AssetMap<f64> {
    let mut asset_tvl = AssetMap::<f64>::default();
    for agent in agents {
        for kind in AssetKind::ALL {
            asset_tvl[kind] += agent.tvl_of(kind);
        }
    }

    let total: f64 = asset_tvl.values().sum();
    if total <= 0.0 {
        return AssetMap::default();
    }
    asset_tvl.map(|_, tvl| tvl / total)
}
