//! Reward distribution
//!
//! Each timestep every existing pool asks the [`PoolManager`] for the
//! per-timestep share of its annual reward requirement:
//!
//! ```text
//! agent_required = agent_tvl × target_yield × boost / avl_price   (AVL/year)
//! pool_required  = Σ agent_required
//! requested      = pool_required / (365/Δt)
//! granted        = get_pool_rewards(pool, requested)
//! scaling        = granted / requested
//! ```
//!
//! Every agent is credited `agent_required × scaling` as its annual reward
//! for that pool. A pool granted 1% or less of its request is flagged as
//! budget-depleted for the next flow calculation; a healthier grant clears
//! the flag.

use crate::core::time::{annual_to_period, periods_per_year};
use crate::models::agent::{AgentRoster, LockMultipliers, ShareMultipliers};
use crate::models::asset::{AssetKind, AssetMap};
use crate::models::pool::PoolManager;
use crate::models::state::PoolRewardOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pools whose scaling factor falls to this level are flagged depleted
pub const DEPLETION_SCALING_THRESHOLD: f64 = 0.01;

/// Boost applied to AVL pool rewards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostConfig {
    pub enabled: bool,
    #[serde(default)]
    pub lock_multipliers: LockMultipliers,
    #[serde(default)]
    pub share_multipliers: ShareMultipliers,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lock_multipliers: LockMultipliers::default(),
            share_multipliers: ShareMultipliers::default(),
        }
    }
}

/// Result of one distribution round
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DistributionOutcome {
    pub pool_rewards: BTreeMap<AssetKind, PoolRewardOutcome>,
    /// Effective APY paid by each pool (`granted × periods/year × price / tvl`)
    pub pool_apy: AssetMap<f64>,
    /// Annual reward (AVL) credited to each agent across all pools
    pub agent_annual_rewards: BTreeMap<String, f64>,
    /// Pools flagged depleted in this round
    pub depleted: Vec<AssetKind>,
}

/// Request, scale and credit rewards for every existing pool
///
/// Mutates the budget through [`PoolManager::get_pool_rewards`] and each
/// agent through `add_reward`. Deleted pools request nothing and are never
/// flagged.
pub fn distribute_rewards(
    agents: &mut AgentRoster,
    pool_manager: &mut PoolManager,
    target_yields: &AssetMap<f64>,
    avl_price: f64,
    boost: &BoostConfig,
    delta_time_days: f64,
) -> DistributionOutcome {
    let mut outcome = DistributionOutcome::default();
    let mut credited: BTreeMap<String, f64> = agents.keys().map(|id| (id.clone(), 0.0)).collect();

    let total_avl_balance: f64 = agents
        .values()
        .map(|agent| agent.asset(AssetKind::Avl).balance())
        .sum();

    let pools: Vec<AssetKind> = pool_manager.pools().keys().copied().collect();
    for kind in pools {
        let pool_tvl: f64 = agents.values().map(|agent| agent.tvl_of(kind)).sum();

        if pool_manager.is_deleted(kind) {
            outcome.pool_rewards.insert(
                kind,
                PoolRewardOutcome {
                    requested: 0.0,
                    granted: 0.0,
                    scaling_factor: 0.0,
                },
            );
            continue;
        }

        let shares: Vec<(String, f64)> = agents
            .values()
            .filter(|agent| agent.tvl_of(kind) > 0.0)
            .map(|agent| {
                let multiplier = if kind == AssetKind::Avl && boost.enabled {
                    agent.calculate_boost_multiplier(
                        total_avl_balance,
                        &boost.lock_multipliers,
                        &boost.share_multipliers,
                    )
                } else {
                    1.0
                };
                let required_usd = agent.tvl_of(kind) * target_yields[kind] * multiplier;
                let required = if avl_price > 0.0 { required_usd / avl_price } else { 0.0 };
                (agent.id().to_string(), required)
            })
            .collect();

        let required_annual: f64 = shares.iter().map(|(_, required)| required).sum();
        let requested = annual_to_period(required_annual, delta_time_days);
        let granted = pool_manager.get_pool_rewards(kind, requested);
        let scaling_factor = if requested > 0.0 { granted / requested } else { 1.0 };

        if requested > 0.0 && scaling_factor <= DEPLETION_SCALING_THRESHOLD {
            if !pool_manager.is_budget_depleted(kind) {
                outcome.depleted.push(kind);
            }
            pool_manager.set_budget_depleted(kind, true);
        } else {
            pool_manager.set_budget_depleted(kind, false);
        }

        for (id, required) in shares {
            *credited.entry(id).or_insert(0.0) += required * scaling_factor;
        }

        outcome.pool_apy[kind] = if pool_tvl > 0.0 {
            granted * periods_per_year(delta_time_days) * avl_price / pool_tvl
        } else {
            0.0
        };
        outcome.pool_rewards.insert(
            kind,
            PoolRewardOutcome {
                requested,
                granted,
                scaling_factor,
            },
        );
    }

    for (id, annual) in &credited {
        if let Some(agent) = agents.get_mut(id) {
            agent.add_reward(*annual);
        }
    }
    outcome.agent_annual_rewards = credited;
    outcome
}
