//! Reward tuning
//!
//! Tops up pool budgets on replenishment timesteps, then runs the boosted
//! distribution against the target yields in effect. The effective APY each
//! pool paid is stored for the next timestep's flow calculation.

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::asset::AssetKind;
use crate::models::event::Event;
use crate::models::state::SimulationState;
use crate::orchestrator::SimulationError;
use crate::rewards::distribute_rewards;
use tracing::debug;

pub struct RewardTuningPolicy;

impl StagePolicy for RewardTuningPolicy {
    fn name(&self) -> &'static str {
        "rewards"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let timestep = ctx.timestep;
        let mut pool_manager = state.pool_manager().clone();
        let mut agents = state.agents().clone();
        let mut metrics = state.metrics().clone();
        let mut events = Vec::new();

        if let Some(amount) = ctx.config.budget_replenishment.at(timestep) {
            for (pool, amount) in pool_manager.replenish_by_weights(*amount)? {
                debug!(timestep, pool = %pool, amount, "budget replenished");
                events.push(Event::BudgetReplenished { timestep, pool, amount });
            }
        }

        let target_yields = ctx.config.target_yields_at(timestep);
        let outcome = distribute_rewards(
            &mut agents,
            &mut pool_manager,
            &target_yields,
            metrics.prices[AssetKind::Avl],
            &ctx.config.boost,
            ctx.config.delta_time_days,
        );

        for (pool, reward) in &outcome.pool_rewards {
            events.push(Event::RewardsDistributed {
                timestep,
                pool: *pool,
                requested: reward.requested,
                granted: reward.granted,
                scaling_factor: reward.scaling_factor,
            });
        }
        for pool in &outcome.depleted {
            events.push(Event::BudgetDepleted { timestep, pool: *pool });
        }

        metrics.target_yields = target_yields;
        metrics.pool_apy = outcome.pool_apy;
        metrics.pool_rewards = outcome.pool_rewards;

        Ok(StatePatch {
            agents: Some(agents),
            pool_manager: Some(pool_manager),
            metrics: Some(metrics),
            events,
        })
    }
}
