//! Pool lifecycle transitions
//!
//! - [`BtcActivationPolicy`]: on the activation timestep the BTC pool is
//!   created, the budget split is re-applied with BTC included and BTC
//!   deposits are opened.
//! - [`AdminActionPolicy`]: scheduled pause / resume / delete actions.
//!   Deletion is terminal.

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::asset::{AssetKind, AssetMap};
use crate::models::event::Event;
use crate::models::pool::PoolStatus;
use crate::models::state::SimulationState;
use crate::orchestrator::SimulationError;
use tracing::info;

pub struct BtcActivationPolicy;

impl StagePolicy for BtcActivationPolicy {
    fn name(&self) -> &'static str {
        "btc_activation"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let activation = &ctx.config.btc_activation;
        if !activation.enabled
            || ctx.timestep != activation.timestep
            || state.pool_manager().pool_status(AssetKind::Btc) != PoolStatus::NotCreated
        {
            return Ok(StatePatch::default());
        }

        let mut pool_manager = state.pool_manager().clone();
        pool_manager.add_pool(AssetKind::Btc, activation.pool);
        pool_manager.allocate_budget(&activation.allocation)?;
        pool_manager.resume_deposits(AssetKind::Btc);

        info!(timestep = ctx.timestep, "BTC pool activated");

        let allocation = AssetMap::from_fn(|kind| activation.allocation.get(&kind).copied().unwrap_or(0.0));
        Ok(StatePatch {
            pool_manager: Some(pool_manager),
            events: vec![Event::BtcPoolActivated {
                timestep: ctx.timestep,
                allocation,
            }],
            ..StatePatch::default()
        })
    }
}

pub struct AdminActionPolicy;

impl StagePolicy for AdminActionPolicy {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let admin = &ctx.config.admin;
        let timestep = ctx.timestep;

        let pauses = admin.pause_deposits.at(timestep);
        let resumes = admin.resume_deposits.at(timestep);
        let deletes = admin.delete_pools.at(timestep);
        if pauses.is_none() && resumes.is_none() && deletes.is_none() {
            return Ok(StatePatch::default());
        }

        let mut pool_manager = state.pool_manager().clone();
        let mut events = Vec::new();

        for pool in pauses.into_iter().flatten() {
            pool_manager.pause_deposits(*pool, false);
            events.push(Event::PoolPaused { timestep, pool: *pool });
        }

        for pool in resumes.into_iter().flatten() {
            if pool_manager.is_deleted(*pool) {
                continue;
            }
            pool_manager.resume_deposits(*pool);
            events.push(Event::PoolResumed { timestep, pool: *pool });
        }

        for pool in deletes.into_iter().flatten() {
            let stranded_budget = pool_manager.delete_pool(*pool);
            events.push(Event::PoolDeleted {
                timestep,
                pool: *pool,
                stranded_budget,
            });
        }

        Ok(StatePatch {
            pool_manager: Some(pool_manager),
            events,
            ..StatePatch::default()
        })
    }
}
