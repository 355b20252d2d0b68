//! Price refresh
//!
//! Samples the price feed and pushes the new prices into every agent's
//! allocations. Runs on timesteps that are multiples of
//! `price_update_interval`; other timesteps keep the previous prices.

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::asset::AssetKind;
use crate::models::event::Event;
use crate::models::state::SimulationState;
use crate::orchestrator::SimulationError;

pub struct PriceUpdatePolicy;

impl StagePolicy for PriceUpdatePolicy {
    fn name(&self) -> &'static str {
        "prices"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        if ctx.timestep % ctx.config.price_update_interval != 0 {
            return Ok(StatePatch::default());
        }

        let prices = ctx.prices.prices_at(ctx.timestep);

        let mut agents = state.agents().clone();
        for agent in agents.values_mut() {
            for kind in AssetKind::ALL {
                agent.set_asset(kind, None, Some(prices[kind]))?;
            }
        }

        let mut metrics = state.metrics().clone();
        metrics.prices = prices;

        Ok(StatePatch {
            agents: Some(agents),
            metrics: Some(metrics),
            events: vec![Event::PricesUpdated {
                timestep: ctx.timestep,
                prices,
            }],
            ..StatePatch::default()
        })
    }
}
