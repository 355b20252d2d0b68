//! Restaking and locking
//!
//! Expired locks are released first, then every agent restakes its share of
//! this timestep's reward. Agents with a lock preference lock what they
//! restake; a lock that cannot be placed leaves the tokens unlocked.

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::event::Event;
use crate::models::state::SimulationState;
use crate::orchestrator::SimulationError;

pub struct RestakePolicy;

impl StagePolicy for RestakePolicy {
    fn name(&self) -> &'static str {
        "restake"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let timestep = ctx.timestep;
        let mut agents = state.agents().clone();
        let mut events = Vec::new();

        for (id, agent) in agents.iter_mut() {
            let freed = agent.process_unlocks(timestep);
            if freed > 0.0 {
                events.push(Event::StakeUnlocked {
                    timestep,
                    agent_id: id.clone(),
                    amount: freed,
                });
            }

            let outcome = agent.restake_accumulated(timestep);
            if outcome.restaked > 0.0 {
                events.push(Event::Restaked {
                    timestep,
                    agent_id: id.clone(),
                    amount: outcome.restaked,
                    locked: outcome.locked,
                });
            }
        }

        Ok(StatePatch {
            agents: Some(agents),
            events,
            ..StatePatch::default()
        })
    }
}
