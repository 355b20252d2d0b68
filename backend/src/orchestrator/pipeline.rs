//! Step pipeline
//!
//! Runs the stage policies of one timestep in their declared order. Each
//! stage sees the snapshot left by the previous one. The step is atomic: the
//! pipeline works on a private copy, so a failing stage leaves the caller's
//! state untouched.

use super::engine::SimulationError;
use crate::models::event::Event;
use crate::models::state::SimulationState;
use crate::policy::{
    AdminActionPolicy, BtcActivationPolicy, FlowPolicy, InflationPolicy, PriceUpdatePolicy, RestakePolicy,
    RewardTuningPolicy, SecurityMetricsPolicy, StageContext, StagePolicy, YieldPolicy,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Ordered list of stages
///
/// Cloning shares the (stateless) stages.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn StagePolicy>>,
}

impl Pipeline {
    /// The standard nine-stage order
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(PriceUpdatePolicy),
            Arc::new(FlowPolicy),
            Arc::new(SecurityMetricsPolicy),
            Arc::new(InflationPolicy),
            Arc::new(BtcActivationPolicy),
            Arc::new(RewardTuningPolicy),
            Arc::new(YieldPolicy),
            Arc::new(RestakePolicy),
            Arc::new(AdminActionPolicy),
        ])
    }

    pub fn new(stages: Vec<Arc<dyn StagePolicy>>) -> Self {
        Self { stages }
    }

    /// Append a stage after the existing ones
    pub fn with_stage(mut self, stage: Arc<dyn StagePolicy>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage for `ctx.timestep`, producing the next snapshot
    pub fn execute(
        &self,
        ctx: &StageContext<'_>,
        state: &SimulationState,
    ) -> Result<(SimulationState, Vec<Event>), SimulationError> {
        let mut next = state.clone();
        next.timestep = ctx.timestep;
        let mut events = Vec::new();

        for stage in &self.stages {
            let patch = stage.run(ctx, &next).map_err(|source| SimulationError::StageFailed {
                stage: stage.name(),
                source: Box::new(source),
            })?;
            let stage_events = patch.apply(&mut next);
            debug!(
                timestep = ctx.timestep,
                stage = stage.name(),
                events = stage_events.len(),
                "stage complete"
            );
            events.extend(stage_events);
        }

        Ok((next, events))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
