//! Per-agent yields, see [`YieldReport`]

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::state::SimulationState;
use crate::orchestrator::SimulationError;
use crate::rewards::YieldReport;

pub struct YieldPolicy;

impl StagePolicy for YieldPolicy {
    fn name(&self) -> &'static str {
        "yields"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let report = YieldReport::compute(state.agents(), ctx.config.delta_time_days);

        let mut metrics = state.metrics().clone();
        metrics.yield_pcts = report.yield_pcts;
        metrics.avg_yield = report.avg_yield;
        metrics.compounded_yield_pcts = report.compounded_yield_pcts;
        metrics.avg_compounded_yield = report.avg_compounded_yield;

        Ok(StatePatch {
            metrics: Some(metrics),
            ..StatePatch::default()
        })
    }
}
