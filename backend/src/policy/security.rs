//! Security metrics
//!
//! ```text
//! asset_tvl[a]           = Σ agent TVL in a (USD)
//! total_security         = Σ asset_tvl
//! staking_ratio_fusion[a] = asset_tvl[a] / total_security
//! total_fdv              = total_supply × avl_price
//! staking_ratio_all      = asset_tvl[AVL] / total_fdv + native_staking_ratio
//! ```

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::agent::{calculate_agent_composition, AgentRoster};
use crate::models::asset::{AssetKind, AssetMap};
use crate::models::state::{Metrics, SimulationState};
use crate::orchestrator::{SimulationConfig, SimulationError};

pub struct SecurityMetricsPolicy;

/// Recompute the security fields of `metrics` from `agents`
pub fn update_security_metrics(config: &SimulationConfig, agents: &AgentRoster, metrics: &mut Metrics) {
    let asset_tvl = AssetMap::from_fn(|kind| agents.values().map(|agent| agent.tvl_of(kind)).sum::<f64>());
    let total_security: f64 = asset_tvl.values().sum();
    let total_fdv = config.total_supply * metrics.prices[AssetKind::Avl];

    metrics.staking_ratio_fusion = asset_tvl.map(|_, tvl| {
        if total_security > 0.0 {
            tvl / total_security
        } else {
            0.0
        }
    });
    metrics.staking_ratio_all = if total_fdv > 0.0 {
        asset_tvl[AssetKind::Avl] / total_fdv + config.native_staking_ratio
    } else {
        config.native_staking_ratio
    };
    metrics.asset_tvl = asset_tvl;
    metrics.total_security = total_security;
    metrics.total_fdv = total_fdv;
    metrics.agent_composition = calculate_agent_composition(agents.values());
}

impl StagePolicy for SecurityMetricsPolicy {
    fn name(&self) -> &'static str {
        "security"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let mut metrics = state.metrics().clone();
        update_security_metrics(ctx.config, state.agents(), &mut metrics);
        Ok(StatePatch {
            metrics: Some(metrics),
            ..StatePatch::default()
        })
    }
}
