//! Inflation and annual reward budget
//!
//! The inflation rate follows the configured curve at `staking_ratio_all`;
//! the annual reward budget is `total_supply × rate`, valued at the current
//! AVL price, of which `fusion_rewards_allocation` is earmarked for fusion.

use super::{StageContext, StagePolicy, StatePatch};
use crate::models::asset::AssetKind;
use crate::models::state::{Metrics, SimulationState};
use crate::orchestrator::{SimulationConfig, SimulationError};
use crate::rewards::RewardBudget;

pub struct InflationPolicy;

pub fn update_inflation_metrics(config: &SimulationConfig, metrics: &mut Metrics) {
    let inflation_rate = config.inflation.rate(metrics.staking_ratio_all);
    let budget = RewardBudget::compute(
        config.total_supply,
        inflation_rate,
        metrics.prices[AssetKind::Avl],
        config.fusion_rewards_allocation,
    );

    metrics.inflation_rate = budget.inflation_rate;
    metrics.total_annual_inflation_rewards = budget.annual_rewards;
    metrics.total_annual_inflation_rewards_usd = budget.annual_rewards_usd;
    metrics.total_annual_rewards_fusion_usd = budget.fusion_rewards_usd;
}

impl StagePolicy for InflationPolicy {
    fn name(&self) -> &'static str {
        "inflation"
    }

    fn run(&self, ctx: &StageContext<'_>, state: &SimulationState) -> Result<StatePatch, SimulationError> {
        let mut metrics = state.metrics().clone();
        update_inflation_metrics(ctx.config, &mut metrics);
        Ok(StatePatch {
            metrics: Some(metrics),
            ..StatePatch::default()
        })
    }
}
