//! Agent yields
//!
//! Yields are reported in percent. The APR of an agent is its annual reward
//! (valued at the AVL price) over its TVL; the average is TVL-weighted.
//! Compounded variants assume rewards are reinvested once per timestep.

use crate::core::time::periods_per_year;
use crate::models::agent::AgentRoster;
use crate::models::asset::AssetKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// APY of an APR compounded `periods_per_year` times
///
/// # Example
/// ```
/// use staking_simulator_core_rs::rewards::compound_apr;
///
/// assert_eq!(compound_apr(0.0, 365.0), 0.0);
/// assert!((compound_apr(0.10, 1.0) - 0.10).abs() < 1e-12);
/// assert!(compound_apr(0.10, 365.0) > 0.105);
/// ```
pub fn compound_apr(apr: f64, periods_per_year: f64) -> f64 {
    (1.0 + apr / periods_per_year).powf(periods_per_year) - 1.0
}

/// Yields of every agent for one timestep
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct YieldReport {
    pub yield_pcts: BTreeMap<String, f64>,
    pub avg_yield: f64,
    pub compounded_yield_pcts: BTreeMap<String, f64>,
    pub avg_compounded_yield: f64,
}

impl YieldReport {
    pub fn compute(agents: &AgentRoster, delta_time_days: f64) -> Self {
        let periods = periods_per_year(delta_time_days);
        let mut report = YieldReport::default();
        let mut total_rewards_usd = 0.0;
        let mut total_tvl = 0.0;

        for (id, agent) in agents {
            let rewards_usd = agent.current_annual_reward() * agent.asset(AssetKind::Avl).price();
            let tvl = agent.total_tvl();
            let apr = if tvl > 0.0 { rewards_usd / tvl } else { 0.0 };

            report.yield_pcts.insert(id.clone(), apr * 100.0);
            report
                .compounded_yield_pcts
                .insert(id.clone(), compound_apr(apr, periods) * 100.0);
            total_rewards_usd += rewards_usd;
            total_tvl += tvl;
        }

        let avg_apr = if total_tvl > 0.0 {
            total_rewards_usd / total_tvl
        } else {
            0.0
        };
        report.avg_yield = avg_apr * 100.0;
        report.avg_compounded_yield = compound_apr(avg_apr, periods) * 100.0;
        report
    }
}
