//! Protocol inflation curve
//!
//! Inflation rises linearly with the staking ratio up to the target ratio and
//! decays exponentially above it:
//!
//! ```text
//! i_ideal = max / target
//! I_left  = min + ratio × (i_ideal − min / target)
//! I_right = min + (i_ideal × target − min) × 2^((target − ratio) / decay)
//! rate    = min(I_left, I_right)
//! ```
//!
//! Both branches equal `max` at `ratio == target`.

use serde::{Deserialize, Serialize};

/// Inflation rate for a staking ratio
///
/// # Example
/// ```
/// use staking_simulator_core_rs::rewards::calc_inflation_rate;
///
/// let at_target = calc_inflation_rate(0.5, 0.05, 0.5, 0.01, 0.05);
/// assert!((at_target - 0.05).abs() < 1e-12);
///
/// let above = calc_inflation_rate(0.6, 0.05, 0.5, 0.01, 0.05);
/// assert!(above < at_target);
/// ```
pub fn calc_inflation_rate(
    staking_ratio: f64,
    decay: f64,
    target_staking_rate: f64,
    min_inflation_rate: f64,
    max_inflation_rate: f64,
) -> f64 {
    let i_ideal = max_inflation_rate / target_staking_rate;
    let left = min_inflation_rate + staking_ratio * (i_ideal - min_inflation_rate / target_staking_rate);
    let right = min_inflation_rate
        + (i_ideal * target_staking_rate - min_inflation_rate)
            * 2f64.powf((target_staking_rate - staking_ratio) / decay);
    left.min(right)
}

/// Constants of the inflation curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflationCurve {
    pub decay: f64,
    pub target_staking_rate: f64,
    pub min_inflation_rate: f64,
    pub max_inflation_rate: f64,
}

impl Default for InflationCurve {
    fn default() -> Self {
        Self {
            decay: 0.05,
            target_staking_rate: 0.5,
            min_inflation_rate: 0.01,
            max_inflation_rate: 0.05,
        }
    }
}

impl InflationCurve {
    pub fn rate(&self, staking_ratio: f64) -> f64 {
        calc_inflation_rate(
            staking_ratio,
            self.decay,
            self.target_staking_rate,
            self.min_inflation_rate,
            self.max_inflation_rate,
        )
    }

    /// Check the constants describe a usable curve
    pub fn validate(&self) -> Result<(), String> {
        if self.decay <= 0.0 {
            return Err("inflation decay must be positive".to_string());
        }
        if self.target_staking_rate <= 0.0 {
            return Err("target staking rate must be positive".to_string());
        }
        if self.min_inflation_rate < 0.0 || self.max_inflation_rate < self.min_inflation_rate {
            return Err("inflation bounds must satisfy 0 <= min <= max".to_string());
        }
        Ok(())
    }
}

/// Annual reward budget implied by an inflation rate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardBudget {
    pub inflation_rate: f64,
    /// `total_supply × inflation_rate` (AVL)
    pub annual_rewards: f64,
    pub annual_rewards_usd: f64,
    /// Fully diluted valuation, `total_supply × price`
    pub fdv: f64,
    /// Part of the USD rewards earmarked for fusion pools
    pub fusion_rewards_usd: f64,
}

impl RewardBudget {
    pub fn compute(total_supply: f64, inflation_rate: f64, avl_price: f64, fusion_allocation: f64) -> Self {
        let annual_rewards = total_supply * inflation_rate;
        let annual_rewards_usd = annual_rewards * avl_price;
        Self {
            inflation_rate,
            annual_rewards,
            annual_rewards_usd,
            fdv: total_supply * avl_price,
            fusion_rewards_usd: annual_rewards_usd * fusion_allocation,
        }
    }
}
