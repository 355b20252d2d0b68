//! Tests for the inflation curve and the annual reward budget

use proptest::prelude::*;
use staking_simulator_core_rs::rewards::{calc_inflation_rate, InflationCurve, RewardBudget};

#[test]
fn test_peak_at_target() {
    let curve = InflationCurve::default();
    assert!((curve.rate(0.5) - 0.05).abs() < 1e-12);
}

#[test]
fn test_zero_staking_gives_minimum() {
    let curve = InflationCurve::default();
    assert!((curve.rate(0.0) - 0.01).abs() < 1e-12);
}

#[test]
fn test_continuous_at_target() {
    let curve = InflationCurve::default();
    let eps = 1e-9;
    let below = curve.rate(0.5 - eps);
    let above = curve.rate(0.5 + eps);
    assert!((below - above).abs() < 1e-6);
}

#[test]
fn test_right_branch_halves_per_decay() {
    let curve = InflationCurve::default();
    // Excess over the minimum halves every `decay` of staking ratio
    let one_step = curve.rate(0.55) - curve.min_inflation_rate;
    let two_steps = curve.rate(0.60) - curve.min_inflation_rate;
    assert!((one_step - 0.02).abs() < 1e-12);
    assert!((two_steps - 0.01).abs() < 1e-12);
}

#[test]
fn test_custom_curve() {
    let rate = calc_inflation_rate(0.3, 0.1, 0.6, 0.02, 0.08);
    // i_ideal = 0.08 / 0.6, left = 0.02 + 0.3 × (i_ideal − 0.02 / 0.6)
    let expected = 0.02 + 0.3 * (0.08 / 0.6 - 0.02 / 0.6);
    assert!((rate - expected).abs() < 1e-12);
}

#[test]
fn test_validate() {
    assert!(InflationCurve::default().validate().is_ok());

    let bad_decay = InflationCurve {
        decay: 0.0,
        ..InflationCurve::default()
    };
    assert!(bad_decay.validate().is_err());

    let inverted = InflationCurve {
        min_inflation_rate: 0.1,
        max_inflation_rate: 0.05,
        ..InflationCurve::default()
    };
    assert!(inverted.validate().is_err());
}

#[test]
fn test_reward_budget() {
    let budget = RewardBudget::compute(10e9, 0.03, 0.05, 0.1);

    assert!((budget.annual_rewards - 3e8).abs() < 1e-3);
    assert!((budget.annual_rewards_usd - 1.5e7).abs() < 1e-3);
    assert!((budget.fdv - 5e8).abs() < 1e-3);
    assert!((budget.fusion_rewards_usd - 1.5e6).abs() < 1e-3);
    assert_eq!(budget.inflation_rate, 0.03);
}

#[test]
fn test_reward_budget_zero_price() {
    let budget = RewardBudget::compute(10e9, 0.05, 0.0, 0.1);
    assert_eq!(budget.annual_rewards_usd, 0.0);
    assert_eq!(budget.fdv, 0.0);
    assert!(budget.annual_rewards > 0.0);
}

proptest! {
    #[test]
    fn prop_rate_within_bounds(ratio in 0.0f64..3.0) {
        let curve = InflationCurve::default();
        let rate = curve.rate(ratio);
        prop_assert!(rate >= curve.min_inflation_rate - 1e-12);
        prop_assert!(rate <= curve.max_inflation_rate + 1e-12);
    }

    #[test]
    fn prop_rises_below_target(a in 0.0f64..0.5, b in 0.0f64..0.5) {
        let curve = InflationCurve::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(curve.rate(lo) <= curve.rate(hi) + 1e-12);
    }

    #[test]
    fn prop_falls_above_target(a in 0.5f64..3.0, b in 0.5f64..3.0) {
        let curve = InflationCurve::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(curve.rate(lo) + 1e-12 >= curve.rate(hi));
    }
}
