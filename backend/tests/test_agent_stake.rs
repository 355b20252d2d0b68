//! Tests for AgentStake: portfolio bookkeeping, rewards, restaking, locks
//! and the boost multiplier

use staking_simulator_core_rs::models::agent::{calculate_agent_composition, calculate_required_balances};
use staking_simulator_core_rs::models::ShareTier;
use staking_simulator_core_rs::{AgentError, AgentStake, AssetKind, AssetMap, LockMultipliers, ShareMultipliers};
use std::collections::BTreeMap;

fn unit_prices() -> AssetMap<f64> {
    AssetMap::new(1.0, 1.0, 1.0)
}

fn avl_agent(id: &str, balance: f64) -> AgentStake {
    AgentStake::new(id.to_string(), AssetMap::new(balance, 0.0, 0.0), unit_prices())
}

fn percentage_sum(agent: &AgentStake) -> f64 {
    agent.assets().values().map(|allocation| allocation.percentage()).sum()
}

// ============================================================================
// Portfolio
// ============================================================================

#[test]
fn test_new_agent_percentages() {
    let agent = AgentStake::new(
        "mixed".to_string(),
        AssetMap::new(100.0, 1.0, 0.0),
        AssetMap::new(1.0, 300.0, 100000.0),
    );

    assert_eq!(agent.total_tvl(), 400.0);
    assert_eq!(agent.asset(AssetKind::Avl).percentage(), 0.25);
    assert_eq!(agent.asset(AssetKind::Eth).percentage(), 0.75);
    assert_eq!(agent.asset(AssetKind::Btc).percentage(), 0.0);
}

#[test]
fn test_empty_agent_percentages_are_zero() {
    let agent = AgentStake::new("empty".to_string(), AssetMap::default(), unit_prices());
    assert_eq!(agent.total_tvl(), 0.0);
    assert_eq!(percentage_sum(&agent), 0.0);
    assert_eq!(agent.current_yield(), 0.0);
}

#[test]
fn test_update_asset_recomputes_percentages() {
    let mut agent = AgentStake::new("mixed".to_string(), AssetMap::new(100.0, 100.0, 0.0), unit_prices());
    assert_eq!(agent.asset(AssetKind::Avl).percentage(), 0.5);

    agent.update_asset("ETH", Some(300.0), None).unwrap();
    assert_eq!(agent.asset(AssetKind::Avl).percentage(), 0.25);
    assert_eq!(agent.asset(AssetKind::Eth).percentage(), 0.75);

    agent.update_asset("AVL", None, Some(3.0)).unwrap();
    assert_eq!(agent.asset(AssetKind::Avl).percentage(), 0.5);
}

#[test]
fn test_update_asset_unknown_symbol() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    let err = agent.update_asset("DOGE", Some(1.0), None).unwrap_err();
    assert_eq!(err, AgentError::AssetNotFound("DOGE".to_string()));
}

#[test]
fn test_update_asset_is_atomic() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    let before = agent.clone();

    // Valid balance but invalid price: neither is applied
    let err = agent.update_asset("AVL", Some(50.0), Some(-1.0)).unwrap_err();
    assert_eq!(err, AgentError::NegativeAmount(-1.0));
    assert_eq!(agent, before);
}

#[test]
fn test_update_asset_rejects_non_finite_values() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    let before = agent.clone();

    let err = agent.update_asset("AVL", None, Some(f64::NAN)).unwrap_err();
    assert!(matches!(err, AgentError::NonFiniteAmount(value) if value.is_nan()));
    let err = agent.update_asset("AVL", Some(f64::INFINITY), None).unwrap_err();
    assert_eq!(err, AgentError::NonFiniteAmount(f64::INFINITY));
    assert_eq!(agent, before);
}

#[test]
fn test_update_balances() {
    let mut agent = AgentStake::new("mixed".to_string(), AssetMap::default(), unit_prices());
    agent.update_balances(&["AVL", "BTC"], &[10.0, 30.0]).unwrap();

    assert_eq!(agent.asset(AssetKind::Avl).balance(), 10.0);
    assert_eq!(agent.asset(AssetKind::Btc).balance(), 30.0);
    assert_eq!(agent.asset(AssetKind::Btc).percentage(), 0.75);
}

#[test]
fn test_update_balances_length_mismatch() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    let err = agent.update_balances(&["AVL", "ETH"], &[1.0]).unwrap_err();
    assert_eq!(err, AgentError::BalanceLengthMismatch { expected: 2, actual: 1 });
    assert_eq!(agent.asset(AssetKind::Avl).balance(), 100.0);
}

#[test]
fn test_balance_cannot_drop_below_locked() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    agent.lock_avl_tokens(80.0, 30, 0).unwrap();

    let err = agent.set_asset(AssetKind::Avl, Some(50.0), None).unwrap_err();
    assert!(matches!(err, AgentError::BalanceBelowLocked { .. }));
    assert_eq!(agent.asset(AssetKind::Avl).balance(), 100.0);
}

#[test]
fn test_withdraw_never_touches_locked_stake() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    agent.lock_avl_tokens(60.0, 30, 0).unwrap();

    let removed = agent.withdraw_unlocked(AssetKind::Avl, 1_000.0);
    assert_eq!(removed, 40.0);
    assert_eq!(agent.asset(AssetKind::Avl).balance(), 60.0);
    assert_eq!(agent.asset(AssetKind::Avl).locked_balance(), 60.0);
}

// ============================================================================
// Maxi agents
// ============================================================================

#[test]
fn test_create_maxi_agents() {
    let agents = AgentStake::create_maxi_agents(
        &AssetMap::new(0.4, 0.4, 0.2),
        10_000.0,
        &AssetMap::new(0.05, 2500.0, 100000.0),
        &AssetMap::new(1.0, 0.5, 0.0),
        &AssetMap::new(180, 0, 0),
        1.0,
    )
    .unwrap();

    let ids: Vec<&str> = agents.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["avl_maxi", "btc_maxi", "eth_maxi"]);

    let avl = &agents["avl_maxi"];
    assert!((avl.asset(AssetKind::Avl).balance() - 80_000.0).abs() < 1e-6);
    assert_eq!(avl.asset(AssetKind::Eth).balance(), 0.0);
    assert_eq!(avl.lock_preference_days(), 180);
    assert_eq!(avl.restake_percentage(), 1.0);

    let eth = &agents["eth_maxi"];
    assert!((eth.asset(AssetKind::Eth).balance() - 1.6).abs() < 1e-9);
    assert_eq!(eth.restake_percentage(), 0.5);

    let btc = &agents["btc_maxi"];
    assert!((btc.asset(AssetKind::Btc).balance() - 0.02).abs() < 1e-12);
    assert_eq!(btc.asset(AssetKind::Btc).percentage(), 1.0);
}

#[test]
fn test_create_maxi_agents_rejects_bad_composition() {
    let err = AgentStake::create_maxi_agents(
        &AssetMap::new(0.5, 0.2, 0.0),
        1_000.0,
        &unit_prices(),
        &AssetMap::default(),
        &AssetMap::default(),
        1.0,
    )
    .unwrap_err();
    assert!(matches!(err, AgentError::InvalidComposition(_)));
}

#[test]
fn test_required_balances_skip_zero_price() {
    let balances =
        calculate_required_balances(&AssetMap::new(0.5, 0.5, 0.0), 100.0, &AssetMap::new(0.0, 2.0, 1.0)).unwrap();
    assert_eq!(balances[AssetKind::Avl], 0.0);
    assert_eq!(balances[AssetKind::Eth], 25.0);
}

#[test]
fn test_agent_composition() {
    let a = avl_agent("avl_maxi", 100.0);
    let b = AgentStake::new("eth_maxi".to_string(), AssetMap::new(0.0, 300.0, 0.0), unit_prices());

    let composition = calculate_agent_composition([&a, &b]);
    assert_eq!(composition[AssetKind::Avl], 0.25);
    assert_eq!(composition[AssetKind::Eth], 0.75);
    assert_eq!(composition[AssetKind::Btc], 0.0);
}

// ============================================================================
// Rewards and restaking
// ============================================================================

#[test]
fn test_add_reward_accrues_per_timestep_share() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    agent.add_reward(365.0);
    agent.add_reward(730.0);

    assert_eq!(agent.current_annual_reward(), 730.0);
    assert!((agent.accumulated_unclaimed_reward() - 3.0).abs() < 1e-12);
}

#[test]
fn test_add_reward_respects_delta_time() {
    let mut agent = avl_agent("avl_maxi", 100.0).with_delta_time(5.0);
    agent.add_reward(73.0);
    assert!((agent.accumulated_unclaimed_reward() - 1.0).abs() < 1e-12);
}

#[test]
fn test_restake_uses_current_annual_reward() {
    let mut agent = avl_agent("avl_maxi", 100.0).with_restake_percentage(0.5);
    agent.add_reward(365.0);

    let outcome = agent.restake_accumulated(10);
    assert!((outcome.restaked - 0.5).abs() < 1e-12);
    assert!(!outcome.locked);
    assert!((agent.asset(AssetKind::Avl).balance() - 100.5).abs() < 1e-12);
    // The accumulated ledger is bookkeeping only
    assert!((agent.accumulated_unclaimed_reward() - 1.0).abs() < 1e-12);
}

#[test]
fn test_restake_locks_with_preference() {
    let mut agent = avl_agent("avl_maxi", 100.0)
        .with_restake_percentage(1.0)
        .with_lock_preference(30);
    agent.add_reward(365.0);

    let outcome = agent.restake_accumulated(5);
    assert!(outcome.locked);

    let locks = agent.asset(AssetKind::Avl).locked_stakes();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].lock_start_timestep, 5);
    assert_eq!(locks[0].unlock_timestep, 35);
    assert_eq!(locks[0].lock_period_days, 30);
}

#[test]
fn test_restake_without_reward_is_noop() {
    let mut agent = avl_agent("avl_maxi", 100.0).with_restake_percentage(1.0);
    let outcome = agent.restake_accumulated(1);
    assert_eq!(outcome.restaked, 0.0);
    assert_eq!(agent.asset(AssetKind::Avl).balance(), 100.0);
}

#[test]
fn test_lock_and_unlock_round_trip() {
    let mut agent = avl_agent("avl_maxi", 1_000.0);
    agent.lock_avl_tokens(200.0, 60, 10).unwrap();
    agent.lock_avl_tokens(300.0, 180, 10).unwrap();

    let distribution = agent.avl_lock_distribution();
    assert_eq!(distribution, BTreeMap::from([(60, 200.0), (180, 300.0)]));

    assert_eq!(agent.process_unlocks(69), 0.0);
    assert_eq!(agent.process_unlocks(70), 200.0);
    assert_eq!(agent.asset(AssetKind::Avl).locked_balance(), 300.0);
    assert_eq!(agent.process_unlocks(190), 300.0);

    assert_eq!(agent.asset(AssetKind::Avl).locked_balance(), 0.0);
    assert_eq!(agent.asset(AssetKind::Avl).balance(), 1_000.0);
}

#[test]
fn test_lock_more_than_unlocked_fails() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    agent.lock_avl_tokens(70.0, 30, 0).unwrap();

    let err = agent.lock_avl_tokens(40.0, 30, 0).unwrap_err();
    assert!(matches!(err, AgentError::InsufficientUnlockedBalance { .. }));
    assert_eq!(agent.asset(AssetKind::Avl).locked_balance(), 70.0);
}

// ============================================================================
// Boost multiplier
// ============================================================================

#[test]
fn test_boost_share_threshold() {
    let small = avl_agent("small", 100.0);
    let large = avl_agent("large", 300.0);
    let locks = LockMultipliers::default();
    let shares = ShareMultipliers::default();

    let boost = large.calculate_boost_multiplier(400.0, &locks, &shares);
    assert!(boost >= 1.1);
    assert!((boost - 1.1).abs() < 1e-12);

    // 100/400 is also above the 1% threshold
    assert!((small.calculate_boost_multiplier(400.0, &locks, &shares) - 1.1).abs() < 1e-12);
}

#[test]
fn test_boost_highest_share_tier_wins() {
    let agent = avl_agent("whale", 600.0);
    let shares = ShareMultipliers::new(vec![
        ShareTier {
            threshold: 0.01,
            multiplier: 1.1,
        },
        ShareTier {
            threshold: 0.5,
            multiplier: 1.3,
        },
        ShareTier {
            threshold: 0.9,
            multiplier: 2.0,
        },
    ]);

    let boost = agent.calculate_boost_multiplier(1_000.0, &LockMultipliers::default(), &shares);
    assert!((boost - 1.3).abs() < 1e-12);
}

#[test]
fn test_boost_weights_lock_buckets() {
    let mut agent = avl_agent("avl_maxi", 100.0);
    agent.lock_avl_tokens(50.0, 180, 0).unwrap();

    let no_share_tiers = ShareMultipliers::new(Vec::new());
    let boost = agent.calculate_boost_multiplier(100.0, &LockMultipliers::default(), &no_share_tiers);

    // 0.5 × 1.0 + 0.5 × 1.5
    assert!((boost - 1.25).abs() < 1e-12);
}

#[test]
fn test_boost_without_avl_is_one() {
    let agent = AgentStake::new("eth_maxi".to_string(), AssetMap::new(0.0, 10.0, 0.0), unit_prices());
    let boost = agent.calculate_boost_multiplier(
        1_000.0,
        &LockMultipliers::default(),
        &ShareMultipliers::default(),
    );
    assert_eq!(boost, 1.0);
}

#[test]
fn test_lock_multiplier_floor_lookup() {
    let locks = LockMultipliers::default();
    assert_eq!(locks.multiplier_for(0), 1.0);
    assert_eq!(locks.multiplier_for(45), 1.05);
    assert_eq!(locks.multiplier_for(365), 1.5);
}
