//! Tests for pool lifecycle transitions driven through the timestep loop:
//! cold start, caps, BTC activation and scheduled admin actions

use staking_simulator_core_rs::models::PoolStatus;
use staking_simulator_core_rs::orchestrator::{EventSchedule, Orchestrator, SimulationConfig};
use staking_simulator_core_rs::prices::PriceFeed;
use staking_simulator_core_rs::{AssetKind, Event, PoolConfig};
use std::collections::BTreeMap;

fn run(config: SimulationConfig, timesteps: usize) -> Orchestrator {
    let prices = PriceFeed::constant(config.initial_prices);
    let mut orchestrator = Orchestrator::new(config, prices, 7).unwrap();
    orchestrator.run(timesteps).unwrap();
    orchestrator
}

fn flows_at(orchestrator: &Orchestrator, pool: AssetKind, timestep: usize) -> (f64, f64) {
    orchestrator
        .event_log()
        .events()
        .iter()
        .find_map(|event| match event {
            Event::FlowsApplied {
                timestep: t,
                pool: p,
                apy,
                deposit_usd,
                ..
            } if *t == timestep && *p == pool => Some((*apy, *deposit_usd)),
            _ => None,
        })
        .unwrap()
}

fn count(orchestrator: &Orchestrator, event_type: &str) -> usize {
    orchestrator.event_log().events_of_type(event_type).len()
}

// ============================================================================
// Cold start
// ============================================================================

#[test]
fn test_cold_start_boosts_flow_apy() {
    let mut config = SimulationConfig::default();
    config.cold_start.duration_timesteps = 10;
    config.cold_start.boost_factor = 2.0;

    let orchestrator = run(config, 1);
    let (apy, _) = flows_at(&orchestrator, AssetKind::Avl, 1);
    assert!((apy - 0.30).abs() < 1e-12);
}

#[test]
fn test_cold_start_end_swaps_pool_config() {
    let mut config = SimulationConfig::default();
    config.cold_start.duration_timesteps = 2;
    config.cold_start.post_cold_start_pools = BTreeMap::from([(
        AssetKind::Avl,
        PoolConfig {
            base_deposit: 0.0,
            max_extra_deposit: 0.0,
            ..PoolConfig::avl_default()
        },
    )]);

    let orchestrator = run(config, 3);

    let ended = orchestrator.event_log().events_of_type("ColdStartEnded");
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].timestep(), 2);

    assert!(flows_at(&orchestrator, AssetKind::Avl, 1).1 > 0.0);
    assert_eq!(flows_at(&orchestrator, AssetKind::Avl, 2).1, 0.0);
    assert_eq!(flows_at(&orchestrator, AssetKind::Avl, 3).1, 0.0);
    assert!(flows_at(&orchestrator, AssetKind::Eth, 3).1 > 0.0);
}

#[test]
fn test_no_cold_start_opens_on_post_cold_start_pools() {
    let mut config = SimulationConfig::default();
    config.cold_start.duration_timesteps = 0;
    config.cold_start.post_cold_start_pools = BTreeMap::from([(
        AssetKind::Avl,
        PoolConfig {
            base_deposit: 1.0,
            max_extra_deposit: 0.0,
            ..PoolConfig::avl_default()
        },
    )]);

    let orchestrator = run(config, 3);
    let manager = orchestrator.state().pool_manager();
    assert_eq!(manager.pool_config(AssetKind::Avl).map(|pool| pool.base_deposit), Some(1.0));
    assert_eq!(flows_at(&orchestrator, AssetKind::Avl, 1).1, 1.0);
    assert_eq!(count(&orchestrator, "ColdStartEnded"), 0);
}

// ============================================================================
// Caps
// ============================================================================

#[test]
fn test_cap_reached_and_cleared() {
    let mut config = SimulationConfig::default();
    // eth_maxi starts with $4 of ETH
    config.pools = BTreeMap::from([(
        AssetKind::Eth,
        PoolConfig {
            base_deposit: 0.5,
            max_extra_deposit: 0.0,
            base_withdrawal: 3.0,
            max_extra_withdrawal: 0.0,
            max_cap: Some(2.0),
            ..PoolConfig::eth_default()
        },
    )]);

    let mut orchestrator = Orchestrator::new(config.clone(), PriceFeed::constant(config.initial_prices), 7).unwrap();

    orchestrator.step().unwrap();
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Eth),
        PoolStatus::CapPaused
    );
    assert_eq!(flows_at(&orchestrator, AssetKind::Eth, 1).1, 0.0);
    assert!((orchestrator.state().asset_tvl(AssetKind::Eth) - 1.0).abs() < 1e-9);

    orchestrator.step().unwrap();
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Eth),
        PoolStatus::Active
    );

    let reached = orchestrator.event_log().events_of_type("CapReached");
    let cleared = orchestrator.event_log().events_of_type("CapCleared");
    assert_eq!(reached.len(), 1);
    assert_eq!(reached[0].timestep(), 1);
    assert_eq!(cleared.len(), 1);
    assert_eq!(cleared[0].timestep(), 2);
}

#[test]
fn test_cap_pause_lifts_when_post_cold_start_pool_is_uncapped() {
    let mut config = SimulationConfig::default();
    // eth_maxi starts with $4 of ETH, above the cold-start cap
    let capped = PoolConfig {
        base_deposit: 0.5,
        max_extra_deposit: 0.0,
        base_withdrawal: 0.0,
        max_extra_withdrawal: 0.0,
        max_cap: Some(2.0),
        ..PoolConfig::eth_default()
    };
    config.pools = BTreeMap::from([(AssetKind::Eth, capped)]);
    config.cold_start.duration_timesteps = 2;
    config.cold_start.post_cold_start_pools =
        BTreeMap::from([(AssetKind::Eth, PoolConfig { max_cap: None, ..capped })]);

    let mut orchestrator = Orchestrator::new(config.clone(), PriceFeed::constant(config.initial_prices), 7).unwrap();

    orchestrator.step().unwrap();
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Eth),
        PoolStatus::CapPaused
    );
    assert_eq!(flows_at(&orchestrator, AssetKind::Eth, 1).1, 0.0);

    orchestrator.step().unwrap();
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Eth),
        PoolStatus::Active
    );
    assert_eq!(flows_at(&orchestrator, AssetKind::Eth, 2).1, 0.5);
    assert!((orchestrator.state().asset_tvl(AssetKind::Eth) - 4.5).abs() < 1e-9);

    let cleared = orchestrator.event_log().events_of_type("CapCleared");
    assert_eq!(cleared.len(), 1);
    assert_eq!(cleared[0].timestep(), 2);
}

// ============================================================================
// BTC activation
// ============================================================================

#[test]
fn test_btc_activation() {
    let mut config = SimulationConfig::default();
    config.btc_activation.timestep = 5;

    let mut orchestrator = run(config, 4);
    let manager = orchestrator.state().pool_manager();
    assert_eq!(manager.pool_status(AssetKind::Btc), PoolStatus::NotCreated);
    assert_eq!(manager.remaining_budget(AssetKind::Btc), 0.0);

    orchestrator.step().unwrap();
    let manager = orchestrator.state().pool_manager();
    assert_eq!(manager.pool_status(AssetKind::Btc), PoolStatus::Active);
    assert!((manager.remaining_budget(AssetKind::Btc) - 9_000_000.0).abs() < 1e-3);

    let activated = orchestrator.event_log().events_of_type("BtcPoolActivated");
    assert_eq!(activated.len(), 1);
    match activated[0] {
        Event::BtcPoolActivated { timestep, allocation } => {
            assert_eq!(*timestep, 5);
            assert_eq!(allocation[AssetKind::Btc], 0.3);
            assert_eq!(allocation[AssetKind::Avl], 0.5);
        }
        other => panic!("unexpected event {:?}", other),
    }

    // BTC flows start the timestep after activation
    assert!(orchestrator
        .event_log()
        .events_at_timestep(5)
        .iter()
        .all(|event| !(event.event_type() == "FlowsApplied" && event.pool() == Some(AssetKind::Btc))));
    orchestrator.step().unwrap();
    assert!(flows_at(&orchestrator, AssetKind::Btc, 6).1 > 0.0);
}

#[test]
fn test_btc_activation_disabled() {
    let mut config = SimulationConfig::default();
    config.btc_activation.enabled = false;
    config.btc_activation.timestep = 2;

    let orchestrator = run(config, 4);
    assert_eq!(count(&orchestrator, "BtcPoolActivated"), 0);
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Btc),
        PoolStatus::NotCreated
    );
}

#[test]
fn test_deleted_btc_is_never_activated() {
    let mut config = SimulationConfig::default();
    config.btc_activation.timestep = 5;
    config.admin.delete_pools = EventSchedule::from_entries([(2, vec![AssetKind::Btc])]);

    let orchestrator = run(config, 6);
    assert_eq!(count(&orchestrator, "BtcPoolActivated"), 0);
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Btc),
        PoolStatus::Deleted
    );
}

// ============================================================================
// Admin actions
// ============================================================================

#[test]
fn test_pause_then_resume() {
    let mut config = SimulationConfig::default();
    config.admin.pause_deposits = EventSchedule::from_entries([(3, vec![AssetKind::Eth])]);
    config.admin.resume_deposits = EventSchedule::from_entries([(4, vec![AssetKind::Eth])]);

    let orchestrator = run(config, 5);

    assert!(flows_at(&orchestrator, AssetKind::Eth, 3).1 > 0.0);
    assert_eq!(flows_at(&orchestrator, AssetKind::Eth, 4).1, 0.0);
    assert!(flows_at(&orchestrator, AssetKind::Eth, 5).1 > 0.0);
    // Unaffected pool keeps taking deposits
    assert!(flows_at(&orchestrator, AssetKind::Avl, 4).1 > 0.0);

    assert_eq!(count(&orchestrator, "PoolPaused"), 1);
    assert_eq!(count(&orchestrator, "PoolResumed"), 1);
}

#[test]
fn test_delete_drains_pool() {
    let mut config = SimulationConfig::default();
    config.admin.delete_pools = EventSchedule::from_entries([(6, vec![AssetKind::Eth])]);
    config.admin.resume_deposits = EventSchedule::from_entries([(8, vec![AssetKind::Eth])]);

    let mut orchestrator = run(config, 6);
    let deleted = orchestrator.event_log().events_of_type("PoolDeleted");
    assert_eq!(deleted.len(), 1);
    match deleted[0] {
        Event::PoolDeleted { stranded_budget, .. } => assert!(*stranded_budget > 8_900_000.0),
        other => panic!("unexpected event {:?}", other),
    }

    let eth_before = orchestrator.state().asset_balance(AssetKind::Eth);
    orchestrator.step().unwrap();
    let eth_after = orchestrator.state().asset_balance(AssetKind::Eth);
    assert!((eth_after - eth_before * 0.7).abs() < 1e-9 * eth_before.max(1.0));

    let manager = orchestrator.state().pool_manager();
    assert_eq!(manager.remaining_budget(AssetKind::Eth), 0.0);
    assert_eq!(manager.pool_status(AssetKind::Eth), PoolStatus::Deleted);

    // Resuming a deleted pool is ignored without an event
    orchestrator.run(2).unwrap();
    assert_eq!(count(&orchestrator, "PoolResumed"), 0);
    assert_eq!(
        orchestrator.state().pool_manager().pool_status(AssetKind::Eth),
        PoolStatus::Deleted
    );
    assert_eq!(flows_at(&orchestrator, AssetKind::Eth, 8).1, 0.0);
}

#[test]
fn test_deleted_pool_reports_zero_rewards() {
    let mut config = SimulationConfig::default();
    config.admin.delete_pools = EventSchedule::from_entries([(1, vec![AssetKind::Eth])]);

    let orchestrator = run(config, 2);
    let outcome = orchestrator.state().metrics().pool_rewards[&AssetKind::Eth];
    assert_eq!(outcome.granted, 0.0);
    assert_eq!(outcome.scaling_factor, 0.0);
    assert_eq!(orchestrator.state().metrics().pool_apy[AssetKind::Eth], 0.0);
}
