//! Staking Simulator Core - Rust Engine
//!
//! Deterministic economics simulator for a multi-asset staking protocol:
//! AVL, ETH and BTC pools funded from a shared reward budget, with
//! yield-driven capital flows, boosted reward distribution and restaking.
//!
//! # Architecture
//!
//! - **core**: Timestep length and annual/per-period conversion
//! - **models**: Domain types (AgentStake, PoolManager, Event, State)
//! - **rewards**: Inflation curve, boosted distribution, yields
//! - **prices**: Per-timestep price sources
//! - **policy**: Pipeline stages
//! - **orchestrator**: Configuration and the timestep loop
//!
//! # Critical Invariants
//!
//! 1. Asset percentages of every agent sum to 1 (or are all zero)
//! 2. Pool budgets never go negative; spent budget never decreases
//! 3. A step either commits completely or leaves the state untouched
//! 4. Same config + prices + seed = identical run

pub mod core;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod prices;
pub mod rewards;

pub use crate::core::time::TimeManager;
pub use models::{
    agent::{AgentError, AgentRoster, AgentStake, LockMultipliers, ShareMultipliers},
    asset::{AssetKind, AssetMap},
    event::{Event, EventLog},
    pool::{PoolConfig, PoolError, PoolManager},
    state::{Metrics, SimulationState},
};
pub use orchestrator::{initialize, initialize_with_feed, step, Orchestrator, SimulationConfig, SimulationError, StepResult};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn staking_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulation::PySimulation>()?;
    Ok(())
}
