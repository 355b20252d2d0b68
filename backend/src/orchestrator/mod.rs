//! Orchestrator - per-timestep simulation loop
//!
//! - `config`: run parameters and timestep-keyed schedules
//! - `pipeline`: ordered stage execution with atomic commit
//! - `engine`: `initialize` / `step` entry points and the [`Orchestrator`]

pub mod config;
pub mod engine;
pub mod pipeline;

pub use config::{
    AdminSchedule, AgentsConfig, BtcActivationConfig, ColdStartConfig, EventSchedule, SimulationConfig, StepSchedule,
};
pub use engine::{initialize, initialize_with_feed, step, Orchestrator, SimulationError, StateObserver, StepResult};
pub use pipeline::Pipeline;
