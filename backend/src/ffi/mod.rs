//! Python bindings (feature `pyo3`)
//!
//! - `simulation`: the `Simulation` class wrapping [`Orchestrator`](crate::orchestrator::Orchestrator)
//! - `types`: dict/JSON conversion helpers

pub mod simulation;
pub mod types;
