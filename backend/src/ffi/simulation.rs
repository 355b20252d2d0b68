//! PyO3 wrapper for the orchestrator

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{parse_price_series, step_result_to_py, to_py_err};
use crate::orchestrator::{Orchestrator, SimulationConfig};
use crate::prices::PriceFeed;

/// Python handle on one simulation run
///
/// # Example (from Python)
///
/// ```python
/// from staking_simulator_core_rs import Simulation
///
/// sim = Simulation('{"initial_budget": 30000000}', {"AVL": [0.05, 0.06]}, seed=42)
/// for result in sim.run(365):
///     print(result["timestep"], result["total_security"])
/// state = json.loads(sim.state_json())
/// ```
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: Orchestrator,
}

#[pymethods]
impl PySimulation {
    /// Create a simulation from a JSON config
    ///
    /// `price_series` maps asset symbols to per-timestep price lists; assets left
    /// out stay at their initial price. Raises ValueError on a bad config.
    #[new]
    #[pyo3(signature = (config_json, price_series=None, seed=0))]
    fn new(config_json: &str, price_series: Option<&Bound<'_, PyDict>>, seed: u64) -> PyResult<Self> {
        let config = SimulationConfig::from_json_str(config_json).map_err(to_py_err)?;
        let feed = match price_series {
            Some(series) => parse_price_series(series, &config.initial_prices)?,
            None => PriceFeed::constant(config.initial_prices),
        };

        let inner = Orchestrator::new(config, feed, seed).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Execute one timestep, returning a summary dict
    fn step(&mut self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let result = self.inner.step().map_err(to_py_err)?;
        step_result_to_py(py, &result)
    }

    /// Execute `num_timesteps` timesteps, returning one dict per timestep
    fn run(&mut self, py: Python<'_>, num_timesteps: usize) -> PyResult<Py<PyList>> {
        let results = self.inner.run(num_timesteps).map_err(to_py_err)?;
        let list = PyList::empty(py);
        for result in &results {
            list.append(step_result_to_py(py, result)?)?;
        }
        Ok(list.into())
    }

    fn timestep(&self) -> usize {
        self.inner.current_timestep()
    }

    fn run_id(&self) -> String {
        self.inner.run_id().to_string()
    }

    /// Current snapshot as JSON
    fn state_json(&self) -> PyResult<String> {
        self.inner
            .state()
            .to_json()
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))
    }

    /// Events logged at `timestep` as a JSON array
    fn events_json(&self, timestep: usize) -> PyResult<String> {
        serde_json::to_string(&self.inner.event_log().events_at_timestep(timestep))
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))
    }

    /// Number of events logged so far
    fn events_len(&self) -> usize {
        self.inner.event_count()
    }

    /// Independent copy of this run for Monte Carlo
    fn fork(&self, run_index: u64) -> Self {
        Self {
            inner: self.inner.fork(run_index),
        }
    }
}
