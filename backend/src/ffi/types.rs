//! Type conversion utilities for FFI boundary
//!
//! Configs, states and events cross the boundary as JSON strings, which keeps
//! the serde representation the single source of truth. Step results and
//! price series use plain dicts.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::models::asset::{AssetKind, AssetMap};
use crate::orchestrator::{SimulationError, StepResult};
use crate::prices::PriceFeed;

/// Map a simulation error to `ValueError` (bad input) or `RuntimeError`
pub fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::InvalidConfig(_) | SimulationError::Serialization(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
        }
        other => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(other.to_string()),
    }
}

/// Extract an optional field from a Python dict.
///
/// Returns an error only if the type conversion fails.
fn extract_optional<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<T>>
where
    T: for<'py> FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) => Ok(Some(value.extract()?)),
        None => Ok(None),
    }
}

/// Build a price feed from `{"AVL": [...], "ETH": [...], "BTC": [...]}`
///
/// Assets missing from the dict are held at `fallback`.
pub fn parse_price_series(series: &Bound<'_, PyDict>, fallback: &AssetMap<f64>) -> PyResult<PriceFeed> {
    for key in series.keys() {
        let symbol: String = key.extract()?;
        symbol
            .parse::<AssetKind>()
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))?;
    }

    let mut samples = AssetMap::<Vec<f64>>::default();
    for kind in AssetKind::ALL {
        samples[kind] = extract_optional(series, kind.symbol())?.unwrap_or_else(|| vec![fallback[kind]]);
    }
    Ok(PriceFeed::from_series(samples))
}

/// Convert step result to Python dict
pub fn step_result_to_py(py: Python<'_>, result: &StepResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("timestep", result.timestep)?;
    dict.set_item("num_events", result.num_events)?;
    dict.set_item("total_security", result.total_security)?;
    dict.set_item("inflation_rate", result.inflation_rate)?;
    dict.set_item("avg_yield", result.avg_yield)?;
    dict.set_item("remaining_budget", result.remaining_budget)?;
    Ok(dict.into())
}
