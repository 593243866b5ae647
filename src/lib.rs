use pyo3::prelude::*;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::define_stub_info_gatherer;

use matching::{
    PyEvaluation, PyMatchResult, PyTrajectory, py_evaluate_network, py_load_trajectories,
    py_match_trajectory,
};
use network::{PyTrafficNetwork, py_create_traffic_network};
use routing::shortest_path;

pub mod matching;
pub mod network;
pub mod routing;

/// A Python module implemented in Rust.
#[pymodule]
fn seaway(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyTrafficNetwork>()?;
    m.add_function(wrap_pyfunction!(py_create_traffic_network, m)?)?;

    m.add_class::<PyTrajectory>()?;
    m.add_function(wrap_pyfunction!(py_load_trajectories, m)?)?;

    m.add_function(wrap_pyfunction!(shortest_path, m)?)?;

    m.add_class::<PyMatchResult>()?;
    m.add_class::<PyEvaluation>()?;
    m.add_function(wrap_pyfunction!(py_match_trajectory, m)?)?;
    m.add_function(wrap_pyfunction!(py_evaluate_network, m)?)?;
    Ok(())
}

#[cfg(feature = "stubgen")]
define_stub_info_gatherer!(stub_info);
