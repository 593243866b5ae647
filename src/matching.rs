use chrono::{DateTime, Utc};
use geo::Point;
use pyo3::prelude::*;
use pyo3::types::PyDict;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::derive::{gen_stub_pyclass, gen_stub_pyfunction, gen_stub_pymethods};
use seaway_core::prelude::*;
use wkt::ToWkt;

use crate::network::{PyTrafficNetwork, core_error, value_error};

/// Time-ordered AIS samples of one vessel
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "Trajectory")]
#[derive(Clone)]
pub struct PyTrajectory {
    pub inner: Trajectory,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyTrajectory {
    /// Builds a trajectory from parallel sample columns
    ///
    /// ``x`` and ``y`` are the projected coordinates used for distances,
    /// ``lat`` and ``lon`` are used for bearings. Samples are sorted by time.
    #[new]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vessel_id: VesselId,
        timestamps: Vec<DateTime<Utc>>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        x: Vec<f64>,
        y: Vec<f64>,
        speed: Vec<f64>,
        course: Vec<f64>,
    ) -> PyResult<Self> {
        let n = timestamps.len();
        if [lat.len(), lon.len(), x.len(), y.len(), speed.len(), course.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(value_error("all sample columns must have the same length"));
        }
        let points = (0..n)
            .map(|i| TrajectoryPoint {
                timestamp: timestamps[i],
                lat: lat[i],
                lon: lon[i],
                position: Point::new(x[i], y[i]),
                speed: speed[i],
                course: course[i],
            })
            .collect();
        let inner =
            Trajectory::new(vessel_id, points).map_err(|e| core_error("Invalid trajectory", e))?;
        Ok(Self { inner })
    }

    #[getter]
    fn vessel_id(&self) -> VesselId {
        self.inner.vessel_id
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Trajectory as a WKT linestring in the projected frame
    fn wkt(&self) -> String {
        self.inner.line_string().wkt_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "Trajectory(vessel_id={}, samples={})",
            self.inner.vessel_id,
            self.inner.len()
        )
    }
}

/// Load significant points and group them into one trajectory per vessel
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction(name = "load_trajectories")]
pub fn py_load_trajectories(py: Python<'_>, path: &str) -> PyResult<Vec<PyTrajectory>> {
    let trajectories = py
        .detach(|| seaway_core::loading::load_trajectories(std::path::Path::new(path)))
        .map_err(|e| core_error("Failed to load trajectories", e))?;
    Ok(trajectories
        .into_iter()
        .map(|inner| PyTrajectory { inner })
        .collect())
}

/// Matched path and quality metrics of one trajectory
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "MatchResult")]
#[derive(Clone)]
pub struct PyMatchResult {
    pub inner: MatchResult,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyMatchResult {
    #[getter]
    fn vessel_id(&self) -> VesselId {
        self.inner.vessel_id
    }

    /// One of ``success``, ``attempt``, ``no_path``, ``no_intersects``
    #[getter]
    fn status(&self) -> String {
        self.inner.status().to_string()
    }

    #[getter]
    fn path(&self) -> Vec<WaypointId> {
        self.inner
            .matched()
            .map(|m| m.path.clone())
            .unwrap_or_default()
    }

    /// NaN unless the trajectory was matched
    #[getter]
    fn sspd(&self) -> f64 {
        self.inner.sspd()
    }

    #[getter]
    fn fraction_covered(&self) -> f64 {
        self.inner.fraction_covered()
    }

    #[getter]
    fn distances(&self) -> Vec<f64> {
        self.inner
            .matched()
            .map(|m| m.distances.clone())
            .unwrap_or_default()
    }

    /// Edge geometries of the path as WKT linestrings
    #[getter]
    fn edges(&self) -> Vec<String> {
        self.inner.path_record().edges
    }

    fn __repr__(&self) -> String {
        format!(
            "MatchResult(vessel_id={}, status={}, sspd={:.2})",
            self.inner.vessel_id,
            self.inner.status(),
            self.inner.sspd()
        )
    }
}

fn match_config(
    network: &PyTrafficNetwork,
    algorithm: &str,
    k_max: usize,
    l_max: usize,
) -> PyResult<MatchConfig> {
    Ok(MatchConfig {
        algorithm: algorithm.parse().map_err(value_error)?,
        k_max,
        l_max,
        ..network.config.matching.clone()
    })
}

/// Map a trajectory onto the best fitting walk through the pruned network
///
/// Parameters
/// ----------
/// network : TrafficNetwork
///     Network with a pruned snapshot
/// trajectory : Trajectory
/// algorithm : str, default="standard"
///     ``refined`` additionally skips waypoints the direct connection fits better
/// k_max : int, default=500
///     Maximum number of alternative sub-paths per passage pair
/// l_max : int, default=5
///     Maximum sub-path length in edges
///
/// Raises
/// ------
/// ValueError
///     If the network has not been pruned or the settings are invalid
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction(name = "match_trajectory")]
#[pyo3(signature = (network, trajectory, algorithm = "standard", k_max = 500, l_max = 5))]
pub fn py_match_trajectory(
    py: Python<'_>,
    network: &PyTrafficNetwork,
    trajectory: &PyTrajectory,
    algorithm: &str,
    k_max: usize,
    l_max: usize,
) -> PyResult<PyMatchResult> {
    let config = match_config(network, algorithm, k_max, l_max)?;
    config.validate().map_err(|e| core_error("Matching failed", e))?;
    let inner = py
        .detach(|| network.snapshots.match_trajectory(&trajectory.inner, &config))
        .map_err(|e| core_error("Matching failed", e))?;
    Ok(PyMatchResult { inner })
}

/// Match results of a batch and their quality summary
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "Evaluation")]
pub struct PyEvaluation {
    pub(crate) evaluation: Evaluation,
    pub(crate) trajectories: Vec<Trajectory>,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyEvaluation {
    #[getter]
    fn results(&self) -> Vec<PyMatchResult> {
        self.evaluation
            .results
            .iter()
            .cloned()
            .map(|inner| PyMatchResult { inner })
            .collect()
    }

    /// Status fractions, coverage and the half-normal fit of the distances
    fn summary<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let summary = &self.evaluation.summary;
        let dict = PyDict::new(py);
        dict.set_item("trajectories", summary.trajectories)?;
        dict.set_item("success", summary.success)?;
        dict.set_item("attempt", summary.attempt)?;
        dict.set_item("no_path", summary.no_path)?;
        dict.set_item("no_intersects", summary.no_intersects)?;
        dict.set_item("nan_fraction", summary.nan_fraction)?;
        dict.set_item("mean_fraction_covered", summary.mean_fraction_covered)?;
        dict.set_item("distance_mean", summary.distance_mean)?;
        dict.set_item("distance_median", summary.distance_median)?;
        dict.set_item("distance_std", summary.distance_std)?;
        if let Some(fit) = summary.half_normal {
            dict.set_item("half_normal_scale", fit.scale)?;
            dict.set_item("half_normal_mean", fit.mean)?;
            dict.set_item("half_normal_std", fit.std)?;
        }
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!(
            "Evaluation(trajectories={}, success={:.3})",
            self.evaluation.summary.trajectories, self.evaluation.summary.success
        )
    }
}

/// Match every trajectory against the pruned network in parallel
///
/// The returned evaluation can be passed to ``TrafficNetwork.refine``.
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction(name = "evaluate_network")]
#[pyo3(signature = (network, trajectories, algorithm = "standard", k_max = 500, l_max = 5))]
pub fn py_evaluate_network(
    py: Python<'_>,
    network: &PyTrafficNetwork,
    trajectories: Vec<PyTrajectory>,
    algorithm: &str,
    k_max: usize,
    l_max: usize,
) -> PyResult<PyEvaluation> {
    let config = match_config(network, algorithm, k_max, l_max)?;
    let trajectories: Vec<Trajectory> = trajectories.into_iter().map(|t| t.inner).collect();
    let evaluation = py
        .detach(|| network.snapshots.evaluate(&trajectories, &config))
        .map_err(|e| core_error("Evaluation failed", e))?;
    Ok(PyEvaluation {
        evaluation,
        trajectories,
    })
}
