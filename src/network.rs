use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::PyDict;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::derive::{gen_stub_pyclass, gen_stub_pyfunction, gen_stub_pymethods};
use seaway_core::prelude::*;

use crate::matching::PyEvaluation;

pub(crate) fn runtime_error(context: &str, err: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{context}: {err}"))
}

pub(crate) fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
}

/// Maps configuration errors to `ValueError` and everything else to `RuntimeError`
pub(crate) fn core_error(context: &str, err: Error) -> PyErr {
    match err {
        Error::InvalidConfig(_) | Error::MissingSnapshot(_) | Error::UnknownWaypoint(_) => {
            value_error(err)
        }
        other => runtime_error(context, other),
    }
}

pub(crate) fn parse_kind(kind: &str) -> PyResult<SnapshotKind> {
    kind.parse().map_err(value_error)
}

/// TrafficNetwork
///
/// Maritime traffic network of one generation run: the waypoint table and the
/// raw snapshot, plus the pruned and refined snapshots once computed.
///
/// Example:
///
/// .. code-block:: python
///
///     network = create_traffic_network("waypoints.csv", "points.csv")
///     network.prune(min_passages=3)
///     result = match_trajectory(network, trajectories[0])
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "TrafficNetwork")]
pub struct PyTrafficNetwork {
    pub(crate) snapshots: NetworkSnapshots,
    pub(crate) config: NetworkConfig,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyTrafficNetwork {
    pub fn waypoint_count(&self) -> usize {
        self.snapshots.waypoints().len()
    }

    /// Number of edges of a snapshot (`raw`, `pruned` or `refined`)
    #[pyo3(signature = (kind = "pruned"))]
    pub fn edge_count(&self, kind: &str) -> PyResult<usize> {
        let network = self
            .snapshots
            .snapshot(parse_kind(kind)?)
            .map_err(|e| core_error("Edge count failed", e))?;
        Ok(network.edge_count())
    }

    /// Node, isolated node and edge counts of a snapshot
    #[pyo3(signature = (kind = "pruned"))]
    pub fn summary<'py>(&self, py: Python<'py>, kind: &str) -> PyResult<Bound<'py, PyDict>> {
        let summary = self
            .snapshots
            .snapshot(parse_kind(kind)?)
            .map_err(|e| core_error("Summary failed", e))?
            .summary();
        let dict = PyDict::new(py);
        dict.set_item("kind", summary.kind.to_string())?;
        dict.set_item("nodes", summary.nodes)?;
        dict.set_item("isolated_nodes", summary.isolated_nodes)?;
        dict.set_item("edges", summary.edges)?;
        dict.set_item("weakly_connected", summary.weakly_connected)?;
        dict.set_item("total_passages", summary.total_passages)?;
        Ok(dict)
    }

    /// Prunes the raw or refined snapshot and replaces the pruned one
    ///
    /// Parameters
    /// ----------
    /// min_passages : int, default=3
    ///     Edges with fewer passages are tested for a comparable alternative route
    /// source : str, default="raw"
    ///     Snapshot to prune, ``raw`` or ``refined``
    /// order : str, default="sequential"
    ///     ``sequential`` keeps tentative removals for later tests,
    ///     ``independent`` tests every edge on its own
    ///
    /// Raises
    /// ------
    /// ValueError
    ///     If the source snapshot has not been computed
    #[pyo3(signature = (min_passages = 3, source = "raw", order = "sequential"))]
    pub fn prune<'py>(
        &mut self,
        py: Python<'py>,
        min_passages: u32,
        source: &str,
        order: &str,
    ) -> PyResult<Bound<'py, PyDict>> {
        let order = match order {
            "sequential" => RedundancyOrder::Sequential,
            "independent" => RedundancyOrder::Independent,
            other => return Err(value_error(format!("unknown redundancy order '{other}'"))),
        };
        let config = PruneConfig {
            min_passages,
            order,
            ..self.config.pruning.clone()
        };
        let source = parse_kind(source)?;
        let snapshots = &mut self.snapshots;
        let report = py
            .detach(|| snapshots.prune(source, &config))
            .map_err(|e| core_error("Pruning failed", e))?;

        let dict = PyDict::new(py);
        dict.set_item("nodes", report.nodes)?;
        dict.set_item("isolated_nodes", report.isolated_nodes)?;
        dict.set_item("edges", report.edges)?;
        dict.set_item("removed_by_direction", report.removed_by_direction)?;
        dict.set_item("removed_as_redundant", report.removed_as_redundant)?;
        Ok(dict)
    }

    /// Recomputes edge statistics from the successful matches of an evaluation
    ///
    /// Returns the number of edges of the refined snapshot.
    pub fn refine(&mut self, py: Python<'_>, evaluation: &PyEvaluation) -> usize {
        let snapshots = &mut self.snapshots;
        py.detach(|| {
            let paths = evaluation
                .evaluation
                .labeled_paths(&evaluation.trajectories);
            snapshots.refine(&paths).edges
        })
    }

    /// Edges of a snapshot as a GeoJSON FeatureCollection string
    #[pyo3(signature = (kind = "pruned"))]
    pub fn edges_geojson(&self, kind: &str) -> PyResult<String> {
        self.snapshots
            .snapshot(parse_kind(kind)?)
            .and_then(TrafficNetwork::to_geojson_string)
            .map_err(|e| core_error("GeoJSON export failed", e))
    }

    /// Node table of a snapshot, one record per waypoint with its degree
    #[pyo3(signature = (kind = "pruned"))]
    pub fn node_records<'py>(
        &self,
        py: Python<'py>,
        kind: &str,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let network = self
            .snapshots
            .snapshot(parse_kind(kind)?)
            .map_err(|e| core_error("Node export failed", e))?;
        network
            .node_records()
            .into_iter()
            .map(|record| {
                let dict = PyDict::new(py);
                dict.set_item("id", record.id)?;
                dict.set_item("lat", record.lat)?;
                dict.set_item("lon", record.lon)?;
                dict.set_item("x", record.x)?;
                dict.set_item("y", record.y)?;
                dict.set_item("speed", record.speed)?;
                dict.set_item("cog_before", record.cog_before)?;
                dict.set_item("cog_after", record.cog_after)?;
                dict.set_item("n_members", record.n_members)?;
                dict.set_item("degree", record.degree)?;
                Ok(dict)
            })
            .collect()
    }

    /// Edge table of a snapshot as a list of WKT-geometry records
    #[pyo3(signature = (kind = "pruned"))]
    pub fn edge_records<'py>(
        &self,
        py: Python<'py>,
        kind: &str,
    ) -> PyResult<Vec<Bound<'py, PyDict>>> {
        let network = self
            .snapshots
            .snapshot(parse_kind(kind)?)
            .map_err(|e| core_error("Edge export failed", e))?;
        network
            .edge_records()
            .into_iter()
            .map(|record| {
                let dict = PyDict::new(py);
                dict.set_item("from", record.from)?;
                dict.set_item("to", record.to)?;
                dict.set_item("geometry", record.geometry)?;
                dict.set_item("direction", record.direction)?;
                dict.set_item("length", record.length)?;
                dict.set_item("passages", record.passages)?;
                dict.set_item("inverse_weight", record.inverse_weight)?;
                dict.set_item("speed_mean", record.speed_mean)?;
                dict.set_item("speed_std", record.speed_std)?;
                dict.set_item("speed_ci_lower", record.speed_ci_lower)?;
                dict.set_item("speed_ci_upper", record.speed_ci_upper)?;
                dict.set_item("cross_track_mean", record.cross_track_mean)?;
                dict.set_item("cross_track_std", record.cross_track_std)?;
                dict.set_item("cross_track_skew", record.cross_track_skew)?;
                dict.set_item("cross_track_kurtosis", record.cross_track_kurtosis)?;
                dict.set_item("cross_track_ci_lower", record.cross_track_ci_lower)?;
                dict.set_item("cross_track_ci_upper", record.cross_track_ci_upper)?;
                Ok(dict)
            })
            .collect()
    }

    fn __repr__(&self) -> String {
        let raw = self.snapshots.raw();
        format!(
            "TrafficNetwork with {} waypoints, {} raw edges, pruned: {}, refined: {}",
            self.snapshots.waypoints().len(),
            raw.edge_count(),
            self.snapshots.pruned().is_some(),
            self.snapshots.refined().is_some()
        )
    }

    fn __str__(&self) -> String {
        self.__repr__()
    }
}

/// Create a maritime traffic network from the clustering output
///
/// Loads the waypoint and significant-point tables, builds the raw network
/// from the waypoint passages of every trajectory and prunes it.
///
/// Parameters
/// ----------
/// waypoints_path : str
///     CSV table of waypoints (``clusterID, lat, lon, x, y, speed, cog_before,
///     cog_after, n_members, convex_hull``)
/// trajectories_path : str
///     CSV table of significant points (``mmsi, date_time_utc, lat, lon, x, y,
///     speed, cog``)
/// config_json : str, optional
///     Network configuration as JSON, every section defaults
///
/// Returns
/// -------
/// TrafficNetwork
///
/// Raises
/// ------
/// ValueError
///     If the configuration is invalid
/// RuntimeError
///     If the tables cannot be loaded
///
/// Notes
/// -----
/// The function releases the GIL during processing.
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction(name = "create_traffic_network")]
#[pyo3(signature = (waypoints_path, trajectories_path, config_json = None))]
pub fn py_create_traffic_network(
    py: Python<'_>,
    waypoints_path: &str,
    trajectories_path: &str,
    config_json: Option<&str>,
) -> PyResult<PyTrafficNetwork> {
    let network: NetworkConfig = match config_json {
        Some(json) => serde_json::from_str(json).map_err(value_error)?,
        None => NetworkConfig::default(),
    };
    let config = TrafficNetworkConfig {
        waypoints_path: PathBuf::from(waypoints_path),
        trajectories_path: PathBuf::from(trajectories_path),
        network,
    };

    py.detach(|| {
        let snapshots = seaway_core::loading::create_traffic_network(&config)
            .map_err(|e| core_error("Failed to create traffic network", e))?;
        Ok(PyTrafficNetwork {
            snapshots,
            config: config.network,
        })
    })
}
