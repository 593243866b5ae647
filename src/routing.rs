use pyo3::prelude::*;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::derive::gen_stub_pyfunction;
use seaway_core::prelude::*;

use crate::network::{PyTrafficNetwork, core_error, parse_kind, value_error};

/// Shortest path between two waypoints of a snapshot
///
/// Parameters
/// ----------
/// network : TrafficNetwork
/// origin : int
///     Waypoint id of the start
/// destination : int
///     Waypoint id of the target
/// kind : str, default="pruned"
///     Snapshot to search
/// weight : str, default="inverse_weight"
///     Edge cost, one of ``inverse_weight``, ``length``, ``hops``
///
/// Returns
/// -------
/// tuple[list[int], float] | None
///     Waypoint ids and total cost, None if the destination is unreachable
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (network, origin, destination, kind = "pruned", weight = "inverse_weight"))]
pub fn shortest_path(
    network: &PyTrafficNetwork,
    origin: WaypointId,
    destination: WaypointId,
    kind: &str,
    weight: &str,
) -> PyResult<Option<(Vec<WaypointId>, f64)>> {
    let weight: EdgeWeight = weight.parse().map_err(value_error)?;
    let snapshot = network
        .snapshots
        .snapshot(parse_kind(kind)?)
        .map_err(|e| core_error("Routing failed", e))?;
    match seaway_core::routing::dijkstra::shortest_path(snapshot, origin, destination, weight) {
        Ok(path) => Ok(Some((path.nodes, path.cost))),
        Err(Error::Unreachable { .. }) => Ok(None),
        Err(e) => Err(core_error("Routing failed", e)),
    }
}
