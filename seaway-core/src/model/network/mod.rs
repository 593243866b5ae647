//! Directed waypoint graph snapshots

mod export;
mod stats;

use std::{fmt, str::FromStr};

use geo::{Coord, LineString, Point};
use hashbrown::{HashMap, HashSet};
use petgraph::{
    algo::connected_components,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};

pub use export::{EdgeRecord, NodeRecord};
pub use stats::{EdgeStatistics, SampleSummary, ShapeSummary};

use crate::{Error, WaypointId, geometry, model::Waypoint, model::WaypointTable};

/// Processing stage a snapshot was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Raw,
    Pruned,
    Refined,
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SnapshotKind::Raw => "raw",
            SnapshotKind::Pruned => "pruned",
            SnapshotKind::Refined => "refined",
        };
        f.write_str(name)
    }
}

impl FromStr for SnapshotKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(SnapshotKind::Raw),
            "pruned" => Ok(SnapshotKind::Pruned),
            "refined" => Ok(SnapshotKind::Refined),
            other => Err(Error::InvalidConfig(format!(
                "unknown snapshot '{other}', expected raw, pruned or refined"
            ))),
        }
    }
}

/// Graph node, a read-only copy of the waypoint attributes used by the graph algorithms
#[derive(Debug, Clone)]
pub struct NetworkNode {
    pub id: WaypointId,
    pub position: Point<f64>,
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub course_before: Option<f64>,
    pub course_after: Option<f64>,
    pub n_members: usize,
}

impl From<&Waypoint> for NetworkNode {
    fn from(wp: &Waypoint) -> Self {
        Self {
            id: wp.id,
            position: wp.position,
            lat: wp.lat,
            lon: wp.lon,
            speed: wp.speed,
            course_before: wp.course_before,
            course_after: wp.course_after,
            n_members: wp.n_members,
        }
    }
}

impl NetworkNode {
    pub fn geographic(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Observed transit between two waypoints
#[derive(Debug, Clone)]
pub struct Connection {
    pub from: WaypointId,
    pub to: WaypointId,
    pub geometry: LineString<f64>,
    /// Compass bearing from `from` to `to`
    pub bearing: f64,
    pub length: f64,
    /// Number of recorded transits
    pub passages: u32,
    /// `1 / passages`, zero while the edge carries no passages
    pub inverse_weight: f64,
    /// Speed and cross-track distributions, refined snapshots only
    pub statistics: Option<EdgeStatistics>,
}

impl Connection {
    /// Straight connection between two waypoint centroids
    pub fn straight(from: &NetworkNode, to: &NetworkNode, passages: u32) -> Self {
        let geometry = LineString::new(vec![
            Coord::from(from.position),
            Coord::from(to.position),
        ]);
        let length = geometry::curve_length(&geometry);
        let mut connection = Self {
            from: from.id,
            to: to.id,
            geometry,
            bearing: geometry::bearing(from.geographic(), to.geographic()),
            length,
            passages: 0,
            inverse_weight: 0.0,
            statistics: None,
        };
        connection.set_passages(passages);
        connection
    }

    /// Updates the passage count and the derived inverse weight
    pub fn set_passages(&mut self, passages: u32) {
        self.passages = passages;
        self.inverse_weight = if passages > 0 {
            1.0 / f64::from(passages)
        } else {
            0.0
        };
    }
}

/// Node and edge counts of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub kind: SnapshotKind,
    pub nodes: usize,
    pub isolated_nodes: usize,
    pub edges: usize,
    pub weakly_connected: bool,
    pub total_passages: u64,
}

/// An immutable snapshot of the traffic network
///
/// Nodes are every waypoint of the table the snapshot was built from; edges are
/// unique per ordered waypoint pair and never form self-loops.
#[derive(Debug, Clone)]
pub struct TrafficNetwork {
    kind: SnapshotKind,
    graph: DiGraph<NetworkNode, Connection>,
    node_index: HashMap<WaypointId, NodeIndex>,
}

impl TrafficNetwork {
    /// Assembles a snapshot from nodes and connections
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate node ids, connections whose endpoints are
    /// not nodes, self-loops or parallel connections
    pub fn from_parts(
        kind: SnapshotKind,
        nodes: impl IntoIterator<Item = NetworkNode>,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<Self, Error> {
        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();
        for node in nodes {
            let id = node.id;
            let idx = graph.add_node(node);
            if node_index.insert(id, idx).is_some() {
                return Err(Error::DuplicateWaypoint(id));
            }
        }

        for connection in connections {
            let from = *node_index
                .get(&connection.from)
                .ok_or(Error::UnknownWaypoint(connection.from))?;
            let to = *node_index
                .get(&connection.to)
                .ok_or(Error::UnknownWaypoint(connection.to))?;
            if from == to {
                return Err(Error::InvalidData(format!(
                    "self-loop at waypoint {}",
                    connection.from
                )));
            }
            if graph.find_edge(from, to).is_some() {
                return Err(Error::InvalidData(format!(
                    "parallel connection {} -> {}",
                    connection.from, connection.to
                )));
            }
            graph.add_edge(from, to, connection);
        }

        Ok(Self {
            kind,
            graph,
            node_index,
        })
    }

    /// Snapshot whose nodes are all waypoints of `table`
    ///
    /// # Errors
    ///
    /// See [`TrafficNetwork::from_parts`]
    pub fn from_waypoints(
        kind: SnapshotKind,
        table: &WaypointTable,
        connections: impl IntoIterator<Item = Connection>,
    ) -> Result<Self, Error> {
        Self::from_parts(kind, table.iter().map(NetworkNode::from), connections)
    }

    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    pub fn graph(&self) -> &DiGraph<NetworkNode, Connection> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn isolated_count(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors_undirected(idx).next().is_none())
            .count()
    }

    pub fn is_weakly_connected(&self) -> bool {
        connected_components(&self.graph) == 1
    }

    pub fn index_of(&self, id: WaypointId) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }

    /// # Errors
    ///
    /// Returns `UnknownWaypoint` if the id is not a node of this snapshot
    pub fn try_index_of(&self, id: WaypointId) -> Result<NodeIndex, Error> {
        self.index_of(id).ok_or(Error::UnknownWaypoint(id))
    }

    pub fn contains(&self, id: WaypointId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node(&self, id: WaypointId) -> Option<&NetworkNode> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn id_of(&self, idx: NodeIndex) -> WaypointId {
        self.graph[idx].id
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.graph.node_weights()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.edge_weights()
    }

    pub(crate) fn edge_index(&self, from: WaypointId, to: WaypointId) -> Option<EdgeIndex> {
        self.graph.find_edge(self.index_of(from)?, self.index_of(to)?)
    }

    pub fn connection(&self, from: WaypointId, to: WaypointId) -> Option<&Connection> {
        self.edge_index(from, to).map(|e| &self.graph[e])
    }

    /// Subgraph induced by the given node ids, same kind as `self`
    pub fn induced_subgraph(&self, ids: &HashSet<WaypointId>) -> TrafficNetwork {
        let mut graph = DiGraph::new();
        let mut node_index = HashMap::with_capacity(ids.len());
        for node in self.graph.node_weights().filter(|n| ids.contains(&n.id)) {
            node_index.insert(node.id, graph.add_node(node.clone()));
        }
        for edge in self.graph.edge_references() {
            let connection = edge.weight();
            if let (Some(&from), Some(&to)) = (
                node_index.get(&connection.from),
                node_index.get(&connection.to),
            ) {
                graph.add_edge(from, to, connection.clone());
            }
        }
        TrafficNetwork {
            kind: self.kind,
            graph,
            node_index,
        }
    }

    /// Copy of the snapshot keeping only the connections accepted by `keep`, all nodes retained
    pub fn filter_connections(
        &self,
        kind: SnapshotKind,
        mut keep: impl FnMut(EdgeIndex, &Connection) -> bool,
    ) -> TrafficNetwork {
        self.map_connections(kind, |edge, connection| {
            keep(edge, connection).then(|| connection.clone())
        })
    }

    /// Copy of the snapshot with every connection replaced by the result of `map`,
    /// `None` drops the connection; nodes are retained
    pub fn map_connections(
        &self,
        kind: SnapshotKind,
        mut map: impl FnMut(EdgeIndex, &Connection) -> Option<Connection>,
    ) -> TrafficNetwork {
        let mut graph = self.graph.clone();
        graph.clear_edges();
        for edge in self.graph.edge_references() {
            if let Some(connection) = map(edge.id(), edge.weight()) {
                graph.add_edge(edge.source(), edge.target(), connection);
            }
        }
        TrafficNetwork {
            kind,
            graph,
            node_index: self.node_index.clone(),
        }
    }

    /// Whether consecutive ids of `path` are all joined by connections
    pub fn is_walk(&self, path: &[WaypointId]) -> bool {
        !path.is_empty()
            && path.iter().all(|&id| self.contains(id))
            && path.windows(2).all(|w| self.connection(w[0], w[1]).is_some())
    }

    /// Edge geometries along a walk
    ///
    /// # Errors
    ///
    /// Returns `MissingConnection` for the first consecutive pair without an edge
    pub fn path_geometry(&self, path: &[WaypointId]) -> Result<Vec<&LineString<f64>>, Error> {
        path.windows(2)
            .map(|w| {
                self.connection(w[0], w[1])
                    .map(|c| &c.geometry)
                    .ok_or(Error::MissingConnection {
                        from: w[0],
                        to: w[1],
                    })
            })
            .collect()
    }

    /// Total geometric length along a walk
    ///
    /// # Errors
    ///
    /// Returns `MissingConnection` if the walk leaves the graph
    pub fn path_length(&self, path: &[WaypointId]) -> Result<f64, Error> {
        Ok(self
            .path_geometry(path)?
            .into_iter()
            .map(geometry::curve_length)
            .sum())
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            kind: self.kind,
            nodes: self.node_count(),
            isolated_nodes: self.isolated_count(),
            edges: self.edge_count(),
            weakly_connected: self.is_weakly_connected(),
            total_passages: self.connections().map(|c| u64::from(c.passages)).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: WaypointId, x: f64) -> NetworkNode {
        NetworkNode {
            id,
            position: Point::new(x, 0.0),
            lat: 0.0,
            lon: x / 111_320.0,
            speed: 8.0,
            course_before: Some(90.0),
            course_after: Some(90.0),
            n_members: 5,
        }
    }

    fn chain() -> TrafficNetwork {
        let (a, b, c, d) = (node(0, 0.0), node(1, 100.0), node(2, 200.0), node(3, 900.0));
        let edges = vec![
            Connection::straight(&a, &b, 4),
            Connection::straight(&b, &c, 2),
        ];
        TrafficNetwork::from_parts(SnapshotKind::Raw, [a, b, c, d], edges).unwrap()
    }

    #[test]
    fn straight_connection_attributes() {
        let network = chain();
        let ab = network.connection(0, 1).unwrap();
        assert!((ab.length - 100.0).abs() < 1e-9);
        assert!((ab.bearing - 90.0).abs() < 1e-6);
        assert!((ab.inverse_weight - 0.25).abs() < 1e-12);
        assert!(network.connection(1, 0).is_none());
    }

    #[test]
    fn summary_counts_isolated_nodes() {
        let summary = chain().summary();
        assert_eq!(summary.nodes, 4);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.isolated_nodes, 1);
        assert!(!summary.weakly_connected);
        assert_eq!(summary.total_passages, 6);
    }

    #[test]
    fn self_loops_and_parallel_edges_are_rejected() {
        let (a, b) = (node(0, 0.0), node(1, 10.0));
        let looped = Connection::straight(&a, &a, 1);
        assert!(
            TrafficNetwork::from_parts(SnapshotKind::Raw, [a.clone(), b.clone()], [looped])
                .is_err()
        );
        let twice = [Connection::straight(&a, &b, 1), Connection::straight(&a, &b, 2)];
        assert!(TrafficNetwork::from_parts(SnapshotKind::Raw, [a, b], twice).is_err());
    }

    #[test]
    fn subgraph_and_walks() {
        let network = chain();
        let ids: HashSet<_> = [0, 1].into_iter().collect();
        let channel = network.induced_subgraph(&ids);
        assert_eq!(channel.node_count(), 2);
        assert_eq!(channel.edge_count(), 1);
        assert!(network.is_walk(&[0, 1, 2]));
        assert!(!network.is_walk(&[0, 2]));
        assert!(matches!(
            network.path_geometry(&[0, 2]),
            Err(Error::MissingConnection { from: 0, to: 2 })
        ));
        assert!((network.path_length(&[0, 1, 2]).unwrap() - 200.0).abs() < 1e-9);
    }
}
