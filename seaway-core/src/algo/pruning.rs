//! Removal of directionally inconsistent and redundant low-traffic edges

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use log::info;
use petgraph::{graph::EdgeIndex, visit::EdgeRef};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    geometry::circular_distance,
    model::{Connection, SnapshotKind, TrafficNetwork},
};

/// Edges whose bearing deviates more than this from both endpoint courses are dropped
const MAX_COURSE_DEVIATION: f64 = 90.0;

/// How tentative removals interact during the redundancy test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyOrder {
    /// Tested edges stay removed for later tests, result depends on edge order
    #[default]
    Sequential,
    /// Every edge is tested against the graph without earlier redundancy removals
    Independent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Edges with fewer passages are candidates for the redundancy test
    pub min_passages: u32,
    /// Longest alternative route, in edges, that makes a sparse edge redundant
    pub max_alternative_hops: usize,
    pub order: RedundancyOrder,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            min_passages: 3,
            max_alternative_hops: 5,
            order: RedundancyOrder::default(),
        }
    }
}

/// Counts reported after pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub nodes: usize,
    pub isolated_nodes: usize,
    pub edges: usize,
    pub removed_by_direction: usize,
    pub removed_as_redundant: usize,
}

#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub network: TrafficNetwork,
    pub report: PruneReport,
}

fn direction_mismatch(network: &TrafficNetwork, connection: &Connection) -> bool {
    let (Some(from), Some(to)) = (network.node(connection.from), network.node(connection.to))
    else {
        return true;
    };
    match (from.course_after, to.course_before) {
        (Some(after), Some(before)) => {
            circular_distance(after, connection.bearing) > MAX_COURSE_DEVIATION
                && circular_distance(before, connection.bearing) > MAX_COURSE_DEVIATION
        }
        // Without course data the direction cannot be confirmed
        _ => true,
    }
}

/// Hop count of the shortest route from the source to the target of `edge`
/// that avoids every edge in `removed`, bounded by `max_hops`
fn alternative_hops(
    network: &TrafficNetwork,
    edge: EdgeIndex,
    removed: &FixedBitSet,
    max_hops: usize,
) -> Option<usize> {
    let graph = network.graph();
    let (start, target) = graph.edge_endpoints(edge)?;
    let mut visited = FixedBitSet::with_capacity(graph.node_count());
    let mut queue = VecDeque::new();
    visited.insert(start.index());
    queue.push_back((start, 0));
    while let Some((node, depth)) = queue.pop_front() {
        if node == target {
            return Some(depth);
        }
        if depth == max_hops {
            continue;
        }
        for next in graph.edges(node) {
            if next.id() == edge || removed.contains(next.id().index()) {
                continue;
            }
            let target_node = next.target();
            if !visited.contains(target_node.index()) {
                visited.insert(target_node.index());
                queue.push_back((target_node, depth + 1));
            }
        }
    }
    None
}

/// Produces a pruned snapshot from `network`, nodes are never removed
///
/// # Errors
///
/// Returns `InvalidConfig` if `max_alternative_hops` is zero
pub fn prune_network(
    network: &TrafficNetwork,
    config: &PruneConfig,
) -> Result<PruneOutcome, Error> {
    if config.max_alternative_hops == 0 {
        return Err(Error::InvalidConfig(
            "max_alternative_hops must be positive".to_string(),
        ));
    }
    let graph = network.graph();
    let mut marked = FixedBitSet::with_capacity(graph.edge_count());

    for edge in graph.edge_references() {
        if direction_mismatch(network, edge.weight()) {
            marked.insert(edge.id().index());
        }
    }
    let removed_by_direction = marked.count_ones(..);

    // Working copy for the reachability tests; direction marks are not part of it
    let mut removed = FixedBitSet::with_capacity(graph.edge_count());
    for edge in graph.edge_indices() {
        if marked.contains(edge.index()) || graph[edge].passages >= config.min_passages {
            continue;
        }
        if config.order == RedundancyOrder::Sequential {
            removed.insert(edge.index());
        }
        if alternative_hops(network, edge, &removed, config.max_alternative_hops).is_some() {
            marked.insert(edge.index());
        }
    }
    let removed_as_redundant = marked.count_ones(..) - removed_by_direction;

    let pruned = network.filter_connections(SnapshotKind::Pruned, |edge, _| {
        !marked.contains(edge.index())
    });
    let report = PruneReport {
        nodes: pruned.node_count(),
        isolated_nodes: pruned.isolated_count(),
        edges: pruned.edge_count(),
        removed_by_direction,
        removed_as_redundant,
    };
    info!(
        "Pruned {} network: {} nodes ({} isolated), {} of {} edges kept \
         ({} against traffic direction, {} redundant)",
        network.kind(),
        report.nodes,
        report.isolated_nodes,
        report.edges,
        network.edge_count(),
        removed_by_direction,
        removed_as_redundant
    );

    Ok(PruneOutcome {
        network: pruned,
        report,
    })
}
