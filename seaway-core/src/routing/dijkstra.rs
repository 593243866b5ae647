use std::{cmp::Ordering, collections::BinaryHeap};

use hashbrown::HashMap;
use petgraph::{graph::NodeIndex, visit::EdgeRef};
use serde::{Deserialize, Serialize};

use crate::{
    Error, WaypointId,
    model::{Connection, TrafficNetwork},
};

/// Edge attribute used as traversal cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeight {
    /// `1 / passages`, busier edges are cheaper
    #[default]
    InverseWeight,
    /// Geometric length
    Length,
    /// Every edge costs one
    Hops,
}

impl EdgeWeight {
    pub fn cost(self, connection: &Connection) -> f64 {
        match self {
            EdgeWeight::InverseWeight => connection.inverse_weight,
            EdgeWeight::Length => connection.length,
            EdgeWeight::Hops => 1.0,
        }
    }
}

impl std::str::FromStr for EdgeWeight {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inverse_weight" => Ok(EdgeWeight::InverseWeight),
            "length" => Ok(EdgeWeight::Length),
            "hops" => Ok(EdgeWeight::Hops),
            other => Err(Error::InvalidConfig(format!(
                "unsupported weight field '{other}'"
            ))),
        }
    }
}

/// Result of a shortest path search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortestPath {
    pub nodes: Vec<WaypointId>,
    pub cost: f64,
}

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    node: NodeIndex,
}

impl Eq for State {}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap)
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra's algorithm between two waypoints of a snapshot
///
/// # Errors
///
/// Returns `UnknownWaypoint` if either id is not a node and `Unreachable`
/// if no path exists
pub fn shortest_path(
    network: &TrafficNetwork,
    origin: WaypointId,
    destination: WaypointId,
    weight: EdgeWeight,
) -> Result<ShortestPath, Error> {
    let start = network.try_index_of(origin)?;
    let target = network.try_index_of(destination)?;
    let graph = network.graph();

    let estimated_nodes = graph.node_count().min(1000);
    let mut distances: HashMap<NodeIndex, f64> = HashMap::with_capacity(estimated_nodes);
    let mut predecessors: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(estimated_nodes);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    heap.push(State {
        cost: 0.0,
        node: start,
    });
    distances.insert(start, 0.0);

    while let Some(State { cost, node }) = heap.pop() {
        if node == target {
            break;
        }

        // Skip if we've found a better path
        if distances.get(&node).is_some_and(|&best| cost > best) {
            continue;
        }

        for edge in graph.edges(node) {
            let next = edge.target();
            let next_cost = cost + weight.cost(edge.weight());

            match distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                    predecessors.insert(next, node);
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                        predecessors.insert(next, node);
                    }
                }
            }
        }
    }

    let Some(&cost) = distances.get(&target) else {
        return Err(Error::Unreachable {
            from: origin,
            to: destination,
        });
    };

    let mut nodes = vec![network.id_of(target)];
    let mut current = target;
    while current != start {
        let Some(&prev) = predecessors.get(&current) else {
            break;
        };
        nodes.push(network.id_of(prev));
        current = prev;
    }
    nodes.reverse();

    Ok(ShortestPath { nodes, cost })
}
