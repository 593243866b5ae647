//! Hop-count searches and bounded path enumeration used by the matcher

use std::collections::VecDeque;

use hashbrown::HashMap;
use petgraph::{algo::all_simple_paths, graph::NodeIndex};

use crate::{WaypointId, model::TrafficNetwork};

/// Breadth-first hop distances from `start`
fn hop_distances(network: &TrafficNetwork, start: NodeIndex) -> HashMap<NodeIndex, usize> {
    let graph = network.graph();
    let mut distances = HashMap::new();
    let mut queue = VecDeque::new();
    distances.insert(start, 0);
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        let depth = distances[&node];
        for next in graph.neighbors(node) {
            if !distances.contains_key(&next) {
                distances.insert(next, depth + 1);
                queue.push_back(next);
            }
        }
    }
    distances
}

/// Path with the fewest edges, `None` if unreachable
pub fn shortest_hop_path(
    network: &TrafficNetwork,
    from: WaypointId,
    to: WaypointId,
) -> Option<Vec<WaypointId>> {
    all_shortest_paths(network, from, to).into_iter().next()
}

/// Every path with the minimum number of edges between two waypoints
pub fn all_shortest_paths(
    network: &TrafficNetwork,
    from: WaypointId,
    to: WaypointId,
) -> Vec<Vec<WaypointId>> {
    let (Some(start), Some(target)) = (network.index_of(from), network.index_of(to)) else {
        return Vec::new();
    };
    let distances = hop_distances(network, start);
    let Some(&depth) = distances.get(&target) else {
        return Vec::new();
    };

    // Extend partial paths forward along edges that stay on a shortest layer
    let graph = network.graph();
    let to_target = reverse_hop_distances(network, target, depth);
    let mut paths = Vec::new();
    let mut stack = vec![vec![start]];
    while let Some(partial) = stack.pop() {
        let Some(&last) = partial.last() else {
            continue;
        };
        if last == target {
            paths.push(partial.iter().map(|&idx| network.id_of(idx)).collect());
            continue;
        }
        let steps = partial.len();
        let mut successors: Vec<NodeIndex> = graph
            .neighbors(last)
            .filter(|next| to_target.get(next).is_some_and(|&d| steps + d == depth))
            .collect();
        // Reverse so that lower indices are expanded first
        successors.sort_unstable_by(|a, b| b.cmp(a));
        successors.dedup();
        for next in successors {
            let mut extended = partial.clone();
            extended.push(next);
            stack.push(extended);
        }
    }
    paths
}

/// Hop distances to `target` along reversed edges, limited to `max_depth`
fn reverse_hop_distances(
    network: &TrafficNetwork,
    target: NodeIndex,
    max_depth: usize,
) -> HashMap<NodeIndex, usize> {
    let graph = network.graph();
    let mut distances = HashMap::new();
    let mut queue = VecDeque::new();
    distances.insert(target, 0);
    queue.push_back(target);
    while let Some(node) = queue.pop_front() {
        let depth = distances[&node];
        if depth == max_depth {
            continue;
        }
        for prev in graph.neighbors_directed(node, petgraph::Direction::Incoming) {
            if !distances.contains_key(&prev) {
                distances.insert(prev, depth + 1);
                queue.push_back(prev);
            }
        }
    }
    distances
}

/// Lazily enumerates simple paths with at most `max_hops` edges
pub fn simple_paths<'a>(
    network: &'a TrafficNetwork,
    from: WaypointId,
    to: WaypointId,
    max_hops: usize,
) -> Box<dyn Iterator<Item = Vec<WaypointId>> + 'a> {
    match (network.index_of(from), network.index_of(to)) {
        (Some(start), Some(target)) if max_hops > 0 && start != target => Box::new(
            all_simple_paths::<Vec<NodeIndex>, _>(
                network.graph(),
                start,
                target,
                0,
                Some(max_hops - 1),
            )
            .map(|path| path.into_iter().map(|idx| network.id_of(idx)).collect()),
        ),
        _ => Box::new(std::iter::empty()),
    }
}

/// Simple paths of at most `l_max` edges, reducing the bound until no more than
/// `k_max` alternatives remain
pub fn bounded_simple_paths(
    network: &TrafficNetwork,
    from: WaypointId,
    to: WaypointId,
    l_max: usize,
    k_max: usize,
) -> Vec<Vec<WaypointId>> {
    let mut cutoff = l_max;
    while cutoff > 1 && simple_paths(network, from, to, cutoff).take(k_max + 1).count() > k_max {
        cutoff -= 1;
        log::trace!("Too many alternatives between {from} and {to}, cutoff reduced to {cutoff}");
    }
    simple_paths(network, from, to, cutoff).collect()
}
