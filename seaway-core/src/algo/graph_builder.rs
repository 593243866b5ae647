//! Raw network construction from waypoint passages

use std::collections::BTreeMap;

use itertools::Itertools;
use log::info;
use rayon::prelude::*;

use super::locator::{PassageConfig, find_passages};
use crate::{
    Error, WaypointId,
    model::{
        Connection, NetworkNode, SnapshotKind, TrafficNetwork, Trajectory, Waypoint,
        WaypointTable,
    },
};

/// Builds the raw network: one node per waypoint and one edge per ordered
/// waypoint pair observed consecutively in any trajectory's passages
///
/// # Errors
///
/// Returns an error if the waypoint table is inconsistent with the detected passages
pub fn build_network(
    waypoints: &WaypointTable,
    trajectories: &[Trajectory],
    config: &PassageConfig,
) -> Result<TrafficNetwork, Error> {
    let candidates: Vec<&Waypoint> = waypoints.iter().collect();

    let passage_sequences: Vec<Vec<WaypointId>> = trajectories
        .par_iter()
        .map(|trajectory| find_passages(trajectory, &candidates, config))
        .collect();

    // BTreeMap keeps the edge insertion order independent of thread scheduling
    let mut counts: BTreeMap<(WaypointId, WaypointId), u32> = BTreeMap::new();
    for passages in &passage_sequences {
        for (&from, &to) in passages.iter().tuple_windows() {
            if from != to {
                *counts.entry((from, to)).or_insert(0) += 1;
            }
        }
    }

    let mut connections = Vec::with_capacity(counts.len());
    for ((from, to), passages) in counts {
        let from = NetworkNode::from(waypoints.try_get(from)?);
        let to = NetworkNode::from(waypoints.try_get(to)?);
        connections.push(Connection::straight(&from, &to, passages));
    }

    let network = TrafficNetwork::from_waypoints(SnapshotKind::Raw, waypoints, connections)?;
    info!(
        "Built raw network from {} trajectories: {} nodes, {} edges",
        trajectories.len(),
        network.node_count(),
        network.edge_count()
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use geo::{Point, polygon};

    use super::*;
    use crate::model::TrajectoryPoint;

    const M_PER_DEG: f64 = 111_320.0;

    fn waypoint(id: WaypointId, x: f64) -> Waypoint {
        Waypoint {
            id,
            lat: 0.0,
            lon: x / M_PER_DEG,
            position: Point::new(x, 0.0),
            speed: 9.0,
            course_before: Some(90.0),
            course_after: Some(90.0),
            n_members: 12,
            convex_hull: polygon![
                (x: x - 15.0, y: -15.0),
                (x: x + 15.0, y: -15.0),
                (x: x + 15.0, y: 15.0),
                (x: x - 15.0, y: 15.0),
            ],
        }
    }

    fn eastbound(vessel: u64, from: f64, to: f64) -> Trajectory {
        let points = (0..=((to - from) / 25.0) as i64)
            .map(|i| {
                let x = from + 25.0 * i as f64;
                TrajectoryPoint {
                    timestamp: DateTime::from_timestamp(i * 3, 0).unwrap(),
                    lat: 0.0,
                    lon: x / M_PER_DEG,
                    position: Point::new(x, 0.0),
                    speed: 8.0,
                    course: 90.0,
                }
            })
            .collect();
        Trajectory::new(vessel, points).unwrap()
    }

    #[test]
    fn passages_become_weighted_edges() {
        let table =
            WaypointTable::new((0..4).map(|i| waypoint(i, 500.0 * i as f64)).collect()).unwrap();
        let trajectories = vec![
            eastbound(1, -50.0, 1050.0),
            eastbound(2, -50.0, 1550.0),
            eastbound(3, 450.0, 1550.0),
        ];
        let network = build_network(&table, &trajectories, &PassageConfig::for_builder()).unwrap();

        assert_eq!(network.kind(), SnapshotKind::Raw);
        assert_eq!(network.node_count(), 4);
        assert_eq!(network.connection(0, 1).unwrap().passages, 2);
        assert_eq!(network.connection(1, 2).unwrap().passages, 3);
        assert_eq!(network.connection(2, 3).unwrap().passages, 2);
        assert!(network.connection(0, 2).is_none());
        for connection in network.connections() {
            assert_ne!(connection.from, connection.to);
            assert!(connection.passages >= 1);
            let expected = 1.0 / f64::from(connection.passages);
            assert!((connection.inverse_weight - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn unvisited_waypoints_stay_as_isolated_nodes() {
        let mut waypoints: Vec<_> = (0..2).map(|i| waypoint(i, 500.0 * i as f64)).collect();
        waypoints.push(waypoint(9, 5000.0));
        let table = WaypointTable::new(waypoints).unwrap();
        let network =
            build_network(&table, &[eastbound(1, -50.0, 550.0)], &PassageConfig::for_builder())
                .unwrap();
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 1);
        assert_eq!(network.isolated_count(), 1);
    }
}
