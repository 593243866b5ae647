//! Synthetic channels in a local metric frame near the equator, where
//! haversine bearings on `lon/lat` equal the planar bearings on `x/y`.

#![allow(dead_code)]

use chrono::{DateTime, Duration};
use geo::{Point, polygon};
use seaway_core::prelude::*;

pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub const A: WaypointId = 0;
pub const B: WaypointId = 1;
pub const C: WaypointId = 2;
pub const D: WaypointId = 3;

/// Waypoint at `(x, y)` with a square hull of half-width 30 m
pub fn waypoint(id: WaypointId, x: f64, y: f64, course: f64) -> Waypoint {
    let half = 30.0;
    Waypoint {
        id,
        lat: y / METERS_PER_DEGREE,
        lon: x / METERS_PER_DEGREE,
        position: Point::new(x, y),
        speed: 10.0,
        course_before: Some(course),
        course_after: Some(course),
        n_members: 20,
        convex_hull: polygon![
            (x: x - half, y: y - half),
            (x: x + half, y: y - half),
            (x: x + half, y: y + half),
            (x: x - half, y: y + half),
        ],
    }
}

/// A, B and C on an eastbound line 1 km apart, D far off to the north
pub fn eastbound_waypoints() -> WaypointTable {
    WaypointTable::new(vec![
        waypoint(A, 0.0, 0.0, 90.0),
        waypoint(B, 1000.0, 0.0, 90.0),
        waypoint(C, 2000.0, 0.0, 90.0),
        waypoint(D, 1000.0, 5000.0, 90.0),
    ])
    .unwrap()
}

/// Straight connection between two waypoints of `table`
pub fn connection(
    table: &WaypointTable,
    from: WaypointId,
    to: WaypointId,
    passages: u32,
) -> Connection {
    let from = NetworkNode::from(table.try_get(from).unwrap());
    let to = NetworkNode::from(table.try_get(to).unwrap());
    Connection::straight(&from, &to, passages)
}

/// Network over `table` with straight edges `(from, to, passages)`
pub fn network(
    kind: SnapshotKind,
    table: &WaypointTable,
    edges: &[(WaypointId, WaypointId, u32)],
) -> TrafficNetwork {
    let connections: Vec<Connection> = edges
        .iter()
        .map(|&(from, to, passages)| connection(table, from, to, passages))
        .collect();
    TrafficNetwork::from_waypoints(kind, table, connections).unwrap()
}

/// Trajectory sampled every `step` metres along the polyline `vertices`,
/// moving at 10 kn with one sample every 10 s
pub fn trajectory(vessel_id: VesselId, vertices: &[(f64, f64)], step: f64) -> Trajectory {
    let mut positions = vec![vertices[0]];
    for pair in vertices.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        let length = (x1 - x0).hypot(y1 - y0);
        let count = (length / step).round().max(1.0) as usize;
        for i in 1..=count {
            let t = i as f64 / count as f64;
            positions.push((x0 + t * (x1 - x0), y0 + t * (y1 - y0)));
        }
    }

    let start = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
    let points = positions
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let course = positions
                .get(i + 1)
                .or(positions.get(i.wrapping_sub(1)))
                .map_or(90.0, |&(nx, ny)| {
                    let (dx, dy) = if i + 1 < positions.len() {
                        (nx - x, ny - y)
                    } else {
                        (x - nx, y - ny)
                    };
                    dx.atan2(dy).to_degrees().rem_euclid(360.0)
                });
            TrajectoryPoint {
                timestamp: start + Duration::seconds(10 * i as i64),
                lat: y / METERS_PER_DEGREE,
                lon: x / METERS_PER_DEGREE,
                position: Point::new(x, y),
                speed: 10.0,
                course,
            }
        })
        .collect();
    Trajectory::new(vessel_id, points).unwrap()
}

/// Eastbound run from A to C along the x axis
pub fn eastbound_run(vessel_id: VesselId) -> Trajectory {
    trajectory(vessel_id, &[(0.0, 0.0), (2000.0, 0.0)], 50.0)
}
