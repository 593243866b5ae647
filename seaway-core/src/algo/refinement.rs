//! Edge statistics recomputed from a labeled set of matched paths

use log::{info, warn};
use serde::Serialize;

use crate::{
    CROSS_TRACK_SAMPLES, VesselId, WaypointId,
    geometry::{curve_length, interpolate_points, signed_distance_to_line},
    model::{Connection, EdgeStatistics, SnapshotKind, TrafficNetwork, Trajectory},
};

/// A validated walk through the network together with the trajectory it was matched from
#[derive(Debug, Clone, Copy)]
pub struct LabeledPath<'a> {
    pub vessel_id: VesselId,
    pub path: &'a [WaypointId],
    pub trajectory: &'a Trajectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefinementReport {
    pub paths: usize,
    pub edges: usize,
    /// Edges never traversed by the labeled paths
    pub removed: usize,
    /// Path steps without a matching edge in the base network
    pub skipped_steps: usize,
}

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub network: TrafficNetwork,
    pub report: RefinementReport,
}

#[derive(Default)]
struct EdgeAccumulator {
    passages: u32,
    speeds: Vec<f64>,
    cross_track: Vec<f64>,
}

/// Transit speed along a trajectory sub-segment, zero when no time elapses
fn transit_speed(trajectory: &Trajectory, start: usize, end: usize) -> f64 {
    let elapsed = trajectory.elapsed_seconds(start, end);
    if elapsed <= 0.0 {
        return 0.0;
    }
    curve_length(&trajectory.sub_curve(start, end)) / elapsed
}

/// Rebuilds passage counts and per-edge speed and cross-track distributions
///
/// Every edge of `base` starts at zero passages; edges that none of the paths
/// traverse are removed from the refined snapshot. The accumulation runs
/// sequentially because all paths write into the same per-edge buffers.
pub fn refine_network(base: &TrafficNetwork, paths: &[LabeledPath<'_>]) -> RefinementOutcome {
    let graph = base.graph();
    let mut accumulators: Vec<EdgeAccumulator> = (0..graph.edge_count())
        .map(|_| EdgeAccumulator::default())
        .collect();
    let mut skipped_steps = 0;

    for labeled in paths {
        let trajectory = labeled.trajectory;
        for step in labeled.path.windows(2) {
            let (u, v) = (step[0], step[1]);
            let Some(edge) = base.edge_index(u, v) else {
                warn!(
                    "Path of vessel {} steps from {u} to {v} without a connection, step ignored",
                    labeled.vessel_id
                );
                skipped_steps += 1;
                continue;
            };
            let (Some(from), Some(to)) = (base.node(u), base.node(v)) else {
                continue;
            };
            let start = trajectory.closest_index(from.position);
            let end = trajectory.closest_index(to.position);

            let accumulator = &mut accumulators[edge.index()];
            accumulator.passages += 1;
            accumulator
                .speeds
                .push(transit_speed(trajectory, start, end));

            let segment = trajectory.sub_curve(start, end);
            let geometry = &graph[edge].geometry;
            accumulator.cross_track.extend(
                interpolate_points(&segment, CROSS_TRACK_SAMPLES)
                    .iter()
                    .map(|p| signed_distance_to_line(geometry, p)),
            );
        }
    }

    let mut removed = 0;
    let mut refined: Vec<Option<Connection>> = graph
        .edge_indices()
        .zip(accumulators)
        .map(|(edge, accumulator)| {
            if accumulator.passages == 0 {
                removed += 1;
                return None;
            }
            let mut connection = graph[edge].clone();
            connection.set_passages(accumulator.passages);
            connection.statistics = Some(EdgeStatistics::from_samples(
                accumulator.speeds,
                accumulator.cross_track,
            ));
            Some(connection)
        })
        .collect();

    let network = base.map_connections(SnapshotKind::Refined, |edge, _| {
        refined.get_mut(edge.index()).and_then(Option::take)
    });

    let report = RefinementReport {
        paths: paths.len(),
        edges: network.edge_count(),
        removed,
        skipped_steps,
    };
    info!(
        "Refined network from {} paths: {} edges kept, {} never traversed",
        report.paths, report.edges, report.removed
    );
    RefinementOutcome { network, report }
}
