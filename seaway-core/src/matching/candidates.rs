//! Scoring of alternative sub-paths against a trajectory section

use geo::{LineString, Point};

use super::MatchFailure;
use crate::{
    WaypointId,
    algo::sspd::sspd,
    geometry::{curve_length, interpolate_points, merge_lines, point_to_curve_distance},
    model::{TrafficNetwork, Trajectory},
};

/// Trajectory samples `start..=end` as points
pub(crate) fn sample_points(trajectory: &Trajectory, start: usize, end: usize) -> Vec<Point<f64>> {
    trajectory
        .points()
        .get(start..=end)
        .map(|samples| samples.iter().map(|p| p.position).collect())
        .unwrap_or_default()
}

/// Merged geometry of a walk through `network`
pub(crate) fn walk_geometry(
    network: &TrafficNetwork,
    path: &[WaypointId],
) -> Result<LineString<f64>, MatchFailure> {
    Ok(merge_lines(network.path_geometry(path)?))
}

/// SSPD between a trajectory section and a candidate geometry, scaled by
/// `max(candidate_length / section_length, 1)` so detours score worse
///
/// A section made of a single sample is scored by its distance to the candidate.
pub fn score_candidate(
    section: &LineString<f64>,
    section_points: &[Point<f64>],
    candidate: &LineString<f64>,
) -> f64 {
    if let [point] = section_points {
        return point_to_curve_distance(point, candidate);
    }
    let candidate_points = interpolate_points(candidate, section_points.len());
    let similarity = sspd(section, section_points, candidate, &candidate_points).value;
    let section_length = curve_length(section);
    let penalty = if section_length > f64::EPSILON {
        (curve_length(candidate) / section_length).max(1.0)
    } else {
        1.0
    };
    similarity * penalty
}

/// Candidate with the lowest score, the first one wins on ties
pub(crate) fn best_candidate(
    network: &TrafficNetwork,
    trajectory: &Trajectory,
    start: usize,
    end: usize,
    candidates: impl IntoIterator<Item = Vec<WaypointId>>,
) -> Result<Option<Vec<WaypointId>>, MatchFailure> {
    let section = trajectory.sub_curve(start, end);
    let section_points = sample_points(trajectory, start, end);

    let mut best: Option<(f64, Vec<WaypointId>)> = None;
    for candidate in candidates {
        let geometry = walk_geometry(network, &candidate)?;
        let score = score_candidate(&section, &section_points, &geometry);
        log::trace!("Candidate {candidate:?} scored {score:.3}");
        if best.as_ref().is_none_or(|(lowest, _)| score < *lowest) {
            best = Some((score, candidate));
        }
    }
    Ok(best.map(|(_, path)| path))
}
