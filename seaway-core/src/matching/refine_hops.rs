//! Hop-skipping pass over a stitched path

use super::{
    MatchFailure,
    candidates::{sample_points, walk_geometry},
};
use crate::{
    WaypointId,
    algo::sspd::sspd,
    geometry::{curve_length, interpolate_points},
    model::{TrafficNetwork, Trajectory},
};

/// Mean of the point-to-curve distances and length of one hop
fn hop_fit(
    channel: &TrafficNetwork,
    trajectory: &Trajectory,
    from: WaypointId,
    to: WaypointId,
) -> Result<(Vec<f64>, f64), MatchFailure> {
    let position = |id| {
        channel
            .node(id)
            .map(|n| trajectory.closest_index(n.position))
            .ok_or(MatchFailure::UnknownWaypoint(id))
    };
    let (a, b) = (position(from)?, position(to)?);
    let (start, end) = (a.min(b), a.max(b));

    let section = trajectory.sub_curve(start, end);
    let section_points = sample_points(trajectory, start, end);
    let edge = walk_geometry(channel, &[from, to])?;
    let edge_points = interpolate_points(&edge, section_points.len());
    let fit = sspd(&section, &section_points, &edge, &edge_points);
    Ok((fit.distances(), curve_length(&edge)))
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Scans `(A, B, C)` triples and replaces `A -> B -> C` by the direct
/// connection `A -> C` when its length-weighted mean distance to the
/// trajectory is lower
pub(crate) fn skip_hops(
    channel: &TrafficNetwork,
    trajectory: &Trajectory,
    path: &[WaypointId],
) -> Result<Vec<WaypointId>, MatchFailure> {
    let Some((&first, &last)) = path.first().zip(path.last()) else {
        return Ok(Vec::new());
    };
    let mut refined = vec![first];
    let mut skipped = false;
    for triple in path.windows(3) {
        if skipped {
            skipped = false;
            continue;
        }
        let (a, b, c) = (triple[0], triple[1], triple[2]);
        if channel.connection(a, c).is_none() {
            refined.push(b);
            continue;
        }

        let (mut via_b, ab_length) = hop_fit(channel, trajectory, a, b)?;
        let (bc, bc_length) = hop_fit(channel, trajectory, b, c)?;
        via_b.extend(bc);
        let (direct, ac_length) = hop_fit(channel, trajectory, a, c)?;

        if mean(&via_b) * (ab_length + bc_length) > mean(&direct) * ac_length {
            log::debug!("Skipping waypoint {b} between {a} and {c}");
            refined.push(c);
            skipped = true;
        } else {
            refined.push(b);
        }
    }
    if refined.last() != Some(&last) {
        refined.push(last);
    }
    Ok(refined)
}
