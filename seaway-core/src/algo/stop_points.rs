//! Consolidation of overlapping stop points

use std::collections::BTreeMap;

use geo::{ConvexHull, Intersects, MultiPoint, Point};
use hashbrown::HashMap;
use log::info;
use petgraph::unionfind::UnionFind;

use crate::{
    Error, WaypointId,
    geometry::circular_mean,
    model::{Connection, NetworkNode, SnapshotKind, TrafficNetwork, Waypoint, WaypointTable},
};

/// Waypoint table and raw snapshot after stop points were merged
#[derive(Debug, Clone)]
pub struct MergedStopPoints {
    pub waypoints: WaypointTable,
    pub network: TrafficNetwork,
    /// Waypoints absorbed into another stop point
    pub absorbed: usize,
}

#[allow(clippy::cast_precision_loss)]
fn merge_group(members: &[&Waypoint]) -> Option<Waypoint> {
    let survivor = members.iter().min_by_key(|wp| wp.id)?;
    let hull_points: MultiPoint<f64> = members
        .iter()
        .flat_map(|wp| wp.convex_hull.exterior().0.iter().map(|c| Point::from(*c)))
        .collect();
    Some(Waypoint {
        speed: members.iter().map(|wp| wp.speed).sum::<f64>() / members.len() as f64,
        course_before: circular_mean(members.iter().filter_map(|wp| wp.course_before)),
        course_after: circular_mean(members.iter().filter_map(|wp| wp.course_after)),
        n_members: members.iter().map(|wp| wp.n_members).sum(),
        convex_hull: hull_points.convex_hull(),
        ..(*survivor).clone()
    })
}

/// Merges stop points (mean speed below `max_speed`) whose hulls overlap
///
/// Overlap is transitive. A merged stop point keeps the lowest contributing id
/// and that waypoint's position. Edges are re-targeted to the surviving ids,
/// coinciding edges add up their passages and resulting self-loops are dropped.
///
/// # Errors
///
/// Returns an error if `network` references waypoints missing from `waypoints`
pub fn merge_stop_points(
    waypoints: &WaypointTable,
    network: &TrafficNetwork,
    max_speed: f64,
) -> Result<MergedStopPoints, Error> {
    let all: Vec<&Waypoint> = waypoints.iter().collect();
    let stops: Vec<usize> = (0..all.len())
        .filter(|&i| all[i].is_stop(max_speed))
        .collect();

    let mut groups = UnionFind::<usize>::new(all.len());
    for (n, &i) in stops.iter().enumerate() {
        for &j in &stops[n + 1..] {
            if all[i].convex_hull.intersects(&all[j].convex_hull) {
                groups.union(i, j);
            }
        }
    }

    let mut members: BTreeMap<usize, Vec<&Waypoint>> = BTreeMap::new();
    for &i in &stops {
        members.entry(groups.find(i)).or_default().push(all[i]);
    }

    // Surviving id for every absorbed waypoint
    let mut survivor_of: HashMap<WaypointId, WaypointId> = HashMap::new();
    let mut merged: HashMap<WaypointId, Waypoint> = HashMap::new();
    for group in members.values().filter(|group| group.len() > 1) {
        if let Some(waypoint) = merge_group(group) {
            for member in group {
                survivor_of.insert(member.id, waypoint.id);
            }
            merged.insert(waypoint.id, waypoint);
        }
    }

    let resolve = |id: WaypointId| survivor_of.get(&id).copied().unwrap_or(id);
    let table = WaypointTable::new(
        all.iter()
            .filter(|wp| resolve(wp.id) == wp.id)
            .map(|wp| merged.remove(&wp.id).unwrap_or_else(|| (*wp).clone()))
            .collect(),
    )?;

    let mut passages: BTreeMap<(WaypointId, WaypointId), u32> = BTreeMap::new();
    for connection in network.connections() {
        let (from, to) = (resolve(connection.from), resolve(connection.to));
        if from != to {
            *passages.entry((from, to)).or_insert(0) += connection.passages;
        }
    }
    let connections = passages
        .into_iter()
        .map(|((from, to), count)| {
            let from = NetworkNode::from(table.try_get(from)?);
            let to = NetworkNode::from(table.try_get(to)?);
            Ok(Connection::straight(&from, &to, count))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let network = TrafficNetwork::from_waypoints(SnapshotKind::Raw, &table, connections)?;

    let absorbed = waypoints.len() - table.len();
    info!(
        "Merged stop points: {} waypoints absorbed, {} waypoints and {} edges remain",
        absorbed,
        table.len(),
        network.edge_count()
    );
    Ok(MergedStopPoints {
        waypoints: table,
        network,
        absorbed,
    })
}
