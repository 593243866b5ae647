//! Endpoint and waypoint-passage detection shared by the graph builder and the matcher

use geo::{BoundingRect, Line};
use hashbrown::HashSet;
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    Error, WaypointId,
    geometry::{self, bearing, circular_distance},
    model::{TrafficNetwork, Trajectory, Waypoint, WaypointTable},
};

/// Endpoint detection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Mean speed below which a trajectory end is considered stationary
    pub stop_speed: f64,
    /// Maximum circular deviation between waypoint course and trajectory bearing
    pub course_tolerance: f64,
    /// Number of samples averaged for the endpoint speed
    pub speed_window: usize,
    /// Bearing look-ahead for moving endpoints, in samples
    pub short_window: usize,
    /// Bearing look-ahead for stationary endpoints, in samples
    pub long_window: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            stop_speed: 2.0,
            course_tolerance: 45.0,
            speed_window: 5,
            short_window: 9,
            long_window: 40,
        }
    }
}

impl LocatorConfig {
    /// Smallest windows that still yield a bearing
    fn minimal(&self) -> Self {
        Self {
            speed_window: 2,
            short_window: 1,
            long_window: 1,
            ..self.clone()
        }
    }
}

/// Passage detection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PassageConfig {
    /// Maximum distance between a trajectory segment and a waypoint hull
    pub max_distance: f64,
    /// Maximum deviation between segment bearing and both waypoint courses
    pub max_angle: f64,
    /// Douglas-Peucker tolerance applied to the trajectory before testing segments
    pub simplify_tolerance: Option<f64>,
}

impl Default for PassageConfig {
    fn default() -> Self {
        Self::for_builder()
    }
}

impl PassageConfig {
    pub fn for_builder() -> Self {
        Self {
            max_distance: 10.0,
            max_angle: 45.0,
            simplify_tolerance: None,
        }
    }

    pub fn for_matching() -> Self {
        Self {
            max_distance: 50.0,
            max_angle: 30.0,
            simplify_tolerance: Some(10.0),
        }
    }
}

/// Waypoint chosen for a trajectory endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointCandidate {
    pub waypoint: WaypointId,
    /// Distance between the trajectory endpoint and the waypoint centroid
    pub distance: f64,
    /// Index of the trajectory sample closest to the waypoint centroid
    pub index: usize,
}

/// Passed waypoints and the channel graph around a trajectory
#[derive(Debug, Clone)]
pub struct Intersections {
    pub passages: Vec<WaypointId>,
    pub channel: TrafficNetwork,
}

#[derive(Clone, Copy)]
enum End {
    Origin,
    Destination,
}

/// Finds the waypoint where the trajectory most likely starts
///
/// # Errors
///
/// Returns an error when even the minimal two-sample window cannot produce a candidate
pub fn find_origin(
    trajectory: &Trajectory,
    waypoints: &WaypointTable,
    config: &LocatorConfig,
) -> Result<EndpointCandidate, Error> {
    find_endpoint(trajectory, waypoints, config, End::Origin)
}

/// Finds the waypoint where the trajectory most likely ends
///
/// # Errors
///
/// Returns an error when even the minimal two-sample window cannot produce a candidate
pub fn find_destination(
    trajectory: &Trajectory,
    waypoints: &WaypointTable,
    config: &LocatorConfig,
) -> Result<EndpointCandidate, Error> {
    find_endpoint(trajectory, waypoints, config, End::Destination)
}

fn find_endpoint(
    trajectory: &Trajectory,
    waypoints: &WaypointTable,
    config: &LocatorConfig,
    end: End,
) -> Result<EndpointCandidate, Error> {
    locate_endpoint(trajectory, waypoints, config, end).or_else(|err| {
        log::debug!(
            "Endpoint heuristic failed for vessel {} ({err}), retrying with a minimal window",
            trajectory.vessel_id
        );
        locate_endpoint(trajectory, waypoints, &config.minimal(), end)
    })
}

fn locate_endpoint(
    trajectory: &Trajectory,
    waypoints: &WaypointTable,
    config: &LocatorConfig,
    end: End,
) -> Result<EndpointCandidate, Error> {
    let points = trajectory.points();
    let n = points.len();
    let window = config.speed_window.max(1);
    if n < window {
        return Err(Error::InsufficientSamples {
            needed: window,
            available: n,
        });
    }

    let speed = match end {
        End::Origin => trajectory.mean_speed(0..window)?,
        End::Destination => trajectory.mean_speed(n - window..n)?,
    };
    let stationary = speed < config.stop_speed;
    let look = if stationary {
        config.long_window
    } else {
        config.short_window
    };
    if look == 0 || look >= n {
        return Err(Error::InsufficientSamples {
            needed: look + 1,
            available: n,
        });
    }

    // The endpoint itself and the sample `look` steps into the trajectory
    let (anchor, heading) = match end {
        End::Origin => {
            let anchor = &points[0];
            (anchor, bearing(anchor.geographic(), points[look].geographic()))
        }
        End::Destination => {
            let anchor = &points[n - 1];
            (
                anchor,
                bearing(points[n - 1 - look].geographic(), anchor.geographic()),
            )
        }
    };

    let course_matches = |wp: &Waypoint| {
        let course = match end {
            End::Origin => wp.course_after,
            End::Destination => wp.course_before,
        };
        course.is_some_and(|c| circular_distance(c, heading) < config.course_tolerance)
    };
    let is_stop = |wp: &Waypoint| wp.is_stop(config.stop_speed);

    let tiers: Vec<Vec<&Waypoint>> = if stationary {
        vec![
            waypoints
                .iter()
                .filter(|wp| is_stop(*wp) && course_matches(*wp))
                .collect(),
            waypoints.iter().filter(|wp| is_stop(*wp)).collect(),
            waypoints.iter().collect(),
        ]
    } else {
        vec![waypoints.iter().filter(|wp| course_matches(*wp)).collect()]
    };

    let candidates = tiers
        .into_iter()
        .find(|tier| !tier.is_empty())
        .ok_or(Error::NoCandidateWaypoints)?;

    let (waypoint, distance) = candidates
        .into_iter()
        .map(|wp| {
            let d = (wp.position.x() - anchor.position.x())
                .hypot(wp.position.y() - anchor.position.y());
            (wp, d)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(Error::NoCandidateWaypoints)?;

    Ok(EndpointCandidate {
        waypoint: waypoint.id,
        distance,
        index: trajectory.closest_index(waypoint.position),
    })
}

/// Ordered, de-duplicated waypoints passed by the trajectory
///
/// A segment passes a waypoint when it comes within `max_distance` of the
/// waypoint hull and its bearing deviates less than `max_angle` from both the
/// course before and the course after the waypoint. Waypoints passed by one
/// segment are ordered by their distance from the segment start; repeated
/// waypoints keep their first position.
pub fn find_passages(
    trajectory: &Trajectory,
    candidates: &[&Waypoint],
    config: &PassageConfig,
) -> Vec<WaypointId> {
    let points = trajectory.points();
    if points.len() < 2 || candidates.is_empty() {
        return Vec::new();
    }

    let vertices = match config.simplify_tolerance {
        Some(tolerance) => geometry::simplify_indices(&trajectory.line_string(), tolerance),
        None => (0..points.len()).collect(),
    };

    let mut passages = Vec::new();
    for (&i, &j) in vertices.iter().tuple_windows() {
        let (start, end) = (&points[i], &points[j]);
        let segment = Line::new(start.position.0, end.position.0);
        let heading = bearing(start.geographic(), end.geographic());

        let mut passed: Vec<(f64, WaypointId)> = candidates
            .iter()
            .filter(|wp| {
                let courses_match = matches!(
                    (wp.course_before, wp.course_after),
                    (Some(before), Some(after))
                        if circular_distance(before, heading) < config.max_angle
                            && circular_distance(after, heading) < config.max_angle
                );
                courses_match
                    && geometry::segment_to_hull_distance(&segment, &wp.convex_hull, wp.position)
                        < config.max_distance
            })
            .map(|wp| {
                let d = (wp.position.x() - start.position.x())
                    .hypot(wp.position.y() - start.position.y());
                (d, wp.id)
            })
            .collect();
        passed.sort_by(|a, b| a.0.total_cmp(&b.0));
        passages.extend(passed.into_iter().map(|(_, id)| id));
    }

    passages.into_iter().unique().collect()
}

/// Passages of a trajectory restricted to the channel graph of `network` around it
///
/// The channel graph is the subgraph induced by the waypoints whose centroid
/// lies within `buffer_radius` of the trajectory.
pub fn find_intersections(
    trajectory: &Trajectory,
    waypoints: &WaypointTable,
    network: &TrafficNetwork,
    buffer_radius: f64,
    config: &PassageConfig,
) -> Intersections {
    let curve = trajectory.line_string();
    let nearby: Vec<&Waypoint> = match curve.bounding_rect() {
        Some(bounds) => waypoints
            .within_bounds(bounds, buffer_radius)
            .into_iter()
            .filter(|wp| network.contains(wp.id))
            .filter(|wp| geometry::point_to_curve_distance(&wp.position, &curve) < buffer_radius)
            .collect(),
        None => Vec::new(),
    };

    let ids: HashSet<WaypointId> = nearby.iter().map(|wp| wp.id).collect();
    let channel = network.induced_subgraph(&ids);
    let passages = find_passages(trajectory, &nearby, config);

    Intersections { passages, channel }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use geo::{Point, polygon};

    use super::*;
    use crate::model::{SnapshotKind, TrajectoryPoint};

    const M_PER_DEG: f64 = 111_320.0;

    fn waypoint(id: WaypointId, x: f64, y: f64, speed: f64, course: f64) -> Waypoint {
        Waypoint {
            id,
            lat: y / M_PER_DEG,
            lon: x / M_PER_DEG,
            position: Point::new(x, y),
            speed,
            course_before: Some(course),
            course_after: Some(course),
            n_members: 20,
            convex_hull: polygon![
                (x: x - 20.0, y: y - 20.0),
                (x: x + 20.0, y: y - 20.0),
                (x: x + 20.0, y: y + 20.0),
                (x: x - 20.0, y: y + 20.0),
            ],
        }
    }

    fn eastbound(from: f64, to: f64, step: f64, speed: f64) -> Trajectory {
        let count = ((to - from) / step) as i64;
        let points = (0..=count)
            .map(|i| {
                let x = from + step * i as f64;
                TrajectoryPoint {
                    timestamp: DateTime::from_timestamp(i * 2, 0).unwrap(),
                    lat: 0.0,
                    lon: x / M_PER_DEG,
                    position: Point::new(x, 0.0),
                    speed,
                    course: 90.0,
                }
            })
            .collect();
        Trajectory::new(7, points).unwrap()
    }

    fn table() -> WaypointTable {
        WaypointTable::new(vec![
            waypoint(0, 0.0, 0.0, 10.0, 90.0),
            waypoint(1, 1000.0, 0.0, 10.0, 90.0),
            waypoint(2, 2000.0, 0.0, 10.0, 90.0),
            // Opposite flow next to the channel
            waypoint(3, 1500.0, 0.0, 10.0, 270.0),
            waypoint(4, 2000.0, 300.0, 0.5, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn moving_endpoints_follow_course() {
        let trajectory = eastbound(0.0, 2000.0, 20.0, 10.0);
        let origin = find_origin(&trajectory, &table(), &LocatorConfig::default()).unwrap();
        assert_eq!(origin.waypoint, 0);
        assert_eq!(origin.index, 0);
        assert!(origin.distance < 1e-9);

        let destination =
            find_destination(&trajectory, &table(), &LocatorConfig::default()).unwrap();
        assert_eq!(destination.waypoint, 2);
        assert_eq!(destination.index, trajectory.len() - 1);
    }

    #[test]
    fn stationary_end_prefers_stop_points() {
        let trajectory = eastbound(1900.0, 2000.0, 20.0, 0.5);
        let destination =
            find_destination(&trajectory, &table(), &LocatorConfig::default()).unwrap();
        assert_eq!(destination.waypoint, 4);
    }

    #[test]
    fn short_trajectory_uses_minimal_window() {
        let trajectory = eastbound(0.0, 40.0, 20.0, 10.0);
        let origin = find_origin(&trajectory, &table(), &LocatorConfig::default()).unwrap();
        assert_eq!(origin.waypoint, 0);
    }

    #[test]
    fn passages_respect_direction_and_order() {
        let trajectory = eastbound(-100.0, 2100.0, 20.0, 10.0);
        let wps = table();
        let candidates: Vec<&Waypoint> = wps.iter().collect();
        let passages = find_passages(&trajectory, &candidates, &PassageConfig::for_builder());
        assert_eq!(passages, vec![0, 1, 2]);
    }

    #[test]
    fn simplified_trajectory_orders_passages_within_a_segment() {
        let trajectory = eastbound(-100.0, 2100.0, 20.0, 10.0);
        let wps = table();
        let candidates: Vec<&Waypoint> = wps.iter().collect();
        let passages = find_passages(&trajectory, &candidates, &PassageConfig::for_matching());
        assert_eq!(passages, vec![0, 1, 2]);
    }

    #[test]
    fn channel_is_limited_to_buffer() {
        let wps = table();
        let network = TrafficNetwork::from_waypoints(SnapshotKind::Pruned, &wps, []).unwrap();
        let trajectory = eastbound(-100.0, 900.0, 20.0, 10.0);
        let found = find_intersections(
            &trajectory,
            &wps,
            &network,
            200.0,
            &PassageConfig::for_matching(),
        );
        assert_eq!(found.passages, vec![0]);
        assert_eq!(found.channel.node_count(), 2);
        assert!(found.channel.contains(1));
        assert!(!found.channel.contains(2));
    }
}
