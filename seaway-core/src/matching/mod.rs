//! Trajectory-to-path matching
//!
//! A trajectory is mapped onto the walk through a pruned network snapshot that
//! minimises the SSPD to the trajectory. Every trajectory ends in exactly one
//! of four outcomes; failures never escape as errors so batches can run to
//! completion.

pub mod candidates;
pub mod evaluation;
mod refine_hops;

use std::{fmt, str::FromStr};

use geo::LineString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wkt::ToWkt;

use crate::{
    Error, VesselId, WaypointId,
    algo::{
        LabeledPath,
        locator::{
            EndpointCandidate, LocatorConfig, PassageConfig, find_destination,
            find_intersections, find_origin,
        },
        sspd::sspd,
    },
    geometry::{curve_length, interpolate_points, merge_lines},
    model::{TrafficNetwork, Trajectory, WaypointTable},
    routing::{
        EdgeWeight, all_shortest_paths, bounded_simple_paths, shortest_hop_path, shortest_path,
    },
};

use candidates::{best_candidate, sample_points};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAlgorithm {
    #[default]
    Standard,
    /// Standard matching followed by the hop-skipping pass
    Refined,
}

impl FromStr for MatchAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(MatchAlgorithm::Standard),
            "refined" => Ok(MatchAlgorithm::Refined),
            other => Err(Error::InvalidConfig(format!(
                "unsupported matching algorithm '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Maximum number of alternative sub-paths scored per passage pair
    pub k_max: usize,
    /// Maximum sub-path length in edges
    pub l_max: usize,
    pub algorithm: MatchAlgorithm,
    /// Radius of the channel graph around the trajectory
    pub buffer_radius: f64,
    /// Endpoint waypoints further away are not spliced into the passages
    pub endpoint_max_distance: f64,
    /// Passage pairs this close in samples only consider shortest paths
    pub close_index_span: usize,
    pub locator: LocatorConfig,
    pub passages: PassageConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            k_max: 500,
            l_max: 5,
            algorithm: MatchAlgorithm::default(),
            buffer_radius: 1000.0,
            endpoint_max_distance: 100.0,
            close_index_span: 3,
            locator: LocatorConfig::default(),
            passages: PassageConfig::for_matching(),
        }
    }
}

impl MatchConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero search bounds or non-positive distances
    pub fn validate(&self) -> Result<(), Error> {
        if self.k_max == 0 || self.l_max == 0 {
            return Err(Error::InvalidConfig(
                "k_max and l_max must be positive".to_string(),
            ));
        }
        let distances = [
            ("buffer_radius", self.buffer_radius),
            ("endpoint_max_distance", self.endpoint_max_distance),
            ("passages.max_distance", self.passages.max_distance),
            ("passages.max_angle", self.passages.max_angle),
            ("locator.course_tolerance", self.locator.course_tolerance),
        ];
        for (name, value) in distances {
            if value.is_nan() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// Outcome tag of a matched trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Success,
    Attempt,
    NoPath,
    NoIntersects,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchStatus::Success => "success",
            MatchStatus::Attempt => "attempt",
            MatchStatus::NoPath => "no_path",
            MatchStatus::NoIntersects => "no_intersects",
        })
    }
}

/// A walk through the network with its fit to the trajectory
#[derive(Debug, Clone)]
pub struct MatchedPath {
    pub path: Vec<WaypointId>,
    pub edges: Vec<LineString<f64>>,
    /// Merged edge geometry
    pub geometry: LineString<f64>,
    pub sspd: f64,
    /// Share of the trajectory length between the matched endpoints
    pub fraction_covered: f64,
    /// Point-to-curve distances behind the SSPD value
    pub distances: Vec<f64>,
}

#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Success(MatchedPath),
    /// Shortest path between the first and last passage after the search failed
    Attempt(MatchedPath),
    NoPath,
    NoIntersects,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub vessel_id: VesselId,
    pub origin: WaypointId,
    pub destination: WaypointId,
    pub outcome: MatchOutcome,
}

/// Path record of one matched trajectory
#[derive(Debug, Clone, Serialize)]
pub struct PathRecord {
    pub vessel_id: VesselId,
    pub origin: WaypointId,
    pub destination: WaypointId,
    pub path: Vec<WaypointId>,
    /// WKT linestrings, one per traversed edge
    pub edges: Vec<String>,
    pub status: MatchStatus,
}

/// Evaluation record of one matched trajectory
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub vessel_id: VesselId,
    pub sspd: Option<f64>,
    pub fraction_covered: f64,
    pub distances: Vec<f64>,
    pub status: MatchStatus,
}

impl MatchResult {
    pub fn status(&self) -> MatchStatus {
        match self.outcome {
            MatchOutcome::Success(_) => MatchStatus::Success,
            MatchOutcome::Attempt(_) => MatchStatus::Attempt,
            MatchOutcome::NoPath => MatchStatus::NoPath,
            MatchOutcome::NoIntersects => MatchStatus::NoIntersects,
        }
    }

    pub fn matched(&self) -> Option<&MatchedPath> {
        match &self.outcome {
            MatchOutcome::Success(matched) | MatchOutcome::Attempt(matched) => Some(matched),
            MatchOutcome::NoPath | MatchOutcome::NoIntersects => None,
        }
    }

    /// SSPD of the matched path, NaN when unmatched
    pub fn sspd(&self) -> f64 {
        self.matched().map_or(f64::NAN, |m| m.sspd)
    }

    pub fn fraction_covered(&self) -> f64 {
        self.matched().map_or(0.0, |m| m.fraction_covered)
    }

    pub fn path_record(&self) -> PathRecord {
        let (path, edges) = self.matched().map_or_else(Default::default, |m| {
            (
                m.path.clone(),
                m.edges.iter().map(ToWkt::wkt_string).collect(),
            )
        });
        PathRecord {
            vessel_id: self.vessel_id,
            origin: self.origin,
            destination: self.destination,
            path,
            edges,
            status: self.status(),
        }
    }

    pub fn evaluation_record(&self) -> EvaluationRecord {
        EvaluationRecord {
            vessel_id: self.vessel_id,
            sspd: self.matched().map(|m| m.sspd),
            fraction_covered: self.fraction_covered(),
            distances: self
                .matched()
                .map(|m| m.distances.clone())
                .unwrap_or_default(),
            status: self.status(),
        }
    }

    /// Labeled path for the refiner, only for matched results of `trajectory`'s vessel
    pub fn labeled<'a>(&'a self, trajectory: &'a Trajectory) -> Option<LabeledPath<'a>> {
        if trajectory.vessel_id != self.vessel_id {
            return None;
        }
        self.matched().map(|m| LabeledPath {
            vessel_id: self.vessel_id,
            path: &m.path,
            trajectory,
        })
    }
}

/// Reasons the sub-path search gives up and hands over to the shortest-path fallback
#[derive(Debug, Error)]
pub(crate) enum MatchFailure {
    #[error("no route from waypoint {from} to waypoint {to} in the channel graph")]
    NoRoute { from: WaypointId, to: WaypointId },
    #[error("waypoint {0} is not part of the channel graph")]
    UnknownWaypoint(WaypointId),
    #[error("stitched path {0:?} is not a walk through the network")]
    NotAWalk(Vec<WaypointId>),
    #[error(transparent)]
    Network(#[from] Error),
}

/// Trajectory sample indices the evaluation is measured between
#[derive(Debug, Clone, Copy)]
struct EvaluationSpan {
    start: usize,
    end: usize,
}

/// Endpoints and passages of a trajectory after reconciliation
struct Passages {
    origin: EndpointCandidate,
    destination: EndpointCandidate,
    sequence: Vec<WaypointId>,
}

fn reconcile(
    network: &TrafficNetwork,
    trajectory: &Trajectory,
    origin: EndpointCandidate,
    destination: EndpointCandidate,
    mut passages: Vec<WaypointId>,
    config: &MatchConfig,
) -> Passages {
    let close = |candidate: &EndpointCandidate| candidate.distance < config.endpoint_max_distance;
    let (mut origin, mut destination) = (origin, destination);

    let (Some(&first), Some(&last)) = (passages.first(), passages.last()) else {
        if origin.waypoint != destination.waypoint {
            if close(&origin) {
                passages.push(origin.waypoint);
            }
            if close(&destination) {
                passages.push(destination.waypoint);
            }
        }
        return Passages {
            origin,
            destination,
            sequence: passages,
        };
    };

    let closest_index = |id: WaypointId| {
        network
            .node(id)
            .map_or(0, |n| trajectory.closest_index(n.position))
    };

    if !passages.contains(&origin.waypoint)
        && close(&origin)
        && shortest_hop_path(network, origin.waypoint, first).is_some()
    {
        passages.insert(0, origin.waypoint);
    } else {
        origin = EndpointCandidate {
            waypoint: first,
            distance: origin.distance,
            index: closest_index(first),
        };
    }

    if !passages.contains(&destination.waypoint)
        && close(&destination)
        && shortest_hop_path(network, last, destination.waypoint).is_some()
    {
        passages.push(destination.waypoint);
    } else {
        destination = EndpointCandidate {
            waypoint: last,
            distance: destination.distance,
            index: closest_index(last),
        };
    }

    Passages {
        origin,
        destination,
        sequence: passages,
    }
}

/// Best sub-path between each consecutive passage pair, stitched into one walk
fn stitch(
    network: &TrafficNetwork,
    channel: &TrafficNetwork,
    trajectory: &Trajectory,
    passages: &[WaypointId],
    config: &MatchConfig,
) -> Result<Vec<WaypointId>, MatchFailure> {
    let mut path = passages.first().copied().into_iter().collect::<Vec<_>>();
    for pair in passages.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let index_of = |id| {
            channel
                .node(id)
                .map(|n| trajectory.closest_index(n.position))
                .ok_or(MatchFailure::UnknownWaypoint(id))
        };
        let (start, end) = (index_of(from)?, index_of(to)?);
        if end < start {
            log::debug!("Vessel {}: skipping backward pair {from} -> {to}", trajectory.vessel_id);
            continue;
        }

        let candidates = if end - start <= config.close_index_span {
            all_shortest_paths(channel, from, to)
        } else {
            let shortest = shortest_hop_path(channel, from, to)
                .ok_or(MatchFailure::NoRoute { from, to })?;
            if shortest.len() - 1 > config.l_max {
                all_shortest_paths(channel, from, to)
            } else {
                bounded_simple_paths(channel, from, to, config.l_max, config.k_max)
            }
        };

        let best = best_candidate(channel, trajectory, start, end, candidates)?
            .ok_or(MatchFailure::NoRoute { from, to })?;
        path.extend_from_slice(&best[1..]);
    }

    if path.len() < 2 || !network.is_walk(&path) {
        return Err(MatchFailure::NotAWalk(path));
    }
    Ok(path)
}

/// Fit of a walk to the trajectory between the matched endpoints
fn evaluate_path(
    network: &TrafficNetwork,
    trajectory: &Trajectory,
    path: Vec<WaypointId>,
    span: EvaluationSpan,
) -> Result<MatchedPath, MatchFailure> {
    let edges: Vec<LineString<f64>> = network
        .path_geometry(&path)?
        .into_iter()
        .cloned()
        .collect();
    let geometry = merge_lines(&edges);

    // Round trips may end before they start
    let span = if span.start >= span.end {
        EvaluationSpan {
            start: 0,
            end: trajectory.len().saturating_sub(1),
        }
    } else {
        span
    };
    let section = trajectory.sub_curve(span.start, span.end);
    let section_points = sample_points(trajectory, span.start, span.end);
    let path_points = interpolate_points(&geometry, section_points.len());
    let fit = sspd(&section, &section_points, &geometry, &path_points);

    let total = trajectory.length();
    let fraction_covered = if total > f64::EPSILON {
        curve_length(&section) / total
    } else {
        1.0
    };

    Ok(MatchedPath {
        distances: fit.distances(),
        sspd: fit.value,
        fraction_covered,
        path,
        edges,
        geometry,
    })
}

fn search(
    network: &TrafficNetwork,
    channel: &TrafficNetwork,
    trajectory: &Trajectory,
    passages: &[WaypointId],
    span: EvaluationSpan,
    config: &MatchConfig,
) -> Result<MatchedPath, MatchFailure> {
    let mut path = stitch(network, channel, trajectory, passages, config)?;
    if config.algorithm == MatchAlgorithm::Refined {
        path = refine_hops::skip_hops(channel, trajectory, &path)?;
    }
    evaluate_path(network, trajectory, path, span)
}

/// Maps a trajectory onto the best fitting walk through `network`
///
/// `network` is expected to be a pruned snapshot built over `waypoints`.
pub fn match_trajectory(
    network: &TrafficNetwork,
    waypoints: &WaypointTable,
    trajectory: &Trajectory,
    config: &MatchConfig,
) -> MatchResult {
    let vessel_id = trajectory.vessel_id;
    let endpoints = find_origin(trajectory, waypoints, &config.locator).and_then(|origin| {
        find_destination(trajectory, waypoints, &config.locator).map(|dest| (origin, dest))
    });
    let (origin, destination) = endpoints.unwrap_or_else(|err| {
        log::debug!("Vessel {vessel_id}: no endpoint candidates ({err})");
        let fallback = |index| EndpointCandidate {
            waypoint: 0,
            distance: f64::INFINITY,
            index,
        };
        (fallback(0), fallback(trajectory.len().saturating_sub(1)))
    });

    let intersections = find_intersections(
        trajectory,
        waypoints,
        network,
        config.buffer_radius,
        &config.passages,
    );
    let Passages {
        origin,
        destination,
        sequence: passages,
    } = reconcile(
        network,
        trajectory,
        origin,
        destination,
        intersections.passages,
        config,
    );
    log::debug!("Vessel {vessel_id}: passages {passages:?}");

    let result = |outcome| MatchResult {
        vessel_id,
        origin: origin.waypoint,
        destination: destination.waypoint,
        outcome,
    };

    let (Some(&first), Some(&last)) = (passages.first(), passages.last()) else {
        return result(MatchOutcome::NoIntersects);
    };
    if passages.len() < 2 {
        return result(MatchOutcome::NoIntersects);
    }

    let span = EvaluationSpan {
        start: origin.index,
        end: destination.index,
    };
    match search(network, &intersections.channel, trajectory, &passages, span, config) {
        Ok(matched) => result(MatchOutcome::Success(matched)),
        Err(failure) => {
            log::debug!("Vessel {vessel_id}: {failure}, falling back to the shortest path");
            let attempt = shortest_path(network, first, last, EdgeWeight::Hops)
                .map_err(MatchFailure::from)
                .and_then(|shortest| evaluate_path(network, trajectory, shortest.nodes, span));
            match attempt {
                Ok(matched) if matched.path.len() >= 2 => result(MatchOutcome::Attempt(matched)),
                _ => result(MatchOutcome::NoPath),
            }
        }
    }
}
