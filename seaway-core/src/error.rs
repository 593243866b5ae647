use thiserror::Error;

use crate::{VesselId, WaypointId, model::SnapshotKind};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown waypoint id {0}")]
    UnknownWaypoint(WaypointId),
    #[error("Duplicate waypoint id {0}")]
    DuplicateWaypoint(WaypointId),
    #[error("No connection from waypoint {from} to waypoint {to}")]
    MissingConnection { from: WaypointId, to: WaypointId },
    #[error("Waypoint {to} is unreachable from waypoint {from}")]
    Unreachable { from: WaypointId, to: WaypointId },
    #[error("Not enough trajectory samples: need {needed}, got {available}")]
    InsufficientSamples { needed: usize, available: usize },
    #[error("No candidate waypoints match the trajectory endpoint")]
    NoCandidateWaypoints,
    #[error("Trajectory of vessel {0} has no samples")]
    EmptyTrajectory(VesselId),
    #[error("Network snapshot '{0}' has not been computed")]
    MissingSnapshot(SnapshotKind),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
