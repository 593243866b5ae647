//! Data model of the maritime traffic network
//!
//! Waypoints and trajectories are read-only inputs; network snapshots are
//! immutable values derived from them.

pub mod network;
pub mod snapshots;
pub mod trajectory;
pub mod waypoint;

pub use network::{
    Connection, EdgeRecord, EdgeStatistics, NetworkNode, NetworkSummary, NodeRecord,
    SampleSummary, ShapeSummary, SnapshotKind, TrafficNetwork,
};
pub use snapshots::NetworkSnapshots;
pub use trajectory::{Trajectory, TrajectoryPoint};
pub use waypoint::{Waypoint, WaypointTable};
