//! Maritime traffic network extraction and trajectory-to-path matching.
//!
//! A network is a weighted directed graph whose nodes are waypoints (recurring
//! turning and stop locations produced by an external clustering step) and
//! whose edges are observed transits between them. The crate builds the raw
//! network from vessel trajectories, prunes and refines it, and maps new
//! trajectories onto the best fitting walk through the pruned graph.

pub mod algo;
pub mod error;
pub mod geometry;
pub mod loading;
pub mod matching;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;

/// Identifier of a waypoint (the cluster id assigned by the clustering step)
pub type WaypointId = usize;
/// Identifier of a vessel (MMSI)
pub type VesselId = u64;

/// Number of cross-track samples taken along every edge passage during refinement
pub const CROSS_TRACK_SAMPLES: usize = 10;
