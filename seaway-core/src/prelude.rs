pub use crate::CROSS_TRACK_SAMPLES;

// Re-export key components
pub use crate::algo::locator::{EndpointCandidate, Intersections, LocatorConfig, PassageConfig};
pub use crate::algo::{
    build_network, merge_stop_points, prune_network, refine_network,
    sspd::{Sspd, sspd},
};
pub use crate::algo::{
    LabeledPath, MergedStopPoints, PruneConfig, PruneOutcome, PruneReport, RedundancyOrder,
    RefinementOutcome, RefinementReport,
};
pub use crate::loading::{
    ClusteringConfig, NetworkConfig, StopPointConfig, TrafficNetworkConfig,
    create_traffic_network,
};
pub use crate::matching::evaluation::{Evaluation, EvaluationSummary, evaluate_network};
pub use crate::matching::{
    MatchAlgorithm, MatchConfig, MatchOutcome, MatchResult, MatchStatus, MatchedPath,
    match_trajectory,
};
pub use crate::model::{
    Connection, EdgeRecord, EdgeStatistics, NetworkNode, NetworkSnapshots, NetworkSummary,
    NodeRecord, SnapshotKind, TrafficNetwork, Trajectory, TrajectoryPoint, Waypoint,
    WaypointTable,
};
pub use crate::routing::dijkstra::{EdgeWeight, ShortestPath, shortest_path};

// Core identifiers
pub use crate::Error;
pub use crate::VesselId;
pub use crate::WaypointId;
