//! This module is responsible for loading the clustering output (waypoint and
//! significant-point tables) and building the traffic network snapshots.

mod builder;
mod config;
pub mod tables;

pub use builder::create_traffic_network;
pub use config::{
    ClusteringConfig, ClusteringMethod, DistanceMetric, NetworkConfig, StopPointConfig,
    TrafficNetworkConfig,
};
pub use tables::{load_trajectories, load_waypoints};
