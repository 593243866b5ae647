use std::{path::PathBuf, str::FromStr};

use serde::Deserialize;

use crate::{
    Error,
    algo::{PruneConfig, locator::PassageConfig},
    matching::MatchConfig,
};

/// Clustering algorithm that produced the waypoint table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusteringMethod {
    Dbscan,
    Hdbscan,
    Optics,
}

impl FromStr for ClusteringMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DBSCAN" => Ok(Self::Dbscan),
            "HDBSCAN" => Ok(Self::Hdbscan),
            "OPTICS" => Ok(Self::Optics),
            _ => Err(Error::InvalidConfig(format!(
                "unsupported clustering method '{s}', expected DBSCAN, HDBSCAN or OPTICS"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Euclidean,
    Haversine,
    Mahalanobis,
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "haversine" => Ok(Self::Haversine),
            "mahalanobis" => Ok(Self::Mahalanobis),
            _ => Err(Error::InvalidConfig(format!(
                "unsupported distance metric '{s}'"
            ))),
        }
    }
}

/// Names of the external clustering run, kept for provenance
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub method: String,
    pub metric: String,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            method: "HDBSCAN".to_string(),
            metric: "mahalanobis".to_string(),
        }
    }
}

impl ClusteringConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for unsupported names
    pub fn parse(&self) -> Result<(ClusteringMethod, DistanceMetric), Error> {
        Ok((self.method.parse()?, self.metric.parse()?))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StopPointConfig {
    pub enabled: bool,
    /// Waypoints with a lower mean speed are stop points
    pub max_speed: f64,
}

impl Default for StopPointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_speed: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub clustering: ClusteringConfig,
    /// Passage detection used while building the raw network
    pub builder: PassageConfig,
    pub stop_points: StopPointConfig,
    pub pruning: PruneConfig,
    pub matching: MatchConfig,
}

impl NetworkConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first invalid setting
    pub fn validate(&self) -> Result<(), Error> {
        self.clustering.parse()?;
        if self.builder.max_distance <= 0.0 || self.builder.max_angle <= 0.0 {
            return Err(Error::InvalidConfig(
                "builder thresholds must be positive".to_string(),
            ));
        }
        if self.stop_points.enabled && self.stop_points.max_speed <= 0.0 {
            return Err(Error::InvalidConfig(
                "stop_points.max_speed must be positive".to_string(),
            ));
        }
        if self.pruning.max_alternative_hops == 0 {
            return Err(Error::InvalidConfig(
                "pruning.max_alternative_hops must be positive".to_string(),
            ));
        }
        self.matching.validate()
    }
}

/// Input tables and settings of one network-generation run
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficNetworkConfig {
    /// Waypoint table produced by the clustering step
    pub waypoints_path: PathBuf,
    /// Significant points of all vessels
    pub trajectories_path: PathBuf,
    #[serde(default)]
    pub network: NetworkConfig,
}
