use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use seaway_core::prelude::{NetworkConfig, TrafficNetworkConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Seconds before a request is aborted
    pub request_timeout_secs: u64,
    /// Requests processed at the same time
    pub concurrency_limit: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout_secs: 30,
            concurrency_limit: 64,
        }
    }
}

impl ServerSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Input tables loaded at start-up
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    pub waypoints_path: PathBuf,
    pub trajectories_path: PathBuf,
}

/// Contents of the TOML file passed with `--config`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub data: DataSection,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn traffic_network(&self) -> TrafficNetworkConfig {
        TrafficNetworkConfig {
            waypoints_path: self.data.waypoints_path.clone(),
            trajectories_path: self.data.trajectories_path.clone(),
            network: self.network.clone(),
        }
    }
}
