use std::path::Path;

use log::info;

use super::{
    config::TrafficNetworkConfig,
    tables::{load_trajectories, load_waypoints},
};
use crate::{
    Error,
    algo::{build_network, merge_stop_points},
    model::{NetworkSnapshots, NetworkSummary, SnapshotKind},
};

fn log_summary(summary: &NetworkSummary) {
    info!(
        "{} network: {} nodes ({} isolated), {} edges, {} total passages, weakly connected: {}",
        summary.kind,
        summary.nodes,
        summary.isolated_nodes,
        summary.edges,
        summary.total_passages,
        summary.weakly_connected
    );
}

/// Loads the input tables, builds the raw network and prunes it
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the tables cannot be read
pub fn create_traffic_network(config: &TrafficNetworkConfig) -> Result<NetworkSnapshots, Error> {
    validate_config(config)?;
    let network_config = &config.network;

    info!("Loading waypoints: {}", config.waypoints_path.display());
    let waypoints = load_waypoints(&config.waypoints_path)?;
    info!(
        "Loading significant points: {}",
        config.trajectories_path.display()
    );
    let trajectories = load_trajectories(&config.trajectories_path)?;
    info!(
        "Loaded {} waypoints and {} trajectories",
        waypoints.len(),
        trajectories.len()
    );

    let raw = build_network(&waypoints, &trajectories, &network_config.builder)?;
    let (waypoints, raw) = if network_config.stop_points.enabled {
        let merged = merge_stop_points(&waypoints, &raw, network_config.stop_points.max_speed)?;
        (merged.waypoints, merged.network)
    } else {
        (waypoints, raw)
    };

    let mut snapshots = NetworkSnapshots::new(waypoints, raw);
    let report = snapshots.prune(SnapshotKind::Raw, &network_config.pruning)?;
    info!(
        "Pruning removed {} edges against traffic direction and {} redundant edges",
        report.removed_by_direction, report.removed_as_redundant
    );
    for summary in snapshots.summaries() {
        log_summary(&summary);
    }
    Ok(snapshots)
}

fn validate_file(path: &Path) -> Result<(), Error> {
    if path.is_file() {
        return Ok(());
    }
    Err(Error::IoError(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("Input table not found: {}", path.display()),
    )))
}

fn validate_config(config: &TrafficNetworkConfig) -> Result<(), Error> {
    config.network.validate()?;
    validate_file(&config.waypoints_path)?;
    validate_file(&config.trajectories_path)
}
