mod common;

use std::io::Write;

use common::*;
use seaway_core::{algo::locator::PassageConfig, prelude::*};

#[test]
fn builder_counts_passages_without_self_loops() {
    let table = eastbound_waypoints();
    let trajectories = vec![
        eastbound_run(1),
        eastbound_run(2),
        // Against the waypoint courses, passes nothing
        trajectory(3, &[(2000.0, 0.0), (0.0, 0.0)], 50.0),
    ];

    let raw = build_network(&table, &trajectories, &PassageConfig::for_builder()).unwrap();
    assert_eq!(raw.kind(), SnapshotKind::Raw);
    assert_eq!(raw.node_count(), 4);
    assert_eq!(raw.edge_count(), 2);
    assert_eq!(raw.isolated_count(), 1);
    assert_eq!(raw.connection(A, B).unwrap().passages, 2);
    assert_eq!(raw.connection(B, C).unwrap().passages, 2);
    assert!(raw.connection(C, B).is_none());
    for connection in raw.connections() {
        assert_ne!(connection.from, connection.to);
        assert!(connection.passages >= 1);
        assert!((connection.inverse_weight - 0.5).abs() < 1e-12);
    }
}

#[test]
fn pruner_drops_reverse_and_redundant_edges() {
    let table = eastbound_waypoints();
    let raw = network(
        SnapshotKind::Raw,
        &table,
        &[(A, B, 10), (B, C, 10), (A, C, 1), (C, A, 4)],
    );

    let outcome = prune_network(&raw, &PruneConfig::default()).unwrap();
    let pruned = &outcome.network;
    assert_eq!(pruned.kind(), SnapshotKind::Pruned);
    assert_eq!(pruned.node_count(), raw.node_count());
    assert!(pruned.edge_count() <= raw.edge_count());
    assert!(pruned.connection(A, B).is_some());
    assert!(pruned.connection(B, C).is_some());
    assert!(pruned.connection(A, C).is_none());
    assert!(pruned.connection(C, A).is_none());

    assert_eq!(outcome.report.removed_by_direction, 1);
    assert_eq!(outcome.report.removed_as_redundant, 1);
    assert_eq!(outcome.report.isolated_nodes, 1);
}

#[test]
fn dijkstra_prefers_busy_edges() {
    let table = eastbound_waypoints();
    let network = network(
        SnapshotKind::Pruned,
        &table,
        &[(A, B, 10), (B, C, 10), (A, C, 1)],
    );

    let busy = shortest_path(&network, A, C, EdgeWeight::InverseWeight).unwrap();
    assert_eq!(busy.nodes, vec![A, B, C]);
    assert!((busy.cost - 0.2).abs() < 1e-12);

    let fewest_hops = shortest_path(&network, A, C, EdgeWeight::Hops).unwrap();
    assert_eq!(fewest_hops.nodes, vec![A, C]);

    assert!(matches!(
        shortest_path(&network, C, A, EdgeWeight::default()),
        Err(Error::Unreachable { from: C, to: A })
    ));
    assert!(matches!(
        shortest_path(&network, A, 42, EdgeWeight::default()),
        Err(Error::UnknownWaypoint(42))
    ));
}

#[test]
fn snapshots_require_their_source() {
    let table = eastbound_waypoints();
    let raw = network(SnapshotKind::Raw, &table, &[(A, B, 10), (B, C, 10)]);
    let mut snapshots = NetworkSnapshots::new(table, raw);

    assert!(matches!(
        snapshots.snapshot(SnapshotKind::Pruned),
        Err(Error::MissingSnapshot(SnapshotKind::Pruned))
    ));
    assert!(matches!(
        snapshots.match_trajectory(&eastbound_run(1), &MatchConfig::default()),
        Err(Error::MissingSnapshot(SnapshotKind::Pruned))
    ));
    assert!(matches!(
        snapshots.prune(SnapshotKind::Refined, &PruneConfig::default()),
        Err(Error::MissingSnapshot(SnapshotKind::Refined))
    ));

    snapshots
        .prune(SnapshotKind::Raw, &PruneConfig::default())
        .unwrap();
    let report = snapshots.refine(&[]);
    assert_eq!(report.removed, 2);

    let refined = snapshots.snapshot(SnapshotKind::Refined).unwrap();
    assert_eq!(refined.edge_count(), 0);
    assert_eq!(refined.node_count(), 4);

    snapshots
        .prune(SnapshotKind::Refined, &PruneConfig::default())
        .unwrap();
    assert_eq!(snapshots.pruned().unwrap().edge_count(), 0);
    assert_eq!(snapshots.summaries().len(), 3);
}

#[test]
fn network_config_sections_default_independently() {
    let config: NetworkConfig = serde_json::from_str(
        r#"{
            "clustering": {"method": "OPTICS"},
            "pruning": {"order": "independent"},
            "matching": {"algorithm": "refined", "k_max": 100}
        }"#,
    )
    .unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.pruning.order, RedundancyOrder::Independent);
    assert_eq!(config.pruning.max_alternative_hops, 5);
    assert_eq!(config.matching.algorithm, MatchAlgorithm::Refined);
    assert_eq!(config.matching.l_max, 5);
    assert_eq!(config.matching.passages.simplify_tolerance, Some(10.0));

    let unsupported: NetworkConfig =
        serde_json::from_str(r#"{"clustering": {"metric": "cosine"}}"#).unwrap();
    assert!(matches!(unsupported.validate(), Err(Error::InvalidConfig(_))));
}

fn write_table(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn hull(x: f64, y: f64) -> String {
    let (x0, x1, y0, y1) = (x - 30.0, x + 30.0, y - 30.0, y + 30.0);
    format!("\"POLYGON(({x0} {y0},{x1} {y0},{x1} {y1},{x0} {y1},{x0} {y0}))\"")
}

#[test]
fn pipeline_builds_prunes_and_matches_from_tables() {
    let dir = std::env::temp_dir().join(format!("seaway-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut waypoints =
        String::from("clusterID,lat,lon,x,y,speed,cog_before,cog_after,n_members,convex_hull\n");
    for (id, x) in [(A, 0.0), (B, 1000.0), (C, 2000.0)] {
        waypoints.push_str(&format!(
            "{id},0,{},{x},0,10,90,90,20,{}\n",
            x / METERS_PER_DEGREE,
            hull(x, 0.0)
        ));
    }

    let mut points = String::from("mmsi,date_time_utc,lat,lon,x,y,speed,cog\n");
    for vessel in [11_u64, 12, 13] {
        for sample in eastbound_run(vessel).points() {
            points.push_str(&format!(
                "{vessel},{},{},{},{},{},{},{}\n",
                sample.timestamp.to_rfc3339(),
                sample.lat,
                sample.lon,
                sample.position.x(),
                sample.position.y(),
                sample.speed,
                sample.course
            ));
        }
    }

    let config = TrafficNetworkConfig {
        waypoints_path: write_table(&dir, "waypoints.csv", &waypoints),
        trajectories_path: write_table(&dir, "points.csv", &points),
        network: NetworkConfig::default(),
    };
    let snapshots = create_traffic_network(&config).unwrap();
    assert_eq!(snapshots.raw().edge_count(), 2);
    assert_eq!(snapshots.raw().connection(A, B).unwrap().passages, 3);
    assert_eq!(snapshots.pruned().unwrap().edge_count(), 2);

    let result = snapshots
        .match_trajectory(&eastbound_run(99), &config.network.matching)
        .unwrap();
    assert_eq!(result.status(), MatchStatus::Success);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn pipeline_rejects_missing_tables() {
    let config = TrafficNetworkConfig {
        waypoints_path: "does/not/exist.csv".into(),
        trajectories_path: "does/not/exist either.csv".into(),
        network: NetworkConfig::default(),
    };
    assert!(matches!(
        create_traffic_network(&config),
        Err(Error::IoError(_))
    ));
}
