mod common;

use common::*;
use geo::{LineString, line_string};
use seaway_core::geometry::curve_length;
use seaway_core::{matching::candidates::score_candidate, prelude::*};

fn eastbound_network() -> (WaypointTable, TrafficNetwork) {
    let table = eastbound_waypoints();
    let network = network(SnapshotKind::Pruned, &table, &[(A, B, 10), (B, C, 10)]);
    (table, network)
}

#[test]
fn exact_trace_of_existing_path_is_a_success() {
    let (table, network) = eastbound_network();
    let trajectory = eastbound_run(7);

    let result = match_trajectory(&network, &table, &trajectory, &MatchConfig::default());
    assert_eq!(result.status(), MatchStatus::Success);
    assert_eq!(result.origin, A);
    assert_eq!(result.destination, C);

    let matched = result.matched().unwrap();
    assert_eq!(matched.path, vec![A, B, C]);
    assert_eq!(matched.edges.len(), 2);
    assert!(matched.sspd < 1e-6, "sspd {}", matched.sspd);
    assert!((matched.fraction_covered - 1.0).abs() < 1e-9);
    assert!(!matched.distances.is_empty());

    let record = result.path_record();
    assert_eq!(record.vessel_id, 7);
    assert_eq!(record.status, MatchStatus::Success);
    assert!(record.edges[0].starts_with("LINESTRING"));
}

#[test]
fn trajectory_away_from_the_network_has_no_intersects() {
    let (table, network) = eastbound_network();
    let trajectory = trajectory(8, &[(-500.0, 3000.0), (-100.0, 3000.0)], 50.0);

    let result = match_trajectory(&network, &table, &trajectory, &MatchConfig::default());
    assert_eq!(result.origin, result.destination);
    assert_eq!(result.status(), MatchStatus::NoIntersects);
    assert!(result.sspd().is_nan());
    assert!(result.fraction_covered().abs() < f64::EPSILON);
    assert!(result.path_record().path.is_empty());
}

#[test]
fn unreachable_channel_falls_back_to_shortest_path() {
    // B lies outside the narrow channel around the trajectory
    let table = WaypointTable::new(vec![
        waypoint(A, 0.0, 0.0, 90.0),
        waypoint(B, 1000.0, 800.0, 90.0),
        waypoint(C, 2000.0, 0.0, 90.0),
    ])
    .unwrap();
    let network = network(SnapshotKind::Pruned, &table, &[(A, B, 5), (B, C, 5)]);
    let config = MatchConfig {
        buffer_radius: 200.0,
        ..MatchConfig::default()
    };

    let result = match_trajectory(&network, &table, &eastbound_run(9), &config);
    assert_eq!(result.status(), MatchStatus::Attempt);
    assert_eq!(result.matched().unwrap().path, vec![A, B, C]);
    assert!(result.sspd() > 0.0);
}

#[test]
fn refined_mode_skips_a_detour_waypoint() {
    // B is passed but sits 60 m off the straight A-C line
    let table = WaypointTable::new(vec![
        waypoint(A, 0.0, 0.0, 90.0),
        waypoint(B, 1000.0, 60.0, 90.0),
        waypoint(C, 2000.0, 0.0, 90.0),
    ])
    .unwrap();
    let network = network(
        SnapshotKind::Pruned,
        &table,
        &[(A, B, 10), (B, C, 10), (A, C, 3)],
    );
    let trajectory = eastbound_run(10);

    let standard = match_trajectory(&network, &table, &trajectory, &MatchConfig::default());
    assert_eq!(standard.status(), MatchStatus::Success);
    assert_eq!(standard.matched().unwrap().path, vec![A, B, C]);

    let config = MatchConfig {
        algorithm: MatchAlgorithm::Refined,
        ..MatchConfig::default()
    };
    let refined = match_trajectory(&network, &table, &trajectory, &config);
    assert_eq!(refined.status(), MatchStatus::Success);
    assert_eq!(refined.matched().unwrap().path, vec![A, C]);
    assert!(refined.sspd() < standard.sspd());
}

#[test]
fn detour_candidate_scores_worse_than_the_traced_route() {
    let section: LineString<f64> =
        line_string![(x: 0.0, y: 2.0), (x: 10.0, y: 1.0), (x: 20.0, y: 2.0)];
    let section_points: Vec<_> = section.points().collect();
    let traced = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 20.0, y: 0.0)];
    let detour = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 15.0), (x: 20.0, y: 0.0)];

    let traced_score = score_candidate(&section, &section_points, &traced);
    let detour_score = score_candidate(&section, &section_points, &detour);
    assert!(traced_score < detour_score);
}

#[test]
fn busy_route_through_b_beats_the_sparse_detour() {
    // B's courses point north, so the eastbound trace never registers a passage there
    let table = WaypointTable::new(vec![
        waypoint(A, 0.0, 0.0, 90.0),
        waypoint(B, 1000.0, 0.0, 0.0),
        waypoint(C, 2000.0, 0.0, 90.0),
    ])
    .unwrap();
    let mut detour = connection(&table, A, C, 1);
    detour.geometry = line_string![(x: 0.0, y: 0.0), (x: 1000.0, y: 600.0), (x: 2000.0, y: 0.0)];
    detour.length = curve_length(&detour.geometry);
    let connections = vec![
        connection(&table, A, B, 10),
        connection(&table, B, C, 10),
        detour,
    ];
    let network =
        TrafficNetwork::from_waypoints(SnapshotKind::Pruned, &table, connections).unwrap();
    assert!(network.connection(A, C).unwrap().length > 2000.0);

    let result = match_trajectory(&network, &table, &eastbound_run(11), &MatchConfig::default());
    assert_eq!(result.status(), MatchStatus::Success);
    assert_eq!(result.matched().unwrap().path, vec![A, B, C]);
    assert!(result.sspd() < 1e-6);

    let shortest = shortest_path(&network, A, C, EdgeWeight::InverseWeight).unwrap();
    assert_eq!(shortest.nodes, vec![A, B, C]);
    assert!((shortest.cost - 0.2).abs() < 1e-9);
}

#[test]
fn batch_evaluation_feeds_the_refiner() {
    let (table, network) = eastbound_network();
    let trajectories = vec![
        eastbound_run(1),
        trajectory(2, &[(0.0, 5.0), (2000.0, 5.0)], 40.0),
        trajectory(3, &[(-500.0, 3000.0), (-100.0, 3000.0)], 50.0),
    ];

    let evaluation =
        evaluate_network(&network, &table, &trajectories, &MatchConfig::default()).unwrap();
    assert_eq!(evaluation.results.len(), 3);
    assert!((evaluation.summary.success - 2.0 / 3.0).abs() < 1e-9);
    assert!((evaluation.summary.nan_fraction - 1.0 / 3.0).abs() < 1e-9);
    assert!(evaluation.summary.half_normal.is_some());

    let labeled = evaluation.labeled_paths(&trajectories);
    assert_eq!(labeled.len(), 2);
    let refined = refine_network(&network, &labeled);
    assert_eq!(refined.network.edge_count(), 2);
    assert_eq!(refined.network.connection(A, B).unwrap().passages, 2);
}

#[test]
fn invalid_search_bounds_are_rejected() {
    let (table, network) = eastbound_network();
    let config = MatchConfig {
        k_max: 0,
        ..MatchConfig::default()
    };
    let err = evaluate_network(&network, &table, &[eastbound_run(1)], &config).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn snapshot_matching_validates_the_config() {
    let table = eastbound_waypoints();
    let raw = network(SnapshotKind::Raw, &table, &[(A, B, 10), (B, C, 10)]);
    let mut snapshots = NetworkSnapshots::new(table, raw);
    snapshots
        .prune(SnapshotKind::Raw, &PruneConfig::default())
        .unwrap();

    let config = MatchConfig {
        l_max: 0,
        ..MatchConfig::default()
    };
    let err = snapshots
        .match_trajectory(&eastbound_run(12), &config)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let result = snapshots
        .match_trajectory(&eastbound_run(12), &MatchConfig::default())
        .unwrap();
    assert_eq!(result.status(), MatchStatus::Success);
}
