use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use serde_json::json;
use seaway_core::{
    matching::{EvaluationRecord, PathRecord},
    prelude::*,
};

pub struct AppState {
    pub snapshots: NetworkSnapshots,
    pub matching: MatchConfig,
}

pub type SharedState = Arc<AppState>;

/// JSON error body with a status derived from the core error
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidConfig(_)
            | Error::InvalidData(_)
            | Error::EmptyTrajectory(_)
            | Error::InsufficientSamples { .. } => StatusCode::BAD_REQUEST,
            Error::UnknownWaypoint(_) | Error::MissingSnapshot(_) => StatusCode::NOT_FOUND,
            Error::Unreachable { .. } | Error::MissingConnection { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn worker_failed(err: &tokio::task::JoinError) -> ApiError {
    tracing::error!("Worker task failed: {err}");
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "worker task failed".to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SampleDto {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub course: f64,
}

#[derive(Debug, Deserialize)]
pub struct TrajectoryDto {
    pub vessel_id: VesselId,
    pub samples: Vec<SampleDto>,
}

impl TryFrom<TrajectoryDto> for Trajectory {
    type Error = Error;

    fn try_from(dto: TrajectoryDto) -> Result<Self, Self::Error> {
        let points = dto
            .samples
            .into_iter()
            .map(|s| TrajectoryPoint {
                timestamp: s.timestamp,
                lat: s.lat,
                lon: s.lon,
                position: Point::new(s.x, s.y),
                speed: s.speed,
                course: s.course,
            })
            .collect();
        Trajectory::new(dto.vessel_id, points)
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(flatten)]
    pub trajectory: TrajectoryDto,
    pub algorithm: Option<MatchAlgorithm>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub path: PathRecord,
    pub evaluation: EvaluationRecord,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub trajectories: Vec<TrajectoryDto>,
    pub algorithm: Option<MatchAlgorithm>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub summary: EvaluationSummary,
    pub results: Vec<EvaluationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub origin: WaypointId,
    pub destination: WaypointId,
    #[serde(default)]
    pub weight: EdgeWeight,
    pub snapshot: Option<SnapshotKind>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/network", get(summaries))
        .route("/network/{kind}/geojson", get(geojson))
        .route("/route", post(route))
        .route("/match", post(match_one))
        .route("/evaluate", post(evaluate))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn summaries(State(state): State<SharedState>) -> Json<Vec<NetworkSummary>> {
    Json(state.snapshots.summaries())
}

async fn geojson(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> Result<Response, ApiError> {
    let kind: SnapshotKind = kind.parse()?;
    let body = state.snapshots.snapshot(kind)?.to_geojson_string()?;
    Ok(([(header::CONTENT_TYPE, "application/geo+json")], body).into_response())
}

async fn route(
    State(state): State<SharedState>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<ShortestPath>, ApiError> {
    let kind = request.snapshot.unwrap_or(SnapshotKind::Pruned);
    let network = state.snapshots.snapshot(kind)?;
    let path = shortest_path(network, request.origin, request.destination, request.weight)?;
    Ok(Json(path))
}

async fn match_one(
    State(state): State<SharedState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let trajectory = Trajectory::try_from(request.trajectory)?;
    let config = MatchConfig {
        algorithm: request.algorithm.unwrap_or(state.matching.algorithm),
        ..state.matching.clone()
    };
    let result = tokio::task::spawn_blocking(move || {
        state.snapshots.match_trajectory(&trajectory, &config)
    })
    .await
    .map_err(|e| worker_failed(&e))??;
    tracing::debug!(
        vessel_id = result.vessel_id,
        status = %result.status(),
        "Matched trajectory"
    );
    Ok(Json(MatchResponse {
        path: result.path_record(),
        evaluation: result.evaluation_record(),
    }))
}

async fn evaluate(
    State(state): State<SharedState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let trajectories = request
        .trajectories
        .into_iter()
        .map(Trajectory::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let config = MatchConfig {
        algorithm: request.algorithm.unwrap_or(state.matching.algorithm),
        ..state.matching.clone()
    };
    let evaluation =
        tokio::task::spawn_blocking(move || state.snapshots.evaluate(&trajectories, &config))
            .await
            .map_err(|e| worker_failed(&e))??;
    Ok(Json(EvaluateResponse {
        results: evaluation
            .results
            .iter()
            .map(MatchResult::evaluation_record)
            .collect(),
        summary: evaluation.summary,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use geo::polygon;
    use tower::ServiceExt;

    use super::*;

    const METERS_PER_DEGREE: f64 = 111_320.0;

    fn waypoint(id: WaypointId, x: f64) -> Waypoint {
        Waypoint {
            id,
            lat: 0.0,
            lon: x / METERS_PER_DEGREE,
            position: Point::new(x, 0.0),
            speed: 10.0,
            course_before: Some(90.0),
            course_after: Some(90.0),
            n_members: 20,
            convex_hull: polygon![
                (x: x - 30.0, y: -30.0),
                (x: x + 30.0, y: -30.0),
                (x: x + 30.0, y: 30.0),
                (x: x - 30.0, y: 30.0),
            ],
        }
    }

    fn state() -> SharedState {
        let table =
            WaypointTable::new(vec![waypoint(0, 0.0), waypoint(1, 1000.0), waypoint(2, 2000.0)])
                .unwrap();
        let node = |id| NetworkNode::from(table.try_get(id).unwrap());
        let connections = vec![
            Connection::straight(&node(0), &node(1), 10),
            Connection::straight(&node(1), &node(2), 10),
        ];
        let raw = TrafficNetwork::from_waypoints(SnapshotKind::Raw, &table, connections).unwrap();
        let mut snapshots = NetworkSnapshots::new(table, raw);
        snapshots
            .prune(SnapshotKind::Raw, &PruneConfig::default())
            .unwrap();
        Arc::new(AppState {
            snapshots,
            matching: MatchConfig::default(),
        })
    }

    fn eastbound_samples() -> serde_json::Value {
        let samples: Vec<_> = (0..=40)
            .map(|i| {
                let x = f64::from(i) * 50.0;
                let timestamp = DateTime::from_timestamp(1_600_000_000 + 10 * i64::from(i), 0);
                json!({
                    "timestamp": timestamp.unwrap(),
                    "lat": 0.0,
                    "lon": x / METERS_PER_DEGREE,
                    "x": x,
                    "y": 0.0,
                    "speed": 10.0,
                    "course": 90.0,
                })
            })
            .collect();
        json!(samples)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn summaries_list_computed_snapshots() {
        let request = Request::builder()
            .uri("/network")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["kind"], "pruned");
        assert_eq!(body[1]["edges"], 2);
    }

    #[tokio::test]
    async fn missing_refined_snapshot_is_not_found() {
        let request = Request::builder()
            .uri("/network/refined/geojson")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("refined"));
    }

    #[tokio::test]
    async fn route_between_waypoints() {
        let (status, body) = send(post_json(
            "/route",
            &json!({"origin": 0, "destination": 2}),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nodes"], json!([0, 1, 2]));

        let (status, _) = send(post_json(
            "/route",
            &json!({"origin": 2, "destination": 0, "weight": "hops"}),
        ))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn match_returns_path_and_evaluation_records() {
        let (status, body) = send(post_json(
            "/match",
            &json!({"vessel_id": 42, "samples": eastbound_samples()}),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["path"]["status"], "success");
        assert_eq!(body["path"]["path"], json!([0, 1, 2]));
        assert!(body["evaluation"]["sspd"].as_f64().unwrap() < 1e-6);
    }

    #[tokio::test]
    async fn empty_trajectory_is_a_bad_request() {
        let (status, _) = send(post_json(
            "/match",
            &json!({"vessel_id": 1, "samples": []}),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
