//! CSV tables produced by the clustering step

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, NaiveDateTime, Utc};
use geo::{Point, Polygon};
use log::warn;
use serde::Deserialize;
use wkt::TryFromWkt;

use crate::{
    Error, VesselId, WaypointId,
    model::{Trajectory, TrajectoryPoint, Waypoint, WaypointTable},
};

#[derive(Debug, Deserialize)]
struct WaypointRow {
    #[serde(rename = "clusterID")]
    cluster_id: WaypointId,
    lat: f64,
    lon: f64,
    x: f64,
    y: f64,
    speed: f64,
    cog_before: Option<f64>,
    cog_after: Option<f64>,
    n_members: usize,
    convex_hull: String,
}

#[derive(Debug, Deserialize)]
struct SignificantPointRow {
    mmsi: VesselId,
    #[serde(deserialize_with = "deserialize_timestamp")]
    date_time_utc: DateTime<Utc>,
    lat: f64,
    lon: f64,
    x: f64,
    y: f64,
    speed: f64,
    cog: f64,
}

/// RFC 3339, or `YYYY-MM-DD HH:MM:SS` taken as UTC
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

fn read_rows<T>(path: &Path) -> Result<Vec<T>, Error>
where
    T: for<'de> Deserialize<'de>,
{
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    let mut skipped = 0_usize;
    for row in reader.deserialize() {
        match row {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                log::debug!("Skipping row of {}: {err}", path.display());
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} malformed rows of {}", path.display());
    }
    Ok(rows)
}

impl TryFrom<WaypointRow> for Waypoint {
    type Error = Error;

    fn try_from(row: WaypointRow) -> Result<Self, Self::Error> {
        let convex_hull = Polygon::<f64>::try_from_wkt_str(&row.convex_hull).map_err(|e| {
            Error::InvalidData(format!(
                "convex hull of waypoint {} is not a WKT polygon: {e}",
                row.cluster_id
            ))
        })?;
        Ok(Waypoint {
            id: row.cluster_id,
            lat: row.lat,
            lon: row.lon,
            position: Point::new(row.x, row.y),
            speed: row.speed,
            course_before: row.cog_before,
            course_after: row.cog_after,
            n_members: row.n_members,
            convex_hull,
        })
    }
}

/// Loads the waypoint table
///
/// # Errors
///
/// Returns an error if the file cannot be read, a hull is not a WKT polygon
/// or two rows share a cluster id
pub fn load_waypoints(path: &Path) -> Result<WaypointTable, Error> {
    let waypoints = read_rows::<WaypointRow>(path)?
        .into_iter()
        .map(Waypoint::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    WaypointTable::new(waypoints)
}

/// Loads significant points and groups them into one trajectory per vessel,
/// ordered by vessel id
///
/// # Errors
///
/// Returns an error if the file cannot be read
pub fn load_trajectories(path: &Path) -> Result<Vec<Trajectory>, Error> {
    let mut by_vessel: BTreeMap<VesselId, Vec<TrajectoryPoint>> = BTreeMap::new();
    for row in read_rows::<SignificantPointRow>(path)? {
        by_vessel.entry(row.mmsi).or_default().push(TrajectoryPoint {
            timestamp: row.date_time_utc,
            lat: row.lat,
            lon: row.lon,
            position: Point::new(row.x, row.y),
            speed: row.speed,
            course: row.cog,
        });
    }
    by_vessel
        .into_iter()
        .map(|(vessel_id, points)| Trajectory::new(vessel_id, points))
        .collect()
}
