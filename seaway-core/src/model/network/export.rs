//! Tabular and GeoJSON export of network snapshots

use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde::Serialize;
use serde_json::json;
use wkt::ToWkt;

use super::{Connection, NetworkNode, TrafficNetwork};
use crate::{Error, WaypointId};

/// Flat node record
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub id: WaypointId,
    pub lat: f64,
    pub lon: f64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub cog_before: Option<f64>,
    pub cog_after: Option<f64>,
    pub n_members: usize,
    pub degree: usize,
}

/// Flat edge record, statistics columns are empty outside refined snapshots
#[derive(Debug, Clone, Serialize)]
pub struct EdgeRecord {
    pub from: WaypointId,
    pub to: WaypointId,
    /// WKT linestring
    pub geometry: String,
    pub direction: f64,
    pub length: f64,
    pub passages: u32,
    pub inverse_weight: f64,
    pub speed_mean: Option<f64>,
    pub speed_std: Option<f64>,
    pub speed_ci_lower: Option<f64>,
    pub speed_ci_upper: Option<f64>,
    pub cross_track_mean: Option<f64>,
    pub cross_track_std: Option<f64>,
    pub cross_track_skew: Option<f64>,
    pub cross_track_kurtosis: Option<f64>,
    pub cross_track_ci_lower: Option<f64>,
    pub cross_track_ci_upper: Option<f64>,
}

impl From<&Connection> for EdgeRecord {
    fn from(c: &Connection) -> Self {
        let stats = c.statistics.as_ref();
        let speed = stats.and_then(|s| s.speed);
        let cross = stats.and_then(|s| s.cross_track);
        Self {
            from: c.from,
            to: c.to,
            geometry: c.geometry.wkt_string(),
            direction: c.bearing,
            length: c.length,
            passages: c.passages,
            inverse_weight: c.inverse_weight,
            speed_mean: speed.map(|s| s.mean),
            speed_std: speed.map(|s| s.std),
            speed_ci_lower: speed.map(|s| s.ci95.0),
            speed_ci_upper: speed.map(|s| s.ci95.1),
            cross_track_mean: cross.map(|s| s.summary.mean),
            cross_track_std: cross.map(|s| s.summary.std),
            cross_track_skew: cross.map(|s| s.skewness),
            cross_track_kurtosis: cross.map(|s| s.kurtosis),
            cross_track_ci_lower: cross.map(|s| s.summary.ci95.0),
            cross_track_ci_upper: cross.map(|s| s.summary.ci95.1),
        }
    }
}

impl NodeRecord {
    fn new(node: &NetworkNode, degree: usize) -> Self {
        Self {
            id: node.id,
            lat: node.lat,
            lon: node.lon,
            x: node.position.x(),
            y: node.position.y(),
            speed: node.speed,
            cog_before: node.course_before,
            cog_after: node.course_after,
            n_members: node.n_members,
            degree,
        }
    }
}

impl TrafficNetwork {
    pub fn node_records(&self) -> Vec<NodeRecord> {
        self.graph
            .node_indices()
            .map(|idx| {
                let degree = self.graph.neighbors_undirected(idx).count();
                NodeRecord::new(&self.graph[idx], degree)
            })
            .collect()
    }

    pub fn edge_records(&self) -> Vec<EdgeRecord> {
        self.connections().map(EdgeRecord::from).collect()
    }

    /// Edges as a `GeoJSON` `FeatureCollection` in the projected frame
    ///
    /// # Errors
    ///
    /// Returns `GeoJsonError` if a feature cannot be assembled
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let features = self
            .connections()
            .map(|c| {
                // Same columns as the edge table, the WKT column is the feature geometry
                let mut properties = serde_json::to_value(EdgeRecord::from(c))
                    .map_err(|e| Error::GeoJsonError(e.to_string()))?;
                if let Some(columns) = properties.as_object_mut() {
                    columns.remove("geometry");
                }
                let value = json!({
                    "type": "Feature",
                    "geometry": Geometry::new(GeoJsonValue::from(&c.geometry)),
                    "properties": properties,
                });
                Feature::from_json_value(value).map_err(|e| Error::GeoJsonError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    /// # Errors
    ///
    /// See [`TrafficNetwork::to_geojson`]
    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}
