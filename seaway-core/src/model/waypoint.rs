//! Waypoints produced by the external clustering step

use geo::{Point, Polygon, Rect};
use hashbrown::HashMap;
use rstar::{AABB, RTree, primitives::GeomWithData};

use crate::{Error, WaypointId};

/// A recurring turning or stop location
#[derive(Debug, Clone)]
pub struct Waypoint {
    /// Cluster id, stable across snapshots
    pub id: WaypointId,
    pub lat: f64,
    pub lon: f64,
    /// Centroid in the projected frame
    pub position: Point<f64>,
    /// Mean speed of the cluster members
    pub speed: f64,
    /// Circular mean of the courses before the turn
    pub course_before: Option<f64>,
    /// Circular mean of the courses after the turn
    pub course_after: Option<f64>,
    pub n_members: usize,
    pub convex_hull: Polygon<f64>,
}

impl Waypoint {
    /// Centroid as `(lon, lat)`, the frame used for bearings
    pub fn geographic(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Stop points are waypoints where vessels are nearly stationary
    pub fn is_stop(&self, max_speed: f64) -> bool {
        self.speed < max_speed
    }
}

type IndexedCentroid = GeomWithData<[f64; 2], usize>;

/// Arena of waypoints with O(1) id lookup and a spatial index over centroids
#[derive(Clone)]
pub struct WaypointTable {
    waypoints: Vec<Waypoint>,
    index: HashMap<WaypointId, usize>,
    centroids: RTree<IndexedCentroid>,
}

impl std::fmt::Debug for WaypointTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaypointTable")
            .field("len", &self.waypoints.len())
            .finish()
    }
}

impl WaypointTable {
    /// # Errors
    ///
    /// Returns an error if two waypoints share an id
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, Error> {
        let mut index = HashMap::with_capacity(waypoints.len());
        for (position, waypoint) in waypoints.iter().enumerate() {
            if index.insert(waypoint.id, position).is_some() {
                return Err(Error::DuplicateWaypoint(waypoint.id));
            }
        }

        let centroids = RTree::bulk_load(
            waypoints
                .iter()
                .enumerate()
                .map(|(position, wp)| {
                    GeomWithData::new([wp.position.x(), wp.position.y()], position)
                })
                .collect(),
        );

        Ok(Self {
            waypoints,
            index,
            centroids,
        })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, id: WaypointId) -> Option<&Waypoint> {
        self.index.get(&id).map(|&position| &self.waypoints[position])
    }

    /// # Errors
    ///
    /// Returns `UnknownWaypoint` if the id is not in the table
    pub fn try_get(&self, id: WaypointId) -> Result<&Waypoint, Error> {
        self.get(id).ok_or(Error::UnknownWaypoint(id))
    }

    pub fn contains(&self, id: WaypointId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Waypoints whose centroid lies inside `bounds` grown by `margin` on every side
    pub fn within_bounds(&self, bounds: Rect<f64>, margin: f64) -> Vec<&Waypoint> {
        let envelope = AABB::from_corners(
            [bounds.min().x - margin, bounds.min().y - margin],
            [bounds.max().x + margin, bounds.max().y + margin],
        );
        let mut positions: Vec<usize> = self
            .centroids
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        // Table order keeps downstream iteration deterministic
        positions.sort_unstable();
        positions
            .into_iter()
            .map(|position| &self.waypoints[position])
            .collect()
    }
}
