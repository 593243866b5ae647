//! Vessel trajectories (significant points) owned by the caller

use chrono::{DateTime, Utc};
use geo::{Coord, LineString, Point};

use crate::{Error, VesselId, geometry};

/// A single timestamped AIS sample
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Position in the projected frame
    pub position: Point<f64>,
    /// Speed over ground in knots
    pub speed: f64,
    /// Course over ground in degrees
    pub course: f64,
}

impl TrajectoryPoint {
    pub fn geographic(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Time-ordered samples of one vessel
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub vessel_id: VesselId,
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    /// # Errors
    ///
    /// Returns `EmptyTrajectory` if `points` is empty
    pub fn new(vessel_id: VesselId, mut points: Vec<TrajectoryPoint>) -> Result<Self, Error> {
        if points.is_empty() {
            return Err(Error::EmptyTrajectory(vessel_id));
        }
        points.sort_by_key(|p| p.timestamp);
        Ok(Self { vessel_id, points })
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Projected positions as a curve
    pub fn line_string(&self) -> LineString<f64> {
        self.points
            .iter()
            .map(|p| Coord {
                x: p.position.x(),
                y: p.position.y(),
            })
            .collect()
    }

    /// Curve through the samples `start..=end` (indices clamped to the trajectory)
    pub fn sub_curve(&self, start: usize, end: usize) -> LineString<f64> {
        let last = self.points.len().saturating_sub(1);
        let (start, end) = (start.min(last), end.min(last));
        self.points[start..=end.max(start)]
            .iter()
            .map(|p| Coord {
                x: p.position.x(),
                y: p.position.y(),
            })
            .collect()
    }

    pub fn length(&self) -> f64 {
        geometry::curve_length(&self.line_string())
    }

    /// Index of the sample closest to `point`, first one wins on ties
    pub fn closest_index(&self, point: Point<f64>) -> usize {
        let mut best = (0, f64::INFINITY);
        for (idx, sample) in self.points.iter().enumerate() {
            let d = (sample.position.x() - point.x()).hypot(sample.position.y() - point.y());
            if d < best.1 {
                best = (idx, d);
            }
        }
        best.0
    }

    /// Seconds elapsed between two samples, negative if `end` precedes `start`
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_seconds(&self, start: usize, end: usize) -> f64 {
        match (self.points.get(start), self.points.get(end)) {
            (Some(a), Some(b)) => (b.timestamp - a.timestamp).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// Mean reported speed over the given samples
    ///
    /// # Errors
    ///
    /// Returns `InsufficientSamples` if the range reaches past the trajectory
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_speed(&self, range: std::ops::Range<usize>) -> Result<f64, Error> {
        let samples = self
            .points
            .get(range.clone())
            .filter(|s| !s.is_empty())
            .ok_or(Error::InsufficientSamples {
                needed: range.end.max(1),
                available: self.points.len(),
            })?;
        Ok(samples.iter().map(|p| p.speed).sum::<f64>() / samples.len() as f64)
    }
}
