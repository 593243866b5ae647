//! Symmetric segment-path distance between two curves

use geo::{LineString, Point};

use crate::geometry::{is_degenerate, point_to_curve_distance};

/// SSPD value together with the one-sided distance samples it was averaged from
#[derive(Debug, Clone, PartialEq)]
pub struct Sspd {
    pub value: f64,
    /// Distances from the samples of the first curve to the second curve
    pub forward: Vec<f64>,
    /// Distances from the samples of the second curve to the first curve
    pub backward: Vec<f64>,
}

impl Sspd {
    /// All point-to-curve distances, forward samples first
    pub fn distances(&self) -> Vec<f64> {
        self.forward.iter().chain(&self.backward).copied().collect()
    }
}

/// Mean distance from the discrete `samples` to the continuous `curve`
#[allow(clippy::cast_precision_loss)]
fn spd(samples: &[Point<f64>], curve: &LineString<f64>) -> (f64, Vec<f64>) {
    let distances: Vec<f64> = samples
        .iter()
        .map(|p| point_to_curve_distance(p, curve))
        .collect();
    if distances.is_empty() {
        return (f64::NAN, distances);
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    (mean, distances)
}

fn representative_point(curve: &LineString<f64>, samples: &[Point<f64>]) -> Option<Point<f64>> {
    curve
        .0
        .first()
        .map(|c| Point::from(*c))
        .or_else(|| samples.first().copied())
}

/// Symmetric segment-path distance
///
/// Every sample of `a` is measured against the continuous curve `b` and vice
/// versa; the result is the mean of the two average distances. A curve with
/// fewer than two coordinates or zero length acts as a single point and the
/// result is then the point-to-curve distance.
pub fn sspd(
    curve_a: &LineString<f64>,
    samples_a: &[Point<f64>],
    curve_b: &LineString<f64>,
    samples_b: &[Point<f64>],
) -> Sspd {
    match (is_degenerate(curve_a), is_degenerate(curve_b)) {
        (true, _) => {
            let Some(point) = representative_point(curve_a, samples_a) else {
                return Sspd {
                    value: f64::NAN,
                    forward: Vec::new(),
                    backward: Vec::new(),
                };
            };
            let d = point_to_curve_distance(&point, curve_b);
            Sspd {
                value: d,
                forward: vec![d],
                backward: Vec::new(),
            }
        }
        (false, true) => {
            let Some(point) = representative_point(curve_b, samples_b) else {
                return Sspd {
                    value: f64::NAN,
                    forward: Vec::new(),
                    backward: Vec::new(),
                };
            };
            let d = point_to_curve_distance(&point, curve_a);
            Sspd {
                value: d,
                forward: Vec::new(),
                backward: vec![d],
            }
        }
        (false, false) => {
            let (d_ab, forward) = spd(samples_a, curve_b);
            let (d_ba, backward) = spd(samples_b, curve_a);
            Sspd {
                value: (d_ab + d_ba) / 2.0,
                forward,
                backward,
            }
        }
    }
}
