//! Batch matching and quality summary of a network snapshot

use std::f64::consts::PI;

use hashbrown::HashMap;
use log::info;
use rayon::prelude::*;
use serde::Serialize;

use super::{MatchConfig, MatchResult, MatchStatus, match_trajectory};
use crate::{
    Error,
    algo::LabeledPath,
    model::{TrafficNetwork, Trajectory, WaypointTable},
};

/// Half-normal distribution fitted to the point-to-curve distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HalfNormalFit {
    pub scale: f64,
    pub mean: f64,
    pub std: f64,
}

impl HalfNormalFit {
    #[allow(clippy::cast_precision_loss)]
    fn from_distances(distances: &[f64]) -> Option<Self> {
        if distances.is_empty() {
            return None;
        }
        let scale =
            (distances.iter().map(|d| d * d).sum::<f64>() / distances.len() as f64).sqrt();
        Some(Self {
            scale,
            mean: scale * (2.0 / PI).sqrt(),
            std: scale * (1.0 - 2.0 / PI).sqrt(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub trajectories: usize,
    pub success: f64,
    pub attempt: f64,
    pub no_path: f64,
    pub no_intersects: f64,
    /// Share of results without an SSPD value
    pub nan_fraction: f64,
    /// Mean covered fraction over results with an SSPD value
    pub mean_fraction_covered: f64,
    pub distance_mean: f64,
    pub distance_median: f64,
    pub distance_std: f64,
    pub half_normal: Option<HalfNormalFit>,
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[allow(clippy::cast_precision_loss)]
fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

impl EvaluationSummary {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(results: &[MatchResult]) -> Self {
        let total = results.len();
        let mut counts: HashMap<MatchStatus, usize> = HashMap::new();
        for result in results {
            *counts.entry(result.status()).or_insert(0) += 1;
        }
        let fraction = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };
        let share = |status| fraction(counts.get(&status).copied().unwrap_or(0));

        let covered: Vec<f64> = results
            .iter()
            .filter(|r| !r.sspd().is_nan())
            .map(MatchResult::fraction_covered)
            .collect();
        let distances: Vec<f64> = results
            .iter()
            .filter(|r| r.status() == MatchStatus::Success)
            .filter_map(MatchResult::matched)
            .flat_map(|m| m.distances.iter().copied())
            .collect();

        Self {
            trajectories: total,
            success: share(MatchStatus::Success),
            attempt: share(MatchStatus::Attempt),
            no_path: share(MatchStatus::NoPath),
            no_intersects: share(MatchStatus::NoIntersects),
            nan_fraction: fraction(total - covered.len()),
            mean_fraction_covered: mean(&covered),
            distance_mean: mean(&distances),
            distance_median: median(&distances),
            distance_std: if distances.is_empty() {
                f64::NAN
            } else {
                population_std(&distances)
            },
            half_normal: HalfNormalFit::from_distances(&distances),
        }
    }
}

/// Match results of a batch, in the order of the input trajectories
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub results: Vec<MatchResult>,
    pub summary: EvaluationSummary,
}

impl Evaluation {
    /// Labeled paths of the successful matches, paired with their trajectories
    ///
    /// `trajectories` must be the slice the evaluation was computed from.
    pub fn labeled_paths<'a>(&'a self, trajectories: &'a [Trajectory]) -> Vec<LabeledPath<'a>> {
        self.results
            .iter()
            .zip(trajectories)
            .filter(|(result, _)| result.status() == MatchStatus::Success)
            .filter_map(|(result, trajectory)| result.labeled(trajectory))
            .collect()
    }
}

/// Matches every trajectory against `network` in parallel
///
/// # Errors
///
/// Returns `InvalidConfig` if `config` fails validation. Individual matching
/// failures are reported through the result statuses.
pub fn evaluate_network(
    network: &TrafficNetwork,
    waypoints: &WaypointTable,
    trajectories: &[Trajectory],
    config: &MatchConfig,
) -> Result<Evaluation, Error> {
    config.validate()?;
    let results: Vec<MatchResult> = trajectories
        .par_iter()
        .map(|trajectory| match_trajectory(network, waypoints, trajectory, config))
        .collect();
    let summary = EvaluationSummary::from_results(&results);
    info!(
        "Evaluated {} trajectories: {:.1}% success, {:.1}% attempt, {:.1}% no path, {:.1}% no intersects",
        summary.trajectories,
        summary.success * 100.0,
        summary.attempt * 100.0,
        summary.no_path * 100.0,
        summary.no_intersects * 100.0
    );
    Ok(Evaluation { results, summary })
}

#[cfg(test)]
mod tests {
    use geo::{LineString, line_string};

    use super::*;
    use crate::matching::{MatchOutcome, MatchedPath};

    fn matched(distances: Vec<f64>, fraction_covered: f64) -> MatchedPath {
        let geometry: LineString<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];
        MatchedPath {
            path: vec![0, 1],
            edges: vec![geometry.clone()],
            geometry,
            sspd: mean(&distances),
            fraction_covered,
            distances,
        }
    }

    fn result(outcome: MatchOutcome) -> MatchResult {
        MatchResult {
            vessel_id: 1,
            origin: 0,
            destination: 1,
            outcome,
        }
    }

    #[test]
    fn summary_counts_statuses_and_fits_distances() {
        let results = vec![
            result(MatchOutcome::Success(matched(vec![3.0, 4.0], 1.0))),
            result(MatchOutcome::Attempt(matched(vec![100.0], 0.5))),
            result(MatchOutcome::NoPath),
            result(MatchOutcome::NoIntersects),
        ];
        let summary = EvaluationSummary::from_results(&results);
        assert_eq!(summary.trajectories, 4);
        assert!((summary.success - 0.25).abs() < 1e-12);
        assert!((summary.nan_fraction - 0.5).abs() < 1e-12);
        assert!((summary.mean_fraction_covered - 0.75).abs() < 1e-12);
        // Attempt distances are left out
        assert!((summary.distance_mean - 3.5).abs() < 1e-12);
        assert!((summary.distance_median - 3.5).abs() < 1e-12);
        assert!((summary.distance_std - 0.5).abs() < 1e-12);

        let fit = summary.half_normal.unwrap();
        assert!((fit.scale - 12.5_f64.sqrt()).abs() < 1e-12);
        assert!((fit.mean - fit.scale * (2.0 / PI).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_batch_has_no_fit() {
        let summary = EvaluationSummary::from_results(&[]);
        assert_eq!(summary.trajectories, 0);
        assert!(summary.half_normal.is_none());
        assert!(summary.distance_mean.is_nan());
    }
}
