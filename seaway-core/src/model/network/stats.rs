//! Per-edge sample distributions collected by the refiner

use serde::Serialize;

/// z-score of the two-sided 95% interval of a normal distribution
const Z_95: f64 = 1.96;

/// Mean, population standard deviation and normal 95% interval of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub mean: f64,
    pub std: f64,
    pub ci95: (f64, f64),
}

impl SampleSummary {
    /// Returns `None` for an empty sample
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Some(Self {
            mean,
            std,
            ci95: (mean - Z_95 * std, mean + Z_95 * std),
        })
    }
}

/// [`SampleSummary`] extended with the shape of the distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeSummary {
    #[serde(flatten)]
    pub summary: SampleSummary,
    /// Sample skewness (biased estimator), NaN for a constant sample
    pub skewness: f64,
    /// Excess kurtosis (biased estimator), NaN for a constant sample
    pub kurtosis: f64,
}

impl ShapeSummary {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let summary = SampleSummary::from_samples(samples)?;
        let n = samples.len() as f64;
        let moment = |k: i32| {
            samples
                .iter()
                .map(|x| (x - summary.mean).powi(k))
                .sum::<f64>()
                / n
        };
        let m2 = moment(2);
        let (skewness, kurtosis) = if m2 > 0.0 {
            (moment(3) / m2.powf(1.5), moment(4) / (m2 * m2) - 3.0)
        } else {
            (f64::NAN, f64::NAN)
        };
        Some(Self {
            summary,
            skewness,
            kurtosis,
        })
    }
}

/// Speed and cross-track distributions of one edge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeStatistics {
    /// Transit speeds, one per passage
    pub speed_samples: Vec<f64>,
    /// Signed cross-track distances, several per passage
    pub cross_track_samples: Vec<f64>,
    pub speed: Option<SampleSummary>,
    pub cross_track: Option<ShapeSummary>,
}

impl EdgeStatistics {
    pub fn from_samples(speed_samples: Vec<f64>, cross_track_samples: Vec<f64>) -> Self {
        Self {
            speed: SampleSummary::from_samples(&speed_samples),
            cross_track: ShapeSummary::from_samples(&cross_track_samples),
            speed_samples,
            cross_track_samples,
        }
    }
}
