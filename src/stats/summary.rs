//! Descriptive statistics over a sample set

use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Count, mean, population deviation, and order statistics of a sample set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
    /// Median (mean of the two middle samples for even counts)
    pub median: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl Summary {
    /// Summarize `samples`; fails with `EmptyData` when there are none
    pub fn from_samples(samples: &[f64]) -> Result<Self> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyData("no samples to summarize".into()));
        }
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        Ok(Self {
            count,
            mean,
            stddev: variance.sqrt(),
            median,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }

    /// Standard deviation divided by the mean
    pub fn relative_dev(&self) -> Result<f64> {
        if self.mean == 0.0 {
            return Err(AnalysisError::EmptyData(
                "relative deviation of a zero mean".into(),
            ));
        }
        Ok(self.stddev / self.mean)
    }
}
