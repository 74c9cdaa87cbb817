//! Depth-cost model and latency prediction
//!
//! Calibration: a profile of a balanced tree yields per-unit durations,
//! bucketed by how many leaves each unit spans. Leaf cost is scaled from the
//! calibration window to the target window; fusion cost is modelled as linear
//! in log2 of the children count.
//!
//! Prediction: [`LatencyPredictor`] walks the leaves of a candidate tree and
//! reports the worst pipelined completion time.

mod buckets;
mod latency;

pub use buckets::BucketedSamples;
pub use latency::{FusionDepth, LatencyPrediction, LatencyPredictor, DEFAULT_MAX_TREE_LEAF_SIZE};

use crate::fit::{least_squares, Table};
use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Which non-trivial buckets the fusion line is fitted through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitStrategy {
    /// Smallest and largest children count only
    #[default]
    Endpoints,
    /// Ordinary least squares over every children count above 1
    LeastSquares,
}

/// Fitted leaf and fusion costs, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthCostModel {
    /// Time to decode one leaf of the target window size
    pub leaf_partition_time: f64,
    /// Fusion time at depth 0 of the fitted line
    pub fusion_intercept: f64,
    /// Additional fusion time per unit of depth
    pub fusion_slope: f64,
}

impl DepthCostModel {
    /// Model with known coefficients
    pub fn new(leaf_partition_time: f64, fusion_intercept: f64, fusion_slope: f64) -> Self {
        Self {
            leaf_partition_time,
            fusion_intercept,
            fusion_slope,
        }
    }

    /// Fit through the two endpoint buckets
    ///
    /// `observed_delta_t` is the rounds per leaf in the calibration profile,
    /// `target_delta_t` the rounds per leaf of the trees to be predicted.
    pub fn fit(samples: &BucketedSamples, observed_delta_t: f64, target_delta_t: f64) -> Result<Self> {
        Self::fit_with(samples, observed_delta_t, target_delta_t, FitStrategy::Endpoints)
    }

    /// Fit with an explicit strategy
    pub fn fit_with(
        samples: &BucketedSamples,
        observed_delta_t: f64,
        target_delta_t: f64,
        strategy: FitStrategy,
    ) -> Result<Self> {
        let averages = samples
            .children_counts()
            .map(|count| Ok((count, samples.average(count)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Self::from_averages(&averages, observed_delta_t, target_delta_t, strategy)
    }

    /// Fit from a saved children-count table
    ///
    /// Reads the `children_count` and `average_time` columns, falling back to
    /// the first two columns when the titles are absent.
    pub fn from_table(
        table: &Table,
        observed_delta_t: f64,
        target_delta_t: f64,
        strategy: FitStrategy,
    ) -> Result<Self> {
        let count_col = table.column_index("children_count").unwrap_or(0);
        let average_col = table.column_index("average_time").unwrap_or(1);

        let mut averages = BTreeMap::new();
        for (row_index, row) in table.rows().iter().enumerate() {
            let cell = |col: usize| {
                row.get(col).ok_or(AnalysisError::Index {
                    index: col as i64,
                    bound: row.len(),
                })
            };
            let parse_error = |message: String| AnalysisError::Parse {
                line: row_index + 1,
                message,
            };
            let count: usize = cell(count_col)?
                .parse()
                .map_err(|e| parse_error(format!("children count: {e}")))?;
            let average: f64 = cell(average_col)?
                .parse()
                .map_err(|e| parse_error(format!("average time: {e}")))?;
            averages.insert(count, average);
        }
        Self::from_averages(&averages, observed_delta_t, target_delta_t, strategy)
    }

    fn from_averages(
        averages: &BTreeMap<usize, f64>,
        observed_delta_t: f64,
        target_delta_t: f64,
        strategy: FitStrategy,
    ) -> Result<Self> {
        if observed_delta_t == 0.0 {
            return Err(AnalysisError::EmptyData(
                "observed_delta_t is zero; cannot scale leaf time".into(),
            ));
        }
        let leaf_average = *averages.get(&1).ok_or_else(|| {
            AnalysisError::EmptyData("no leaf samples (children count 1)".into())
        })?;

        let fusions: Vec<(usize, f64)> = averages.range(2..).map(|(&c, &avg)| (c, avg)).collect();
        let (&(c_min, _), &(c_max, _)) = match (fusions.first(), fusions.last()) {
            (Some(first), Some(last)) if fusions.len() >= 2 => (first, last),
            _ => {
                return Err(AnalysisError::EmptyData(format!(
                    "fusion fit needs two children counts above 1, found {}",
                    fusions.len()
                )))
            }
        };

        let log_min = (c_min as f64).log2();
        let point = |&(count, average): &(usize, f64)| ((count as f64).log2() - log_min, average);
        let points: Vec<(f64, f64)> = match strategy {
            FitStrategy::Endpoints => [fusions[0], fusions[fusions.len() - 1]]
                .iter()
                .map(point)
                .collect(),
            FitStrategy::LeastSquares => fusions.iter().map(point).collect(),
        };
        debug!(c_min, c_max, ?strategy, points = points.len(), "fitting fusion time");
        let line = least_squares(&points)?;

        let model = Self {
            leaf_partition_time: leaf_average / observed_delta_t * target_delta_t,
            fusion_intercept: line.intercept,
            fusion_slope: line.slope,
        };
        info!(
            leaf_partition_time = model.leaf_partition_time,
            fusion_intercept = model.fusion_intercept,
            fusion_slope = model.fusion_slope,
            "fitted depth-cost model"
        );
        Ok(model)
    }

    /// Fusion time at `depth`: `intercept + slope * depth`
    #[inline]
    pub fn fusion_time(&self, depth: f64) -> f64 {
        self.fusion_intercept + self.fusion_slope * depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
    }

    fn calibration() -> BucketedSamples {
        [
            (1, 1.5e-3),
            (1, 2.5e-3),
            (2, 1e-4),
            (4, 2e-4),
            (8, 2.5e-4),
            (8, 3.5e-4),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_endpoint_fit() {
        let model = DepthCostModel::fit(&calibration(), 100.0, 20.0).unwrap();
        assert!(close(model.leaf_partition_time, 4e-4));
        assert!(close(model.fusion_intercept, 1e-4));
        assert!(close(model.fusion_slope, 1e-4));
        assert!(close(model.fusion_time(3.0), 4e-4));
    }

    #[test]
    fn test_least_squares_uses_every_bucket() {
        let samples: BucketedSamples =
            [(1, 1.0), (2, 1.0), (4, 2.0), (8, 3.0), (16, 10.0)].into_iter().collect();

        let endpoints = DepthCostModel::fit(&samples, 1.0, 1.0).unwrap();
        assert!(close(endpoints.fusion_slope, 3.0));
        assert!(close(endpoints.fusion_intercept, 1.0));

        let ls = DepthCostModel::fit_with(&samples, 1.0, 1.0, FitStrategy::LeastSquares).unwrap();
        assert!(close(ls.fusion_slope, 2.8));
        assert!(close(ls.fusion_intercept, -0.2));
    }

    #[test]
    fn test_strategies_agree_on_two_buckets() {
        let samples: BucketedSamples = [(1, 1.0), (2, 0.5), (32, 2.5)].into_iter().collect();
        let endpoints = DepthCostModel::fit(&samples, 10.0, 10.0).unwrap();
        let ls = DepthCostModel::fit_with(&samples, 10.0, 10.0, FitStrategy::LeastSquares).unwrap();
        assert!(close(endpoints.fusion_slope, ls.fusion_slope));
        assert!(close(endpoints.fusion_intercept, ls.fusion_intercept));
        assert!(close(endpoints.fusion_slope, 0.5));
    }

    #[test]
    fn test_fit_from_saved_table() {
        let table = calibration().to_table().unwrap();
        let model = DepthCostModel::from_table(&table, 100.0, 20.0, FitStrategy::Endpoints).unwrap();
        assert!((model.leaf_partition_time - 4e-4).abs() < 1e-9);
        assert!((model.fusion_slope - 1e-4).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_buckets() {
        let no_leaf: BucketedSamples = [(2, 1.0), (4, 2.0)].into_iter().collect();
        assert!(matches!(
            DepthCostModel::fit(&no_leaf, 1.0, 1.0),
            Err(AnalysisError::EmptyData(_))
        ));

        let leaves_only: BucketedSamples = [(1, 1.0)].into_iter().collect();
        assert!(matches!(
            DepthCostModel::fit(&leaves_only, 1.0, 1.0),
            Err(AnalysisError::EmptyData(_))
        ));

        let one_fusion: BucketedSamples = [(1, 1.0), (4, 2.0)].into_iter().collect();
        assert!(matches!(
            DepthCostModel::fit(&one_fusion, 1.0, 1.0),
            Err(AnalysisError::EmptyData(_))
        ));
    }

    #[test]
    fn test_zero_observed_window() {
        assert!(matches!(
            DepthCostModel::fit(&calibration(), 0.0, 20.0),
            Err(AnalysisError::EmptyData(_))
        ));
    }

    #[test]
    fn test_model_serializes() {
        let model = DepthCostModel::new(1.0, 2.0, 3.0);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(
            json,
            r#"{"leaf_partition_time":1.0,"fusion_intercept":2.0,"fusion_slope":3.0}"#
        );
    }
}
