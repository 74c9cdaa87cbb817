//! # Latency Planning for Partition-Fusion Trees
//!
//! A streaming workload is cut into P leaf partitions, each covering a fixed
//! window of input. Leaves are decoded independently and then fused pairwise
//! until a single root remains. This crate validates such trees and predicts
//! their pipelined end-to-end latency from measured timing profiles.
//!
//! ## Pipeline
//!
//! 1. **Tree**: build an immutable [`PartitionConfig`] from partitions and fusions
//! 2. **Ingest**: read a newline-delimited JSON [`Profile`]
//! 3. **Aggregate**: scalar statistics over the retained entries ([`stats`])
//! 4. **Model**: fit a [`DepthCostModel`] from per-unit samples bucketed by
//!    children count
//! 5. **Predict**: worst-case pipelined latency over a candidate tree
//!    ([`LatencyPredictor`])
//!
//! ## Usage Example
//!
//! ```ignore
//! use fusion_planner::{BucketedSamples, DepthCostModel, LatencyPredictor, PartitionConfig, Profile};
//!
//! let calibration = Profile::from_path("balance_tree.profile", 20)?;
//! let samples = BucketedSamples::from_profile(&calibration)?;
//! let model = DepthCostModel::fit(&samples, 100.0, 20.0)?;
//!
//! let tree = PartitionConfig::builder(40)
//!     .partition(0, 10).partition(10, 20).partition(20, 30).partition(30, 40)
//!     .fusion(0, 1).fusion(2, 3).fusion(4, 5)
//!     .build()?;
//! let prediction = LatencyPredictor::new(&model, 1e-6).predict(&tree, 4)?;
//! println!("{:.3e}s (bottleneck leaf {})", prediction.predicted_latency, prediction.bottleneck);
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![forbid(unsafe_code)]

pub mod fit;     // Ordinary least squares over tabular rows
pub mod model;   // Depth-cost model and latency prediction
pub mod profile; // Newline-delimited JSON profile ingestion
pub mod stats;   // Aggregation over retained profile entries
pub mod tree;    // Partition/fusion tree

pub use fit::{linear_fit, Cell, FitOptions, LinearFit, Table};
pub use model::{
    BucketedSamples, DepthCostModel, FitStrategy, FusionDepth, LatencyPrediction,
    LatencyPredictor, DEFAULT_MAX_TREE_LEAF_SIZE,
};
pub use profile::{Entry, EventTime, Profile, DEFAULT_SKIP};
pub use stats::Summary;
pub use tree::{PartitionConfig, PartitionConfigBuilder, PartitionLayout, VertexRange};

use thiserror::Error;

/// Canonical result for every analysis in this crate.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Parameters shared by a single analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Leading entries discarded to remove cold-start effects
    pub skip: usize,

    /// Seconds per measurement round
    pub measurement_cycle: f64,

    /// Rounds per leaf in the calibration profile
    pub observed_delta_t: f64,

    /// Rounds per leaf in the tree under analysis
    pub target_delta_t: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            skip: DEFAULT_SKIP,
            measurement_cycle: 1e-6,
            observed_delta_t: 100.0,
            target_delta_t: 20.0,
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by environment variables.
    ///
    /// Environment variables:
    /// - `FUSION_PLANNER_SKIP`: cold-start entries to discard
    /// - `FUSION_PLANNER_MEASUREMENT_CYCLE`: seconds per measurement round
    /// - `FUSION_PLANNER_OBSERVED_DELTA_T`: rounds per leaf when calibrating
    /// - `FUSION_PLANNER_TARGET_DELTA_T`: rounds per leaf under analysis
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("FUSION_PLANNER_SKIP") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.skip = v;
            }
        }

        if let Ok(s) = std::env::var("FUSION_PLANNER_MEASUREMENT_CYCLE") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.measurement_cycle = v;
            }
        }

        if let Ok(s) = std::env::var("FUSION_PLANNER_OBSERVED_DELTA_T") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.observed_delta_t = v;
            }
        }

        if let Ok(s) = std::env::var("FUSION_PLANNER_TARGET_DELTA_T") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.target_delta_t = v;
            }
        }

        cfg
    }

    /// Reject cycles and window sizes that are not strictly positive
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("measurement_cycle", self.measurement_cycle),
            ("observed_delta_t", self.observed_delta_t),
            ("target_delta_t", self.target_delta_t),
        ];
        for (name, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(AnalysisError::Format(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Errors that can occur while building trees, ingesting profiles, or
/// computing statistics
///
/// Every variant aborts the computation that raised it; there is no partial
/// result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A non-blank line of the profile stream is not valid JSON
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number in the stream (0 when not line-oriented)
        line: usize,
        /// Parser diagnostic
        message: String,
    },

    /// The stream does not have the expected layout
    #[error("format error: {0}")]
    Format(String),

    /// The partitions and fusions do not form a single binary tree
    #[error("malformed tree at unit {unit}: {reason}")]
    MalformedTree {
        /// Unit index at which the violation was detected
        unit: usize,
        /// Violated invariant
        reason: String,
    },

    /// A unit or column index lies outside the valid range
    #[error("index {index} out of range (valid: 0..{bound})")]
    Index {
        /// Offending index, as supplied
        index: i64,
        /// Exclusive upper bound (unit count or row width)
        bound: usize,
    },

    /// Profile or caller input disagrees with the tree shape
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// What was being compared
        context: String,
        /// Size implied by the tree
        expected: usize,
        /// Size actually supplied
        found: usize,
    },

    /// An entry lacks a field the statistic needs
    #[error("entry {entry} is missing {what}")]
    MissingData {
        /// Index of the retained entry
        entry: usize,
        /// Description of the missing field
        what: String,
    },

    /// Statistic requested over zero samples or with a zero denominator
    #[error("empty data: {0}")]
    EmptyData(String),

    /// Reading the input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.skip, 20);
        assert_eq!(config.measurement_cycle, 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_defaults() {
        std::env::set_var("FUSION_PLANNER_SKIP", "5");
        std::env::set_var("FUSION_PLANNER_MEASUREMENT_CYCLE", "2e-6");
        std::env::set_var("FUSION_PLANNER_OBSERVED_DELTA_T", "not a number");
        let config = AnalysisConfig::from_env();
        std::env::remove_var("FUSION_PLANNER_SKIP");
        std::env::remove_var("FUSION_PLANNER_MEASUREMENT_CYCLE");
        std::env::remove_var("FUSION_PLANNER_OBSERVED_DELTA_T");

        assert_eq!(config.skip, 5);
        assert_eq!(config.measurement_cycle, 2e-6);
        assert_eq!(config.observed_delta_t, 100.0);
        assert_eq!(config.target_delta_t, 20.0);
    }

    #[test]
    fn test_validate_rejects_zero_cycle() {
        let config = AnalysisConfig {
            measurement_cycle: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::Format(_))));
    }

    #[test]
    fn test_error_messages_name_location() {
        let err = AnalysisError::MalformedTree {
            unit: 4,
            reason: "unit already has a parent".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed tree at unit 4: unit already has a parent"
        );

        let err = AnalysisError::Parse {
            line: 3,
            message: "expected value".into(),
        };
        assert!(err.to_string().contains("line 3"));
    }
}
