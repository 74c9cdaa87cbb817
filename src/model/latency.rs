//! Worst-case pipelined latency of a partition/fusion tree
//!
//! Leaves become ready one measurement cycle apart in reverse index order:
//! the last leaf (unit P-1) is ready last, so it is reverse position 0, and
//! leaf P-1-j had `j` cycles of head start. Each leaf's result then passes
//! through `depth` fusions on its way to the root.

use super::DepthCostModel;
use crate::tree::PartitionConfig;
use crate::{AnalysisError, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Leaf count of the largest subtree a partitioner may build
pub const DEFAULT_MAX_TREE_LEAF_SIZE: usize = 100;

/// Depth at which fusion time is evaluated for each leaf's path
///
/// Defaults to [`FusionDepth::balanced_subtree`] of
/// [`DEFAULT_MAX_TREE_LEAF_SIZE`]: one average fusion time shared by every
/// leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionDepth {
    /// The leaf's own depth
    AtLeafDepth,
    /// One fixed depth for every leaf
    Fixed(f64),
}

impl Default for FusionDepth {
    fn default() -> Self {
        Self::balanced_subtree(DEFAULT_MAX_TREE_LEAF_SIZE)
    }
}

impl FusionDepth {
    /// Average depth of a balanced subtree with `max_leaf_size` leaves
    ///
    /// `log2(max_leaf_size) / 2`; sizes of 0 and 1 give depth 0.
    pub fn balanced_subtree(max_leaf_size: usize) -> Self {
        Self::Fixed((max_leaf_size.max(1) as f64).log2() / 2.0)
    }

    #[inline]
    fn resolve(self, leaf_depth: usize) -> f64 {
        match self {
            Self::AtLeafDepth => leaf_depth as f64,
            Self::Fixed(depth) => depth,
        }
    }
}

/// Outcome of [`LatencyPredictor::predict`]
///
/// `predicted_latency` is the largest candidate as is; it is not floored at
/// zero, so a tree whose candidates are all negative reports a negative value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyPrediction {
    /// Maximum candidate latency, in seconds
    pub predicted_latency: f64,
    /// Reverse leaf position of the first maximizing candidate
    pub bottleneck: usize,
    /// Unit index of that leaf (`P - 1 - bottleneck`)
    pub bottleneck_unit: usize,
    /// Candidate latency per reverse position
    pub candidates: Vec<f64>,
}

/// Evaluates candidate trees against a fitted model
#[derive(Debug, Clone, Copy)]
pub struct LatencyPredictor<'a> {
    model: &'a DepthCostModel,
    measurement_cycle: f64,
    fusion_depth: FusionDepth,
}

impl<'a> LatencyPredictor<'a> {
    /// Predictor with the default [`FusionDepth`]
    pub fn new(model: &'a DepthCostModel, measurement_cycle: f64) -> Self {
        Self {
            model,
            measurement_cycle,
            fusion_depth: FusionDepth::default(),
        }
    }

    /// Override where fusion time is evaluated
    pub fn with_fusion_depth(mut self, fusion_depth: FusionDepth) -> Self {
        self.fusion_depth = fusion_depth;
        self
    }

    /// Fitted model in use
    pub fn model(&self) -> &DepthCostModel {
        self.model
    }

    /// Seconds between successive leaves becoming ready
    pub fn measurement_cycle(&self) -> f64 {
        self.measurement_cycle
    }

    /// Fusion depth policy
    pub fn fusion_depth(&self) -> FusionDepth {
        self.fusion_depth
    }

    /// Predict the latency of `tree`, which must have `leaf_count` leaves
    ///
    /// `candidate(j) = leaf_time + depth_j * fusion_time(d) - j * cycle` for
    /// the leaf at reverse position `j`; the prediction is the maximum.
    pub fn predict(&self, tree: &PartitionConfig, leaf_count: usize) -> Result<LatencyPrediction> {
        let partition_count = tree.partition_count();
        if partition_count != leaf_count {
            return Err(AnalysisError::ShapeMismatch {
                context: "leaf count".into(),
                expected: partition_count,
                found: leaf_count,
            });
        }

        let depths = tree.depths();
        let mut candidates = Vec::with_capacity(leaf_count);
        let mut warned = false;

        for j in 0..leaf_count {
            let depth = depths[leaf_count - 1 - j];
            let fusion_time = self.model.fusion_time(self.fusion_depth.resolve(depth));
            if fusion_time < 0.0 && !warned {
                warn!(
                    fusion_time,
                    depth, "negative fusion time; the model is extrapolating"
                );
                warned = true;
            }
            candidates.push(
                self.model.leaf_partition_time + depth as f64 * fusion_time
                    - j as f64 * self.measurement_cycle,
            );
        }

        let mut bottleneck = 0;
        for (j, &candidate) in candidates.iter().enumerate().skip(1) {
            if candidate > candidates[bottleneck] {
                bottleneck = j;
            }
        }
        let prediction = LatencyPrediction {
            predicted_latency: candidates[bottleneck],
            bottleneck,
            bottleneck_unit: leaf_count - 1 - bottleneck,
            candidates,
        };

        debug!(candidates = ?prediction.candidates, "latency candidates");
        info!(
            predicted_latency = prediction.predicted_latency,
            bottleneck = prediction.bottleneck,
            unit = prediction.bottleneck_unit,
            height = tree.height(),
            "predicted latency"
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::VertexRange;

    fn balanced() -> PartitionConfig {
        PartitionConfig::builder(40)
            .partition(0, 10)
            .partition(10, 20)
            .partition(20, 30)
            .partition(30, 40)
            .fusion(0, 1)
            .fusion(2, 3)
            .fusion(4, 5)
            .build()
            .unwrap()
    }

    fn chain() -> PartitionConfig {
        PartitionConfig::builder(30)
            .partition(0, 10)
            .partition(10, 20)
            .partition(20, 30)
            .fusion(0, 1)
            .fusion(2, 3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_balanced_tree_last_leaf_is_bottleneck() {
        let model = DepthCostModel::new(1e-3, 1e-4, 5e-5);
        let prediction = LatencyPredictor::new(&model, 1e-6)
            .with_fusion_depth(FusionDepth::AtLeafDepth)
            .predict(&balanced(), 4)
            .unwrap();
        // fusion_time(2) = 2e-4, every leaf at depth 2
        assert!((prediction.predicted_latency - 1.4e-3).abs() < 1e-15);
        assert_eq!(prediction.bottleneck, 0);
        assert_eq!(prediction.bottleneck_unit, 3);
        assert_eq!(prediction.candidates.len(), 4);
    }

    #[test]
    fn test_deeper_early_leaf_wins() {
        // depths [2, 2, 1, 1, 0]; leaf 2 is shallow, leaves 1 and 0 are deep
        let model = DepthCostModel::new(1.0, 1.0, 0.0);
        let prediction = LatencyPredictor::new(&model, 0.1)
            .predict(&chain(), 3)
            .unwrap();
        let expected = [2.0, 2.9, 2.8];
        for (got, want) in prediction.candidates.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(prediction.bottleneck, 1);
        assert_eq!(prediction.bottleneck_unit, 1);
    }

    #[test]
    fn test_ties_pick_first_position() {
        let model = DepthCostModel::new(1.0, 0.5, 0.0);
        let prediction = LatencyPredictor::new(&model, 0.0)
            .predict(&balanced(), 4)
            .unwrap();
        assert_eq!(prediction.bottleneck, 0);
        assert_eq!(prediction.predicted_latency, 2.0);
    }

    #[test]
    fn test_fixed_fusion_depth() {
        let model = DepthCostModel::new(1.0, 1.0, 1.0);
        assert_eq!(FusionDepth::balanced_subtree(16), FusionDepth::Fixed(2.0));
        assert_eq!(FusionDepth::balanced_subtree(0), FusionDepth::Fixed(0.0));

        let prediction = LatencyPredictor::new(&model, 0.0)
            .with_fusion_depth(FusionDepth::balanced_subtree(16))
            .predict(&balanced(), 4)
            .unwrap();
        // 1 + 2 * fusion_time(2)
        assert_eq!(prediction.predicted_latency, 7.0);
    }

    #[test]
    fn test_default_shares_average_fusion_time() {
        let tree = PartitionConfig::builder(80)
            .partitions((0..8).map(|leaf| VertexRange::new(leaf * 10, leaf * 10 + 10)))
            .fusion(0, 1)
            .fusion(2, 3)
            .fusion(4, 5)
            .fusion(6, 7)
            .fusion(8, 9)
            .fusion(10, 11)
            .fusion(12, 13)
            .build()
            .unwrap();
        let model = DepthCostModel::new(4e-4, 1e-4, 1e-4);
        let predictor = LatencyPredictor::new(&model, 1e-6);
        assert_eq!(predictor.fusion_depth(), FusionDepth::balanced_subtree(100));

        // every leaf at depth 3; fusion_time(log2(100) / 2) for each of them
        let prediction = predictor.predict(&tree, 8).unwrap();
        let average_fusion_time = 1e-4 + 1e-4 * 100f64.log2() / 2.0;
        let expected = 4e-4 + 3.0 * average_fusion_time;
        assert!((prediction.predicted_latency - expected).abs() < 1e-15);
        assert!((prediction.predicted_latency - 1.69658e-3).abs() < 1e-8);
        assert_eq!(prediction.bottleneck, 0);

        let at_leaf = predictor
            .with_fusion_depth(FusionDepth::AtLeafDepth)
            .predict(&tree, 8)
            .unwrap();
        assert!((at_leaf.predicted_latency - 1.6e-3).abs() < 1e-15);
    }

    #[test]
    fn test_all_negative_candidates_are_not_floored() {
        let model = DepthCostModel::new(-1.0, 0.0, 0.0);
        let prediction = LatencyPredictor::new(&model, 0.5)
            .predict(&balanced(), 4)
            .unwrap();
        assert_eq!(prediction.predicted_latency, -1.0);
        assert_eq!(prediction.bottleneck, 0);
    }

    #[test]
    fn test_single_partition_is_leaf_time() {
        let model = DepthCostModel::new(0.25, 9.0, 9.0);
        let tree = PartitionConfig::single(10);
        let prediction = LatencyPredictor::new(&model, 1.0).predict(&tree, 1).unwrap();
        assert_eq!(prediction.predicted_latency, 0.25);
        assert_eq!(prediction.bottleneck_unit, 0);
    }

    #[test]
    fn test_negative_fusion_time_is_not_clamped() {
        let model = DepthCostModel::new(1.0, -1.0, 0.0);
        let prediction = LatencyPredictor::new(&model, 0.0)
            .predict(&balanced(), 4)
            .unwrap();
        assert_eq!(prediction.predicted_latency, -1.0);
    }

    #[test]
    fn test_leaf_count_mismatch() {
        let model = DepthCostModel::new(1.0, 1.0, 1.0);
        assert!(matches!(
            LatencyPredictor::new(&model, 0.0).predict(&balanced(), 3),
            Err(AnalysisError::ShapeMismatch {
                expected: 4,
                found: 3,
                ..
            })
        ));
    }
}
