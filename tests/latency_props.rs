mod common;

use common::tree_from_choices;
use fusion_planner::{DepthCostModel, FusionDepth, LatencyPredictor, PartitionConfig};
use proptest::prelude::*;

fn arbitrary_tree() -> impl Strategy<Value = PartitionConfig> {
    (1usize..64).prop_flat_map(|partitions| {
        proptest::collection::vec((0usize..1024, 0usize..1024), partitions.saturating_sub(1))
            .prop_map(move |choices| tree_from_choices(partitions, &choices))
    })
}

fn arbitrary_model() -> impl Strategy<Value = DepthCostModel> {
    (1e-6f64..1e-2, 0.0f64..1e-3, 0.0f64..1e-3)
        .prop_map(|(leaf, intercept, slope)| DepthCostModel::new(leaf, intercept, slope))
}

proptest! {
    #[test]
    fn longer_cycles_never_increase_latency(
        tree in arbitrary_tree(),
        model in arbitrary_model(),
        short in 0.0f64..1e-4,
        extra in 0.0f64..1e-4,
    ) {
        let p = tree.partition_count();
        let fast = LatencyPredictor::new(&model, short).predict(&tree, p).unwrap();
        let slow = LatencyPredictor::new(&model, short + extra).predict(&tree, p).unwrap();
        prop_assert!(slow.predicted_latency <= fast.predicted_latency);
    }

    #[test]
    fn bottleneck_is_first_maximum(
        tree in arbitrary_tree(),
        model in arbitrary_model(),
        cycle in 0.0f64..1e-4,
    ) {
        let p = tree.partition_count();
        let prediction = LatencyPredictor::new(&model, cycle).predict(&tree, p).unwrap();
        prop_assert_eq!(prediction.candidates.len(), p);
        prop_assert_eq!(prediction.bottleneck_unit, p - 1 - prediction.bottleneck);
        prop_assert_eq!(prediction.candidates[prediction.bottleneck], prediction.predicted_latency);
        for (j, &candidate) in prediction.candidates.iter().enumerate() {
            prop_assert!(candidate <= prediction.predicted_latency);
            if j < prediction.bottleneck {
                prop_assert!(candidate < prediction.predicted_latency);
            }
        }
    }

    #[test]
    fn last_leaf_bounds_latency_from_below(
        tree in arbitrary_tree(),
        model in arbitrary_model(),
        cycle in 0.0f64..1e-4,
    ) {
        let p = tree.partition_count();
        let depth = tree.unit_depth(p - 1).unwrap() as f64;
        let prediction = LatencyPredictor::new(&model, cycle)
            .with_fusion_depth(FusionDepth::AtLeafDepth)
            .predict(&tree, p)
            .unwrap();
        let last_leaf = model.leaf_partition_time + depth * model.fusion_time(depth);
        prop_assert!(prediction.predicted_latency >= last_leaf);
    }

    #[test]
    fn default_depth_is_balanced_subtree_of_hundred(
        tree in arbitrary_tree(),
        model in arbitrary_model(),
        cycle in 0.0f64..1e-4,
    ) {
        let p = tree.partition_count();
        let default = LatencyPredictor::new(&model, cycle).predict(&tree, p).unwrap();
        let explicit = LatencyPredictor::new(&model, cycle)
            .with_fusion_depth(FusionDepth::balanced_subtree(100))
            .predict(&tree, p)
            .unwrap();
        prop_assert_eq!(default, explicit);
    }

    #[test]
    fn fixed_depth_matches_hand_computation(
        tree in arbitrary_tree(),
        model in arbitrary_model(),
        max_leaf_size in 1usize..256,
    ) {
        let p = tree.partition_count();
        let fusion_depth = FusionDepth::balanced_subtree(max_leaf_size);
        let FusionDepth::Fixed(d) = fusion_depth else {
            panic!("balanced subtree depth is fixed");
        };
        let prediction = LatencyPredictor::new(&model, 0.0)
            .with_fusion_depth(fusion_depth)
            .predict(&tree, p)
            .unwrap();
        let expected = model.leaf_partition_time + tree.height() as f64 * model.fusion_time(d);
        prop_assert!((prediction.predicted_latency - expected).abs() <= 1e-15);
    }
}
