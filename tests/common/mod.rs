#![allow(dead_code)]

use fusion_planner::{Entry, EventTime, PartitionConfig};
use serde_json::{json, Value};

pub const VERTICES_PER_PARTITION: usize = 10;

/// Tree over `partition_count` equal partitions, fusing the oldest two
/// unfused units first (balanced when the count is a power of two).
pub fn balanced_tree(partition_count: usize) -> PartitionConfig {
    let mut pending: std::collections::VecDeque<usize> = (0..partition_count).collect();
    let mut builder = PartitionConfig::builder(partition_count * VERTICES_PER_PARTITION);
    for leaf in 0..partition_count {
        builder = builder.partition(
            leaf * VERTICES_PER_PARTITION,
            (leaf + 1) * VERTICES_PER_PARTITION,
        );
    }
    let mut next_unit = partition_count;
    while pending.len() > 1 {
        let left = pending.pop_front().expect("pending has two units");
        let right = pending.pop_front().expect("pending has two units");
        builder = builder.fusion(left, right);
        pending.push_back(next_unit);
        next_unit += 1;
    }
    builder.build().expect("balanced tree is valid")
}

/// Tree built by fusing the pair picked by `choices` from the unfused units.
///
/// Any choice sequence yields a valid tree; extra or missing choices are
/// tolerated.
pub fn tree_from_choices(partition_count: usize, choices: &[(usize, usize)]) -> PartitionConfig {
    let mut roots: Vec<usize> = (0..partition_count).collect();
    let mut builder = PartitionConfig::builder(partition_count * VERTICES_PER_PARTITION);
    for leaf in 0..partition_count {
        builder = builder.partition(
            leaf * VERTICES_PER_PARTITION,
            (leaf + 1) * VERTICES_PER_PARTITION,
        );
    }
    let mut next_unit = partition_count;
    let mut step = 0;
    while roots.len() > 1 {
        let (a, b) = choices.get(step).copied().unwrap_or((0, 1));
        let first = a % roots.len();
        let mut second = b % (roots.len() - 1);
        if second >= first {
            second += 1;
        }
        let (left, right) = (roots[first], roots[second]);
        roots.retain(|&unit| unit != left && unit != right);
        builder = builder.fusion(left, right);
        roots.push(next_unit);
        next_unit += 1;
        step += 1;
    }
    builder.build().expect("choice tree is valid")
}

/// One entry whose unit durations are `leaf_time` for leaves and
/// `fusion_time(children_count)` for fusions.
pub fn synthetic_entry(
    tree: &PartitionConfig,
    decoding_time: f64,
    leaf_time: f64,
    fusion_time: impl Fn(usize) -> f64,
) -> Entry {
    let times = tree
        .children_counts()
        .iter()
        .map(|&count| {
            let duration = if count == 1 { leaf_time } else { fusion_time(count) };
            EventTime {
                start: 0.0,
                end: duration,
                children_return: 0.0,
            }
        })
        .collect();
    Entry::new(decoding_time, tree.partition_count() as u64).with_event_times(times)
}

/// Newline-delimited JSON profile text, blank-line terminated
pub fn profile_text(tree: &PartitionConfig, benchmark_config: &Value, entries: &[Entry]) -> String {
    let mut lines = vec![
        serde_json::to_string(&tree.layout()).expect("layout serializes"),
        benchmark_config.to_string(),
    ];
    lines.extend(
        entries
            .iter()
            .map(|entry| serde_json::to_string(entry).expect("entry serializes")),
    );
    lines.push(String::new());
    lines.push(String::new());
    lines.join("\n")
}

pub fn default_benchmark_config() -> Value {
    json!({"noisy_measurements": 99, "thread_pool_size": 4})
}
