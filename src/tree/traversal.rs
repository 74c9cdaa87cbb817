//! Derivation passes over the unit arena
//!
//! Units are plain indices: leaves 0..P, fusion i creates unit P+i.
//! Children always precede their parent, so:
//!   forward pass (index order)  -> children counts
//!   backward pass (reverse)     -> depths
//! No recursion and no cycle detection are needed.

use crate::{AnalysisError, Result};

/// Unit count for `partition_count` leaves: 2P-1
#[inline]
pub fn unit_count(partition_count: usize) -> usize {
    (2 * partition_count).saturating_sub(1)
}

fn to_signed(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// Derive the immediate parent of every unit
///
/// Validates, in order: at least one partition, exactly P-1 fusions, and for
/// each fusion that both operands are in range, strictly precede the unit
/// being created, are distinct, and have not been fused before. Finally the
/// last unit must be the only one without a parent.
pub fn derive_parents(
    partition_count: usize,
    fusions: &[(usize, usize)],
) -> Result<Vec<Option<usize>>> {
    if partition_count == 0 {
        return Err(AnalysisError::MalformedTree {
            unit: 0,
            reason: "no partitions".to_string(),
        });
    }
    if fusions.len() != partition_count - 1 {
        return Err(AnalysisError::MalformedTree {
            unit: partition_count,
            reason: format!(
                "wrong fusion-list length: {} partitions need {} fusions, found {}",
                partition_count,
                partition_count - 1,
                fusions.len()
            ),
        });
    }

    let total = unit_count(partition_count);
    let mut parents: Vec<Option<usize>> = vec![None; total];

    for (fusion_index, &(left, right)) in fusions.iter().enumerate() {
        let new_unit = partition_count + fusion_index;

        for operand in [left, right] {
            if operand >= total {
                return Err(AnalysisError::Index {
                    index: to_signed(operand),
                    bound: total,
                });
            }
            if operand >= new_unit {
                return Err(AnalysisError::MalformedTree {
                    unit: new_unit,
                    reason: format!("forward or self reference to unit {operand}"),
                });
            }
        }
        if left == right {
            return Err(AnalysisError::MalformedTree {
                unit: new_unit,
                reason: format!("unit {left} fused with itself"),
            });
        }
        for operand in [left, right] {
            if let Some(existing) = parents[operand] {
                return Err(AnalysisError::MalformedTree {
                    unit: new_unit,
                    reason: format!("unit already has a parent: {operand} is fused into {existing}"),
                });
            }
        }

        parents[left] = Some(new_unit);
        parents[right] = Some(new_unit);
    }

    let root = total - 1;
    for (unit, parent) in parents.iter().enumerate() {
        if (unit == root) != parent.is_none() {
            return Err(AnalysisError::MalformedTree {
                unit,
                reason: "disconnected forest or multiple roots".to_string(),
            });
        }
    }

    Ok(parents)
}

/// Forward pass: number of leaves under every unit
///
/// Leaves count 1; a fusion unit counts the sum of its two children. Expects
/// fusions that only reference earlier units (see [`derive_parents`]);
/// out-of-range operands contribute nothing.
pub fn derive_children_counts(partition_count: usize, fusions: &[(usize, usize)]) -> Vec<usize> {
    let mut counts = Vec::with_capacity(partition_count + fusions.len());
    counts.resize(partition_count, 1);
    for &(left, right) in fusions {
        let sum = counts.get(left).copied().unwrap_or(0) + counts.get(right).copied().unwrap_or(0);
        counts.push(sum);
    }
    counts
}

/// Backward pass: distance from every unit to the root
///
/// Parents always carry larger indices than their children, so visiting
/// units in reverse order sees each parent's depth before its children.
pub fn derive_depths(parents: &[Option<usize>]) -> Vec<usize> {
    let mut depths = vec![0; parents.len()];
    for unit in (0..parents.len()).rev() {
        if let Some(parent) = parents[unit] {
            depths[unit] = depths.get(parent).map_or(0, |d| d + 1);
        }
    }
    depths
}

/// Iterator over the strict ancestors of a unit, nearest first
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    parents: &'a [Option<usize>],
    current: Option<usize>,
}

impl<'a> Ancestors<'a> {
    /// Start above `unit`
    pub fn new(parents: &'a [Option<usize>], unit: usize) -> Self {
        Self {
            parents,
            current: parents.get(unit).copied().flatten(),
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let unit = self.current?;
        self.current = self.parents.get(unit).copied().flatten();
        Some(unit)
    }
}
