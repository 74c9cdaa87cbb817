//! Partition/fusion tree
//!
//! P leaf partitions are fused pairwise into 2P-1 units:
//!   units 0..P       leaves, in partition order
//!   unit P+i         result of fusion i
//!   unit 2P-2        root
//!
//! The tree is an arena of indices. Parents and children counts are derived
//! once at construction and never mutated.

mod range;
mod traversal;

pub use range::{VertexIndex, VertexRange};
pub use traversal::{derive_children_counts, derive_depths, derive_parents, unit_count, Ancestors};

use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Partition layout as it appears on the wire
///
/// `{"vertex_num": int, "partitions": [[start,end], ...], "fusions": [[left,right], ...]}`
///
/// Fusion indices are signed so that negative values surface as
/// [`AnalysisError::Index`] rather than a JSON type error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLayout {
    /// Size of the vertex index space (informational)
    pub vertex_num: usize,

    /// Leaf ranges, defining leaf unit indices in order
    pub partitions: Vec<VertexRange>,

    /// Fusion pairs; fusion i creates unit `partitions.len() + i`
    #[serde(default)]
    pub fusions: Vec<(i64, i64)>,
}

/// Validated, immutable partition/fusion tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PartitionLayout", into = "PartitionLayout")]
pub struct PartitionConfig {
    vertex_num: usize,
    partitions: Vec<VertexRange>,
    fusions: Vec<(usize, usize)>,
    parents: Vec<Option<usize>>,
    children_count: Vec<usize>,
}

impl PartitionConfig {
    /// Create fluent builder
    pub fn builder(vertex_num: usize) -> PartitionConfigBuilder {
        PartitionConfigBuilder::new(vertex_num)
    }

    /// Build and validate a tree from partitions and fusion pairs
    pub fn new(
        vertex_num: usize,
        partitions: Vec<VertexRange>,
        fusions: Vec<(usize, usize)>,
    ) -> Result<Self> {
        for (index, range) in partitions.iter().enumerate() {
            if !range.is_valid() {
                return Err(AnalysisError::MalformedTree {
                    unit: index,
                    reason: format!("inverted vertex range {range}"),
                });
            }
        }

        let parents = derive_parents(partitions.len(), &fusions)?;
        let children_count = derive_children_counts(partitions.len(), &fusions);

        Ok(Self {
            vertex_num,
            partitions,
            fusions,
            parents,
            children_count,
        })
    }

    /// Single partition covering the whole vertex space; no fusions
    pub fn single(vertex_num: usize) -> Self {
        Self {
            vertex_num,
            partitions: vec![VertexRange::new(0, vertex_num)],
            fusions: Vec::new(),
            parents: vec![None],
            children_count: vec![1],
        }
    }

    /// Validate a wire layout
    pub fn from_layout(layout: PartitionLayout) -> Result<Self> {
        let unit_count = unit_count(layout.partitions.len());
        let fusions = layout
            .fusions
            .iter()
            .map(|&(left, right)| {
                let convert = |index: i64| {
                    usize::try_from(index).map_err(|_| AnalysisError::Index {
                        index,
                        bound: unit_count,
                    })
                };
                Ok((convert(left)?, convert(right)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(layout.vertex_num, layout.partitions, fusions)
    }

    /// Parse a JSON layout and validate it
    pub fn from_json(text: &str) -> Result<Self> {
        let layout: PartitionLayout =
            serde_json::from_str(text).map_err(|e| AnalysisError::Parse {
                line: 0,
                message: e.to_string(),
            })?;
        Self::from_layout(layout)
    }

    /// Wire layout that reproduces this tree
    pub fn layout(&self) -> PartitionLayout {
        PartitionLayout::from(self.clone())
    }

    /// Size of the vertex index space
    pub fn vertex_num(&self) -> usize {
        self.vertex_num
    }

    /// Leaf ranges in unit order
    pub fn partitions(&self) -> &[VertexRange] {
        &self.partitions
    }

    /// Fusion pairs in creation order
    pub fn fusions(&self) -> &[(usize, usize)] {
        &self.fusions
    }

    /// Number of leaf partitions P
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Total units: 2P-1
    pub fn unit_count(&self) -> usize {
        self.parents.len()
    }

    /// Root unit: 2P-2
    pub fn root(&self) -> usize {
        self.unit_count() - 1
    }

    /// Immediate parent of every unit
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    fn check_unit(&self, unit: usize) -> Result<()> {
        if unit >= self.unit_count() {
            return Err(AnalysisError::Index {
                index: i64::try_from(unit).unwrap_or(i64::MAX),
                bound: self.unit_count(),
            });
        }
        Ok(())
    }

    /// Immediate parent (`None` for the root)
    pub fn parent(&self, unit: usize) -> Result<Option<usize>> {
        self.check_unit(unit)?;
        Ok(self.parents[unit])
    }

    /// Whether `unit` is a leaf partition
    #[inline]
    pub fn is_leaf(&self, unit: usize) -> bool {
        unit < self.partition_count()
    }

    /// The pair fused to create `unit` (`None` for leaves)
    pub fn children(&self, unit: usize) -> Result<Option<(usize, usize)>> {
        self.check_unit(unit)?;
        Ok(unit
            .checked_sub(self.partition_count())
            .map(|fusion_index| self.fusions[fusion_index]))
    }

    /// Number of fusion edges from `unit` to the root
    ///
    /// Walks the parent chain; O(depth).
    pub fn unit_depth(&self, unit: usize) -> Result<usize> {
        self.check_unit(unit)?;
        Ok(Ancestors::new(&self.parents, unit).count())
    }

    /// Depth of every unit in one backward pass
    pub fn depths(&self) -> Vec<usize> {
        derive_depths(&self.parents)
    }

    /// Largest leaf depth
    pub fn height(&self) -> usize {
        self.depths()
            .into_iter()
            .take(self.partition_count())
            .max()
            .unwrap_or(0)
    }

    /// Number of leaves subsumed by `unit`
    pub fn children_count(&self, unit: usize) -> Result<usize> {
        self.check_unit(unit)?;
        Ok(self.children_count[unit])
    }

    /// Children count of every unit
    pub fn children_counts(&self) -> &[usize] {
        &self.children_count
    }

    /// Leaf indices under `unit`, ascending
    pub fn leaves(&self, unit: usize) -> Result<Vec<usize>> {
        self.check_unit(unit)?;
        let mut leaves = Vec::with_capacity(self.children_count[unit]);
        let mut stack = vec![unit];
        while let Some(current) = stack.pop() {
            match current.checked_sub(self.partition_count()) {
                None => leaves.push(current),
                Some(fusion_index) => {
                    let (left, right) = self.fusions[fusion_index];
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves.sort_unstable();
        Ok(leaves)
    }

    /// Digest of the layout; equal for trees with identical partitions and fusions
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.vertex_num as u64).to_le_bytes());
        hasher.update(&(self.partitions.len() as u64).to_le_bytes());
        for range in &self.partitions {
            hasher.update(&(range.start as u64).to_le_bytes());
            hasher.update(&(range.end as u64).to_le_bytes());
        }
        for &(left, right) in &self.fusions {
            hasher.update(&(left as u64).to_le_bytes());
            hasher.update(&(right as u64).to_le_bytes());
        }
        hasher.finalize()
    }
}

impl TryFrom<PartitionLayout> for PartitionConfig {
    type Error = AnalysisError;

    fn try_from(layout: PartitionLayout) -> Result<Self> {
        Self::from_layout(layout)
    }
}

impl From<PartitionConfig> for PartitionLayout {
    fn from(config: PartitionConfig) -> Self {
        Self {
            vertex_num: config.vertex_num,
            partitions: config.partitions,
            fusions: config
                .fusions
                .into_iter()
                .map(|(left, right)| (left as i64, right as i64))
                .collect(),
        }
    }
}

/// Builder for partition/fusion trees (fluent API)
#[derive(Debug, Clone)]
pub struct PartitionConfigBuilder {
    vertex_num: usize,
    partitions: Vec<VertexRange>,
    fusions: Vec<(usize, usize)>,
}

impl PartitionConfigBuilder {
    /// Create empty builder over `vertex_num` vertices
    pub fn new(vertex_num: usize) -> Self {
        Self {
            vertex_num,
            partitions: Vec::new(),
            fusions: Vec::new(),
        }
    }

    /// Append a leaf partition `[start, end)`
    pub fn partition(mut self, start: VertexIndex, end: VertexIndex) -> Self {
        self.partitions.push(VertexRange::new(start, end));
        self
    }

    /// Append several leaf partitions
    pub fn partitions<I>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = VertexRange>,
    {
        self.partitions.extend(ranges);
        self
    }

    /// Append a fusion of two existing units
    pub fn fusion(mut self, left: usize, right: usize) -> Self {
        self.fusions.push((left, right));
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<PartitionConfig> {
        PartitionConfig::new(self.vertex_num, self.partitions, self.fusions)
    }
}
