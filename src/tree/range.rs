//! Vertex ranges owned by leaf partitions
//!
//! Range = half-open interval [start, end) over the vertex index space.
//! Two adjacent ranges fuse into (whole, interface):
//!   whole: [left.start, right.end)
//!   interface: [left.end, right.start)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into the vertex space
pub type VertexIndex = usize;

/// Half-open interval of vertex indices belonging to one leaf partition
///
/// Serialized as a two-element array `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[VertexIndex; 2]", into = "[VertexIndex; 2]")]
pub struct VertexRange {
    /// First index (inclusive)
    pub start: VertexIndex,

    /// Last index (exclusive)
    pub end: VertexIndex,
}

impl VertexRange {
    /// Create a range; validity (`start <= end`) is checked when a tree is built
    pub fn new(start: VertexIndex, end: VertexIndex) -> Self {
        Self { start, end }
    }

    /// Number of vertices in the range (0 for an inverted range)
    #[inline]
    pub fn length(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the range holds no vertex
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// `start <= end`
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Check membership
    #[inline]
    pub fn contains(&self, vertex: VertexIndex) -> bool {
        vertex >= self.start && vertex < self.end
    }

    /// Fuse with a higher range
    ///
    /// Returns `(whole, interface)` where `whole` spans both ranges and
    /// `interface` is the gap between them. `None` if `other` does not start
    /// at or after the end of `self`, or either range is inverted.
    pub fn fuse(&self, other: &Self) -> Option<(VertexRange, VertexRange)> {
        if !self.is_valid() || !other.is_valid() || self.end > other.start {
            return None;
        }
        Some((
            VertexRange::new(self.start, other.end),
            VertexRange::new(self.end, other.start),
        ))
    }
}

impl From<[VertexIndex; 2]> for VertexRange {
    fn from([start, end]: [VertexIndex; 2]) -> Self {
        Self { start, end }
    }
}

impl From<VertexRange> for [VertexIndex; 2] {
    fn from(range: VertexRange) -> Self {
        [range.start, range.end]
    }
}

impl fmt::Display for VertexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
