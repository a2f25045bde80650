//! Index descriptors: where a point's degrees of freedom live in patch storage.
//!
//! An index is an `(offset, length)` interval. Before a patch is ordered, the
//! offset is unknown and the index only records a length; ordering rewrites it
//! with the assigned offset.

use crate::topology::bounds::PointLike;
use std::fmt;
use std::ops::Range;

/// Capability set required of a CoSieve index type.
pub trait IndexLike: PointLike {
    /// Number of values described.
    fn len(&self) -> usize;

    /// Start of the slice in patch storage, or `None` before ordering.
    fn offset(&self) -> Option<usize>;

    /// The same index placed at `offset`.
    fn with_offset(&self, offset: usize) -> Self;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage range, once resolved.
    #[inline]
    fn range(&self) -> Option<Range<usize>> {
        self.offset().map(|o| o..o + self.len())
    }
}

/// Indices that can be created from a bare length or an explicit span.
pub trait IntervalLike: IndexLike {
    /// Sentinel index of length `len` whose offset is not yet assigned.
    fn unresolved(len: usize) -> Self;
    /// Resolved index covering `offset..offset + len`.
    fn span(offset: usize, len: usize) -> Self;
}

/// The default `(offset, length)` interval.
///
/// An offset of [`Interval::UNRESOLVED`] marks a dimension declaration that
/// has not been ordered yet.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize,
)]
pub struct Interval {
    pub offset: i64,
    pub len: usize,
}

impl Interval {
    pub const UNRESOLVED: i64 = -1;

    #[inline]
    pub fn new(offset: usize, len: usize) -> Self {
        Self {
            offset: offset as i64,
            len,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.offset, self.len)
    }
}

impl IndexLike for Interval {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn offset(&self) -> Option<usize> {
        usize::try_from(self.offset).ok()
    }

    #[inline]
    fn with_offset(&self, offset: usize) -> Self {
        Interval::new(offset, self.len)
    }
}

impl IntervalLike for Interval {
    #[inline]
    fn unresolved(len: usize) -> Self {
        Self {
            offset: Self::UNRESOLVED,
            len,
        }
    }

    #[inline]
    fn span(offset: usize, len: usize) -> Self {
        Interval::new(offset, len)
    }
}
