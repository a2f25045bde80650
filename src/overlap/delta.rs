//! The delta: a read-only CoSieve holding the values received from neighbors.
//!
//! Its patches are [`OverlapPatch`]es, one per `(local patch, remote patch,
//! rank)` triple, and its indices are [`OverlapIndex`]es that remember which
//! local and remote index they mirror. Reading a delta point in a delta patch
//! yields the neighbor's values for that point, laid out like the local ones.

use crate::data::cosieve::CoSieve;
use crate::data::index::{IndexLike, Interval};
use crate::topology::sieve::Sieve;
use std::fmt;
use std::ops::Deref;

/// Patch of the delta: a local patch seen from one neighbor's patch.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct OverlapPatch<Patch> {
    pub local: Patch,
    pub remote: Patch,
    pub rank: usize,
}

/// Index of the delta: where the neighbor's copy of `local` sits in the
/// delta storage (`slot`), and where it came from (`remote`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlapIndex<I> {
    pub local: I,
    pub remote: Interval,
    pub rank: usize,
    pub slot: Interval,
}

impl<I: fmt::Debug> fmt::Display for OverlapIndex<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} <- rank {} {} at {}",
            self.local, self.rank, self.remote, self.slot
        )
    }
}

impl<I: IndexLike> IndexLike for OverlapIndex<I> {
    #[inline]
    fn len(&self) -> usize {
        self.slot.len
    }

    #[inline]
    fn offset(&self) -> Option<usize> {
        self.slot.offset()
    }

    #[inline]
    fn with_offset(&self, offset: usize) -> Self {
        Self {
            slot: self.slot.with_offset(offset),
            ..*self
        }
    }
}

/// Read-only view of the exchanged boundary data.
///
/// Dereferences to the underlying CoSieve for reading; there is no mutable
/// access.
#[derive(Clone, Debug)]
pub struct Delta<S: Sieve, Patch, I, V> {
    pub(crate) inner: CoSieve<S, OverlapPatch<Patch>, OverlapIndex<I>, V>,
}

impl<S: Sieve, Patch, I, V> Deref for Delta<S, Patch, I, V> {
    type Target = CoSieve<S, OverlapPatch<Patch>, OverlapIndex<I>, V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::index::IntervalLike;

    #[test]
    fn overlap_index_moves_only_its_slot() {
        let idx = OverlapIndex {
            local: Interval::new(4, 2),
            remote: Interval::new(0, 2),
            rank: 1,
            slot: Interval::unresolved(2),
        };
        assert_eq!(idx.offset(), None);
        let placed = idx.with_offset(6);
        assert_eq!(placed.range(), Some(6..8));
        assert_eq!(placed.local, idx.local);
        assert_eq!(placed.to_string(), "Interval { offset: 4, len: 2 } <- rank 1 (0, 2) at (6, 2)");
    }
}
