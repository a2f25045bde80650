//! Views of what this rank shares with its neighbors.
//!
//! Both views are keyed by neighbor rank, and the links towards each rank are
//! sorted, so two ranks looking at the same overlap enumerate it in the same
//! order.

use crate::data::index::Interval;
use std::collections::BTreeMap;

/// A point present in a local patch and in a patch of the neighbor.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct PatchLink<P, Patch> {
    pub point: P,
    pub local: Patch,
    pub remote: Patch,
}

/// One pair of matching indices of a shared point.
///
/// `ordinal` is the position of both indices among the indices of the point
/// in their patch; the remote index is known only as the interval it names
/// in the neighbor's storage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexLink<P, Patch, I, C> {
    pub point: P,
    pub patches: (Patch, Patch),
    pub indices: (I, Interval),
    pub color: C,
    pub ordinal: u32,
}

impl<P, Patch, I: crate::data::index::IndexLike, C> IndexLink<P, Patch, I, C> {
    /// Number of values the link carries.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Links grouped by neighbor rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlap<L> {
    links: BTreeMap<usize, Vec<L>>,
}

/// Shared `(point, patch)` pairs per neighbor.
pub type OverlapPatches<P, Patch> = Overlap<PatchLink<P, Patch>>;
/// Shared indices per neighbor.
pub type OverlapIndices<P, Patch, I, C> = Overlap<IndexLink<P, Patch, I, C>>;

impl<L> Default for Overlap<L> {
    fn default() -> Self {
        Self {
            links: BTreeMap::new(),
        }
    }
}

impl<L: Ord> Overlap<L> {
    /// Build from per-rank links; each list is sorted and neighbors without
    /// links are dropped.
    pub fn from_links(links: BTreeMap<usize, Vec<L>>) -> Self {
        let links = links
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(r, mut v)| {
                v.sort();
                (r, v)
            })
            .collect();
        Self { links }
    }
}

impl<L> Overlap<L> {
    /// Neighbor ranks, ascending.
    pub fn neighbours(&self) -> impl Iterator<Item = usize> + '_ {
        self.links.keys().copied()
    }

    /// Links towards `rank`, sorted.
    pub fn links_to(&self, rank: usize) -> &[L] {
        self.links.get(&rank).map_or(&[], Vec::as_slice)
    }

    /// Every `(rank, link)`, by rank then link order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &L)> + '_ {
        self.links
            .iter()
            .flat_map(|(&r, v)| v.iter().map(move |l| (r, l)))
    }

    /// Total number of links.
    pub fn len(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_sorted_and_empty_ranks_dropped() {
        let ov = OverlapPatches::from_links(BTreeMap::from([
            (
                2,
                vec![
                    PatchLink { point: 9u32, local: 0u8, remote: 1 },
                    PatchLink { point: 3, local: 0, remote: 1 },
                ],
            ),
            (1, vec![]),
        ]));
        assert_eq!(ov.neighbours().collect::<Vec<_>>(), vec![2]);
        assert_eq!(ov.links_to(2)[0].point, 3);
        assert!(ov.links_to(1).is_empty());
        assert_eq!(ov.len(), 2);
        assert_eq!(ov.iter().count(), 2);
    }
}
