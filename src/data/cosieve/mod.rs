//! CoSieve: degrees of freedom attached to the points of a shared topology.
//!
//! A [`CoSieve`] holds three things next to an `Arc` of its topology:
//!
//! * a *patches* graph `point → patch`, whose arc colors record the order in
//!   which points were declared over the patch;
//! * an *indices* graph `index → point`, colored by `(patch, topological
//!   color)`, where each index is an `(offset, length)` interval into the
//!   patch's storage;
//! * one contiguous buffer per ordered patch.
//!
//! The usual life cycle is: declare patches with [`CoSieve::set_patch`],
//! declare fiber dimensions with [`CoSieve::set_index_dimension`] (or one of
//! its variants), assign offsets with [`CoSieve::order_patches`], then read
//! and write values with [`CoSieve::restrict`] / [`CoSieve::update`].
//!
//! ```rust
//! use std::sync::Arc;
//! use cosieve::prelude::*;
//!
//! // one edge (3) bounded by two vertices (1, 2)
//! let topo = Arc::new(InMemorySieve::<u32>::from_arrows([(1, 3, ()), (2, 3, ())]));
//! let mut cs: CoSieve<_, char> = CoSieve::new(topo);
//! cs.set_patch([3], 'a');
//! cs.set_index_dimension_by_depth(0, 2).unwrap();
//! cs.order_patches().unwrap();
//! assert_eq!(cs.patch_size('a').unwrap(), 4);
//! cs.update('a', 2, &[5.0, 6.0]).unwrap();
//! assert_eq!(&*cs.restrict('a', 2).unwrap(), &[5.0, 6.0]);
//! ```

mod access;
mod chain;
mod ordering;

pub use access::ScatterPlan;

use crate::config::CoSieveConfig;
use crate::data::index::{IndexLike, Interval, IntervalLike};
use crate::data::storage::{Storage, VecStorage};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshSieveError;
use crate::topology::bigraph::BiGraph;
use crate::topology::bounds::PointLike;
use crate::topology::sieve::Sieve;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Color of an arc in the indices graph: the patch, then the topological color.
pub type IndexColor<Patch, C> = (Patch, C);

/// Storage of one ordered patch.
#[derive(Clone, Debug)]
pub(crate) struct PatchStorage<V> {
    pub(crate) data: VecStorage<V>,
    /// Layout generation this buffer was allocated for.
    pub(crate) version: u64,
}

/// Field data over a mesh topology, split into patches.
///
/// # Type Parameters
/// - `S`: the topology, shared through an [`Arc`].
/// - `Patch`: patch identifiers.
/// - `I`: index type, [`Interval`] by default.
/// - `V`: value type, `f64` by default.
#[derive(Clone, Debug)]
pub struct CoSieve<S: Sieve, Patch, I = Interval, V = f64> {
    topology: Arc<S>,
    patches: BiGraph<S::Point, Patch, u32>,
    indices: BiGraph<I, S::Point, IndexColor<Patch, S::Color>>,
    storage: HashMap<Patch, PatchStorage<V>>,
    layout_epoch: u64,
    config: CoSieveConfig,
}

/// Collect `indices`, rejecting any index already in `seen` or repeated.
fn distinct_indices<I: IndexLike>(
    patch: impl std::fmt::Debug,
    p: impl std::fmt::Debug,
    mut seen: HashSet<I>,
    indices: impl IntoIterator<Item = I>,
) -> Result<Vec<I>, MeshSieveError> {
    let indices: Vec<I> = indices.into_iter().collect();
    match indices.iter().find(|&&idx| !seen.insert(idx)) {
        Some(idx) => Err(MeshSieveError::DuplicateIndex {
            patch: format!("{patch:?}"),
            point: format!("{p:?}"),
            index: format!("{idx:?}"),
        }),
        None => Ok(indices),
    }
}

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    Patch: PointLike,
    I: IndexLike,
    V: Clone + Default,
{
    /// An empty CoSieve over `topology` with the default configuration.
    pub fn new(topology: Arc<S>) -> Self {
        Self::with_config(topology, CoSieveConfig::default())
    }

    pub fn with_config(topology: Arc<S>, config: CoSieveConfig) -> Self {
        let mut patches = BiGraph::new();
        patches.stratify();
        Self {
            topology,
            patches,
            indices: BiGraph::new(),
            storage: HashMap::new(),
            layout_epoch: 0,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &CoSieveConfig {
        &self.config
    }

    #[inline]
    pub fn topology(&self) -> &Arc<S> {
        &self.topology
    }

    /// Replace the topology.
    ///
    /// Declared patches and indices are kept, but every buffer is dropped:
    /// offsets computed against the old topology mean nothing for the new one,
    /// so patches must be ordered again before values are accessed.
    pub fn set_topology(&mut self, topology: Arc<S>) {
        self.topology = topology;
        self.storage.clear();
    }

    // --- patches ---

    /// Declare `patch` as the ordered sequence `points`, replacing any
    /// previous declaration of the same patch.
    ///
    /// A point listed more than once is kept at its first position.
    pub fn set_patch(&mut self, points: impl IntoIterator<Item = S::Point>, patch: Patch) {
        self.patches.clear_cone(patch);
        let mut seen = HashSet::new();
        let mut position = 0u32;
        for p in points {
            if !seen.insert(p) {
                log::warn!("point {p:?} listed twice in patch {patch:?}; keeping first occurrence");
                continue;
            }
            self.patches.add_arrow(p, patch, position);
            position += 1;
        }
        self.patches.stratify();
        crate::debug_invariants!(self.patches.validate_invariants(), "patches graph");
    }

    /// The declared point sequence of `patch` (empty if unknown).
    pub fn patch(&self, patch: Patch) -> Vec<S::Point> {
        self.patches.cone(patch).map(|(p, _)| p).collect()
    }

    /// Declared patches, ascending.
    pub fn patches(&self) -> Result<Vec<Patch>, MeshSieveError> {
        Ok(self.patches.base()?.collect())
    }

    /// Whether `patch` has at least one point.
    #[inline]
    pub fn has_patch(&self, patch: Patch) -> bool {
        self.patches.cone_len(patch) > 0
    }

    /// Patches that list `p`.
    pub fn patches_of(&self, p: S::Point) -> impl Iterator<Item = Patch> + '_ {
        self.patches.support(p).map(|(patch, _)| patch)
    }

    // --- indices ---

    /// Attach `index` to `p` under `(patch, color)`, after any existing ones.
    ///
    /// # Errors
    /// [`MeshSieveError::DuplicateIndex`] if an equal index is already
    /// attached under `(patch, color)`. Unresolved indices of the same length
    /// are equal, so two same-sized fields on one point need distinct colors.
    pub fn add_index(
        &mut self,
        patch: Patch,
        p: S::Point,
        color: S::Color,
        index: I,
    ) -> Result<(), MeshSieveError> {
        self.add_indices(patch, p, color, std::iter::once(index))
    }

    /// Attach every index of `indices` to `p` under `(patch, color)`.
    ///
    /// # Errors
    /// [`MeshSieveError::DuplicateIndex`] if an index repeats, within
    /// `indices` or against those already attached. Nothing is attached then.
    pub fn add_indices(
        &mut self,
        patch: Patch,
        p: S::Point,
        color: S::Color,
        indices: impl IntoIterator<Item = I>,
    ) -> Result<(), MeshSieveError> {
        let attached: HashSet<I> = self.indices.cone_with_color(p, (patch, color)).collect();
        let indices = distinct_indices(patch, p, attached, indices)?;
        self.indices.add_cone(indices, p, (patch, color));
        Ok(())
    }

    /// Replace the indices of `p` under `(patch, color)` with `indices`.
    ///
    /// Indices under other colors are untouched.
    ///
    /// # Errors
    /// [`MeshSieveError::DuplicateIndex`] if an index repeats within
    /// `indices`. The old indices are kept then.
    pub fn set_indices(
        &mut self,
        patch: Patch,
        p: S::Point,
        color: S::Color,
        indices: impl IntoIterator<Item = I>,
    ) -> Result<(), MeshSieveError> {
        let indices = distinct_indices(patch, p, HashSet::new(), indices)?;
        self.indices.set_cone(indices, p, (patch, color));
        Ok(())
    }

    /// First index of `p` in `patch`, if any.
    pub fn index(&self, patch: Patch, p: S::Point) -> Option<I> {
        self.patch_indices(patch, p).next()
    }

    /// Every index of `p` in `patch`, by ascending color then insertion order.
    pub fn indices(&self, patch: Patch, p: S::Point) -> Vec<I> {
        self.patch_indices(patch, p).collect()
    }

    /// Indices of `p` under exactly `(patch, color)`.
    pub fn indices_colored(&self, patch: Patch, p: S::Point, color: S::Color) -> Vec<I> {
        self.indices.cone_with_color(p, (patch, color)).collect()
    }

    /// Indices of each of `points` in `patch`. Points without indices are omitted.
    pub fn indices_for(
        &self,
        patch: Patch,
        points: impl IntoIterator<Item = S::Point>,
    ) -> BTreeMap<S::Point, Vec<I>> {
        points
            .into_iter()
            .filter_map(|p| {
                let ind = self.indices(patch, p);
                (!ind.is_empty()).then_some((p, ind))
            })
            .collect()
    }

    /// Fiber dimension of `p` in `patch`: the summed length of its indices.
    pub fn index_dimension(&self, patch: Patch, p: S::Point) -> usize {
        self.patch_indices(patch, p).map(|i| i.len()).sum()
    }

    /// Fiber dimension of `p` restricted to `(patch, color)`.
    pub fn index_dimension_colored(&self, patch: Patch, p: S::Point, color: S::Color) -> usize {
        self.indices
            .cone_with_color(p, (patch, color))
            .map(|i| i.len())
            .sum()
    }

    /// Storage size of an ordered patch.
    pub fn patch_size(&self, patch: Patch) -> Result<usize, MeshSieveError> {
        self.patch_storage(patch).map(|s| s.data.len())
    }

    /// Whether `patch` currently owns a buffer.
    #[inline]
    pub fn is_ordered(&self, patch: Patch) -> bool {
        self.storage.contains_key(&patch)
    }

    /// Layout generation of an ordered patch; it changes every time the patch
    /// is re-ordered.
    pub fn layout_version(&self, patch: Patch) -> Option<u64> {
        self.storage.get(&patch).map(|s| s.version)
    }

    /// Drop all patches, indices and buffers. The topology is kept.
    pub fn clear(&mut self) {
        self.patches.clear();
        self.patches.stratify();
        self.indices.clear();
        self.storage.clear();
    }

    // --- crate-internal helpers ---

    pub(crate) fn patch_indices(&self, patch: Patch, p: S::Point) -> impl Iterator<Item = I> + '_ {
        self.indices
            .cone(p)
            .filter(move |(_, (ip, _))| *ip == patch)
            .map(|(i, _)| i)
    }

    /// Indices of `p` in `patch` grouped by color, in cone order.
    pub(crate) fn colored_indices(
        &self,
        patch: Patch,
        p: S::Point,
    ) -> Vec<(IndexColor<Patch, S::Color>, I)> {
        self.indices
            .cone(p)
            .filter(|(_, (ip, _))| *ip == patch)
            .map(|(i, c)| (*c, i))
            .collect()
    }

    pub(crate) fn patch_storage(&self, patch: Patch) -> Result<&PatchStorage<V>, MeshSieveError> {
        match self.storage.get(&patch) {
            Some(s) => Ok(s),
            None if self.has_patch(patch) => Err(MeshSieveError::not_ordered(patch)),
            None => Err(MeshSieveError::unknown_patch(patch)),
        }
    }

    pub(crate) fn patch_storage_mut(
        &mut self,
        patch: Patch,
    ) -> Result<&mut PatchStorage<V>, MeshSieveError> {
        let declared = self.has_patch(patch);
        match self.storage.get_mut(&patch) {
            Some(s) => Ok(s),
            None if declared => Err(MeshSieveError::not_ordered(patch)),
            None => Err(MeshSieveError::unknown_patch(patch)),
        }
    }

    /// Resolved storage ranges of `p` in `patch`, in index order, skipping
    /// zero-length indices.
    pub(crate) fn ranges(
        &self,
        patch: Patch,
        p: S::Point,
    ) -> Result<Vec<std::ops::Range<usize>>, MeshSieveError> {
        let mut any = false;
        let mut out = Vec::new();
        for idx in self.patch_indices(patch, p) {
            any = true;
            if idx.is_empty() {
                continue;
            }
            let r = idx.range().ok_or_else(|| MeshSieveError::UnresolvedIndex {
                patch: format!("{patch:?}"),
                point: format!("{p:?}"),
            })?;
            out.push(r);
        }
        if !any {
            return Err(MeshSieveError::MissingIndex {
                patch: format!("{patch:?}"),
                point: format!("{p:?}"),
            });
        }
        Ok(out)
    }
}

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    Patch: PointLike,
    I: IntervalLike,
    V: Clone + Default,
{
    /// Declare `p` to carry `dim` values in `patch` under the default color.
    pub fn set_index_dimension(&mut self, patch: Patch, p: S::Point, dim: usize) {
        self.set_index_dimension_colored(patch, p, S::Color::default(), dim);
    }

    /// Declare `p` to carry `dim` values in `patch` under `color`.
    ///
    /// This replaces the indices of that color with one unresolved index.
    pub fn set_index_dimension_colored(
        &mut self,
        patch: Patch,
        p: S::Point,
        color: S::Color,
        dim: usize,
    ) {
        self.indices
            .set_cone(std::iter::once(I::unresolved(dim)), p, (patch, color));
    }

    /// Give every point at `depth` the dimension `dim`, in every declared patch.
    pub fn set_index_dimension_by_depth(
        &mut self,
        depth: u32,
        dim: usize,
    ) -> Result<(), MeshSieveError> {
        self.set_index_dimension_by_depth_colored(depth, S::Color::default(), dim)
    }

    pub fn set_index_dimension_by_depth_colored(
        &mut self,
        depth: u32,
        color: S::Color,
        dim: usize,
    ) -> Result<(), MeshSieveError> {
        let stratum = self.topology.depth_stratum(depth)?;
        let patches = self.patches()?;
        log::debug!(
            "setting dimension {dim} on {} points of depth {depth} in {} patches",
            stratum.len(),
            patches.len()
        );
        for patch in patches {
            for &p in &stratum {
                self.set_index_dimension_colored(patch, p, color, dim);
            }
        }
        Ok(())
    }
}

impl<S, Patch, I, V> DebugInvariants for CoSieve<S, Patch, I, V>
where
    S: Sieve,
    Patch: PointLike,
    I: IndexLike,
    V: Clone + Default,
{
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CoSieve invalid");
    }

    /// Every ordered patch is tiled exactly by the resolved ranges of the
    /// points in the closure of its declared sequence.
    fn validate_invariants(&self) -> Result<(), MeshSieveError> {
        self.patches.validate_invariants()?;
        self.indices.validate_invariants()?;
        for (&patch, st) in &self.storage {
            let points: HashSet<_> = self.topology.closure(self.patch(patch)).collect();
            let mut ranges = Vec::new();
            for p in points {
                for idx in self.patch_indices(patch, p).filter(|i| !i.is_empty()) {
                    match idx.range() {
                        Some(r) => ranges.push(r),
                        None => {
                            return Err(MeshSieveError::UnresolvedIndex {
                                patch: format!("{patch:?}"),
                                point: format!("{p:?}"),
                            });
                        }
                    }
                }
            }
            ordering::check_tiling(patch, ranges, st.data.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::sieve::InMemorySieve;

    fn edge() -> Arc<InMemorySieve<u32>> {
        Arc::new(InMemorySieve::from_arrows([(1, 3, ()), (2, 3, ())]))
    }

    #[test]
    fn set_patch_dedupes_and_replaces() {
        let mut cs: CoSieve<_, u8> = CoSieve::new(edge());
        cs.set_patch([3, 1, 3, 2], 0);
        assert_eq!(cs.patch(0), vec![3, 1, 2]);
        cs.set_patch([2], 0);
        assert_eq!(cs.patch(0), vec![2]);
        cs.set_patch([1], 5);
        assert_eq!(cs.patches().unwrap(), vec![0, 5]);
        assert_eq!(cs.patches_of(2).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn dimensions_are_per_patch_and_color() {
        let topo = Arc::new(InMemorySieve::<u32, u8>::from_arrows([(1, 3, 0), (2, 3, 0)]));
        let mut cs: CoSieve<_, char> = CoSieve::new(topo);
        cs.set_patch([3], 'a');
        cs.set_patch([3], 'b');
        cs.set_index_dimension_colored('a', 1, 1, 2);
        cs.set_index_dimension_colored('a', 1, 2, 3);
        cs.set_index_dimension('b', 1, 7);
        assert_eq!(cs.index_dimension('a', 1), 5);
        assert_eq!(cs.index_dimension_colored('a', 1, 2), 3);
        assert_eq!(cs.index_dimension('b', 1), 7);
        assert_eq!(cs.index('a', 1), Some(Interval::unresolved(2)));
        // re-declaring a color replaces only that color
        cs.set_index_dimension_colored('a', 1, 1, 4);
        assert_eq!(cs.index_dimension('a', 1), 7);
    }

    #[test]
    fn identical_indices_are_rejected() {
        let mut cs: CoSieve<_, u8> = CoSieve::new(edge());
        cs.set_patch([3], 0);
        let twice = [Interval::unresolved(2), Interval::unresolved(2)];
        let err = cs.add_indices(0, 1, (), twice).unwrap_err();
        assert!(matches!(err, MeshSieveError::DuplicateIndex { .. }));
        assert_eq!(err.kind(), crate::mesh_error::ErrorKind::Programming);
        assert_eq!(cs.index_dimension(0, 1), 0);

        cs.add_indices(0, 1, (), [Interval::unresolved(2), Interval::unresolved(3)])
            .unwrap();
        assert!(cs.add_index(0, 1, (), Interval::unresolved(3)).is_err());
        assert_eq!(cs.index_dimension(0, 1), 5);
        assert!(cs.set_indices(0, 1, (), twice).is_err());
        assert_eq!(cs.index_dimension(0, 1), 5);
        // a replacement is only checked against itself
        cs.set_indices(0, 1, (), [Interval::unresolved(3), Interval::unresolved(1)])
            .unwrap();
        assert_eq!(cs.index_dimension(0, 1), 4);
        cs.order_patches().unwrap();
        assert_eq!(cs.indices(0, 1).len(), 2);
    }

    #[test]
    fn redeclaring_a_large_patch() {
        let n = 50_000u32;
        let topo = Arc::new(InMemorySieve::<u32>::from_arrows(
            (1..=n).map(|v| (v, n + 1, ())),
        ));
        let mut cs: CoSieve<_, u8> = CoSieve::new(topo);
        cs.set_patch(1..=n, 0);
        cs.set_patch((1..=n).rev(), 0);
        let seq = cs.patch(0);
        assert_eq!(seq.len(), n as usize);
        assert_eq!((seq[0], seq[seq.len() - 1]), (n, 1));
        assert_eq!(cs.patches_of(1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn by_depth_covers_every_patch() {
        let mut cs: CoSieve<_, u8> = CoSieve::new(edge());
        cs.set_patch([3], 0);
        cs.set_patch([1], 1);
        cs.set_index_dimension_by_depth(0, 2).unwrap();
        for patch in [0, 1] {
            assert_eq!(cs.index_dimension(patch, 1), 2);
            assert_eq!(cs.index_dimension(patch, 2), 2);
            assert_eq!(cs.index_dimension(patch, 3), 0);
        }
        let map = cs.indices_for(0, [1, 3]);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn unknown_and_unordered_patches() {
        let mut cs: CoSieve<_, u8> = CoSieve::new(edge());
        cs.set_patch([3], 0);
        assert!(matches!(cs.patch_size(0), Err(MeshSieveError::PatchNotOrdered(_))));
        assert!(matches!(cs.patch_size(9), Err(MeshSieveError::UnknownPatch(_))));
        cs.clear();
        assert!(cs.patches().unwrap().is_empty());
    }
}
