//! In-memory implementation of the [`Sieve`] trait.
//!
//! [`InMemorySieve`] is a [`BiGraph`] over a single point type, plus a lazily
//! computed depth/height cache that every mutation drops.

use super::mutable::MutableSieve;
use super::sieve_trait::Sieve;
use crate::mesh_error::MeshSieveError;
use crate::topology::bigraph::{BiGraph, ConeIter, SupportIter};
use crate::topology::bounds::{ColorLike, PointLike};
use crate::topology::cache::InvalidateCache;
use crate::topology::sieve::strata::{StrataCache, compute_strata};
use once_cell::sync::OnceCell;
use std::borrow::Cow;

/// An in-memory sieve.
///
/// # Type Parameters
/// - `P`: mesh point identifiers.
/// - `C`: arrow colors. Defaults to `()`.
#[derive(Clone, Debug)]
pub struct InMemorySieve<P, C = ()> {
    graph: BiGraph<P, P, C>,
    strata: OnceCell<StrataCache<P>>,
}

impl<P, C> Default for InMemorySieve<P, C> {
    fn default() -> Self {
        Self {
            graph: BiGraph::default(),
            strata: OnceCell::new(),
        }
    }
}

impl<P: PointLike, C: ColorLike> InMemorySieve<P, C> {
    /// Creates a new, empty `InMemorySieve`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an `InMemorySieve` from `(src, dst, color)` arrows.
    ///
    /// # Example
    /// ```rust
    /// use cosieve::topology::sieve::{InMemorySieve, Sieve};
    /// // two vertices bounding one edge
    /// let s = InMemorySieve::from_arrows([(1u32, 3, ()), (2, 3, ())]);
    /// assert_eq!(s.cone(3).count(), 2);
    /// assert_eq!(s.depth(3).unwrap(), 1);
    /// ```
    pub fn from_arrows<I: IntoIterator<Item = (P, P, C)>>(arrows: I) -> Self {
        let mut sieve = Self::default();
        for (src, dst, color) in arrows {
            sieve.graph.add_arrow(src, dst, color);
        }
        sieve
    }

    /// The underlying bipartite graph.
    #[inline]
    pub fn as_bigraph(&self) -> &BiGraph<P, P, C> {
        &self.graph
    }

    /// Points with a nonempty cone, ascending. Requires a fresh `stratify()`.
    pub fn base(&self) -> Result<impl Iterator<Item = P> + '_, MeshSieveError> {
        self.graph.base()
    }

    /// Points with a nonempty support, ascending. Requires a fresh `stratify()`.
    pub fn cap(&self) -> Result<impl Iterator<Item = P> + '_, MeshSieveError> {
        self.graph.cap()
    }

    /// Depth/height cache, computed on first use after a mutation.
    #[inline]
    pub fn strata_cache(&self) -> Result<&StrataCache<P>, MeshSieveError> {
        self.strata.get_or_try_init(|| compute_strata(self))
    }

    /// Total number of arrows.
    #[inline]
    pub fn arrow_count(&self) -> usize {
        self.graph.arrow_count()
    }
}

impl<P, C> InvalidateCache for InMemorySieve<P, C> {
    #[inline]
    fn invalidate_cache(&mut self) {
        self.strata.take();
        self.graph.invalidate_cache();
    }
}

impl<P: PointLike, C: ColorLike> Sieve for InMemorySieve<P, C> {
    type Point = P;
    type Color = C;
    type ConeIter<'a>
        = ConeIter<'a, P, C>
    where
        Self: 'a;
    type SupportIter<'a>
        = SupportIter<'a, P, C>
    where
        Self: 'a;

    #[inline]
    fn cone<'a>(&'a self, p: P) -> Self::ConeIter<'a> {
        self.graph.cone(p)
    }

    #[inline]
    fn support<'a>(&'a self, p: P) -> Self::SupportIter<'a> {
        self.graph.support(p)
    }

    fn points<'a>(&'a self) -> Box<dyn Iterator<Item = P> + 'a> {
        let mut pts: Vec<P> = self.graph.sources().chain(self.graph.targets()).collect();
        pts.sort_unstable();
        pts.dedup();
        Box::new(pts.into_iter())
    }

    fn strata(&self) -> Result<Cow<'_, StrataCache<P>>, MeshSieveError> {
        self.strata_cache().map(Cow::Borrowed)
    }
}

impl<P: PointLike, C: ColorLike> MutableSieve for InMemorySieve<P, C> {
    fn add_arrow(&mut self, src: P, dst: P, color: C) {
        if self.graph.add_arrow(src, dst, color) {
            self.strata.take();
        }
    }

    fn remove_arrow(&mut self, src: P, dst: P, color: C) -> bool {
        let removed = self.graph.remove_arrow(src, dst, &color);
        if removed {
            self.strata.take();
        }
        removed
    }

    fn stratify(&mut self) -> Result<(), MeshSieveError> {
        self.graph.stratify();
        self.strata.take();
        self.strata_cache().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Triangle: vertices 1,2,3; edges 4=(1,2), 5=(2,3), 6=(3,1); face 7.
    fn triangle() -> InMemorySieve<u32> {
        InMemorySieve::from_arrows([
            (1, 4, ()),
            (2, 4, ()),
            (2, 5, ()),
            (3, 5, ()),
            (3, 6, ()),
            (1, 6, ()),
            (4, 7, ()),
            (5, 7, ()),
            (6, 7, ()),
        ])
    }

    #[test]
    fn depth_and_height() {
        let s = triangle();
        assert_eq!(s.depth(1).unwrap(), 0);
        assert_eq!(s.depth(4).unwrap(), 1);
        assert_eq!(s.depth(7).unwrap(), 2);
        assert_eq!(s.height(7).unwrap(), 0);
        assert_eq!(s.height(1).unwrap(), 2);
        assert_eq!(s.depth_stratum(1).unwrap(), vec![4, 5, 6]);
        assert_eq!(s.height_stratum(0).unwrap(), vec![7]);
        assert_eq!(s.diameter().unwrap(), 2);
    }

    #[test]
    fn closure_and_star() {
        let s = triangle();
        let mut c: Vec<_> = s.closure([4]).collect();
        c.sort();
        assert_eq!(c, vec![1, 2, 4]);
        let mut st: Vec<_> = s.star([1]).collect();
        st.sort();
        assert_eq!(st, vec![1, 4, 6, 7]);
        assert!(s.cone_contains(7, 5));
        assert!(!s.cone_contains(5, 1));
    }

    #[test]
    fn closure_sieve_supports_are_local() {
        let mut s = triangle();
        // a second face glued along edge 5
        s.add_arrow(5, 9, ());
        let cell = s.closure_sieve(7);
        assert_eq!(cell.support_points(5).collect::<Vec<_>>(), vec![7]);
        assert_eq!(s.support_points(5).count(), 2);
    }

    #[test]
    fn mutation_drops_strata_and_base() {
        let mut s = triangle();
        s.stratify().unwrap();
        assert_eq!(s.base().unwrap().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        assert_eq!(s.depth(7).unwrap(), 2);
        s.add_arrow(7, 8, ());
        assert!(s.base().is_err());
        assert_eq!(s.depth(8).unwrap(), 3);
        s.stratify().unwrap();
        assert_eq!(s.cap().unwrap().count(), 7);
    }

    #[test]
    fn set_cone_replaces_one_color() {
        let mut s = InMemorySieve::<u32, u8>::new();
        s.add_cone([1, 2], 10, 0);
        s.add_cone([3], 10, 1);
        s.set_cone([4], 10, 0);
        let cone: Vec<_> = s.cone(10).map(|(p, c)| (p, *c)).collect();
        assert_eq!(cone, vec![(4, 0), (3, 1)]);
        assert!(s.remove_arrow(3, 10, 1));
        assert_eq!(s.arrow_count(), 1);
    }
}
