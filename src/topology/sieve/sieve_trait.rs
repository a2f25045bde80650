//! Core trait for sieve data structures in mesh topology.
//!
//! A sieve is a [`BiGraph`](crate::topology::bigraph::BiGraph) whose source and
//! target point sets coincide, extended with recursive queries. Arrows point
//! from an entity to the entities it bounds, so `cone(cell)` yields the faces
//! of the cell and `support(vertex)` the edges meeting at the vertex.
//!
//! The read-only capability set below is everything a
//! [`CoSieve`](crate::data::cosieve::CoSieve) consumes from its topology.

use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::{ColorLike, PointLike};
use crate::topology::sieve::in_memory::InMemorySieve;
use crate::topology::sieve::mutable::MutableSieve;
use crate::topology::sieve::strata::{StrataCache, compute_strata};
use std::borrow::Cow;
use std::collections::HashSet;

/// Read-only incidence API for mesh topology.
///
/// # Associated Types
/// - `Point`: mesh point identifiers.
/// - `Color`: arrow colors; a cone iterates by ascending color.
/// - `ConeIter`: iterator over the `(point, &color)` arrows into a point.
/// - `SupportIter`: iterator over the `(point, &color)` arrows out of a point.
///
/// # Provided Methods
/// - closure/star traversal and `closure_sieve`
/// - strata helpers (depth, height, strata, diameter)
pub trait Sieve {
    type Point: PointLike;
    type Color: ColorLike;

    type ConeIter<'a>: Iterator<Item = (Self::Point, &'a Self::Color)>
    where
        Self: 'a;
    type SupportIter<'a>: Iterator<Item = (Self::Point, &'a Self::Color)>
    where
        Self: 'a;

    /// Arrows into `p` (the entities bounding `p`).
    fn cone<'a>(&'a self, p: Self::Point) -> Self::ConeIter<'a>;
    /// Arrows out of `p` (the entities `p` bounds).
    fn support<'a>(&'a self, p: Self::Point) -> Self::SupportIter<'a>;
    /// Every point touching at least one arrow.
    fn points<'a>(&'a self) -> Box<dyn Iterator<Item = Self::Point> + 'a>;

    /// Depth/height information. Implementations with a cache override this
    /// to borrow instead of recomputing.
    fn strata(&self) -> Result<Cow<'_, StrataCache<Self::Point>>, MeshSieveError> {
        compute_strata(self).map(Cow::Owned)
    }

    /// Points of the cone of `p`, dropping colors.
    fn cone_points<'a>(&'a self, p: Self::Point) -> Box<dyn Iterator<Item = Self::Point> + 'a> {
        Box::new(self.cone(p).map(|(q, _)| q))
    }

    /// Points of the support of `p`, dropping colors.
    fn support_points<'a>(
        &'a self,
        p: Self::Point,
    ) -> Box<dyn Iterator<Item = Self::Point> + 'a> {
        Box::new(self.support(p).map(|(q, _)| q))
    }

    /// Whether `q` is in the cone of `p`.
    fn cone_contains(&self, p: Self::Point, q: Self::Point) -> bool {
        self.cone(p).any(|(x, _)| x == q)
    }

    // --- graph traversals ---
    /// `seeds` together with everything reachable through cones.
    fn closure<'s, I>(&'s self, seeds: I) -> Box<dyn Iterator<Item = Self::Point> + 's>
    where
        I: IntoIterator<Item = Self::Point>,
    {
        let mut stack: Vec<_> = seeds.into_iter().collect();
        let mut seen: HashSet<Self::Point> = stack.iter().copied().collect();
        Box::new(std::iter::from_fn(move || {
            let p = stack.pop()?;
            for (q, _) in self.cone(p) {
                if seen.insert(q) {
                    stack.push(q);
                }
            }
            Some(p)
        }))
    }

    /// `seeds` together with everything reachable through supports.
    fn star<'s, I>(&'s self, seeds: I) -> Box<dyn Iterator<Item = Self::Point> + 's>
    where
        I: IntoIterator<Item = Self::Point>,
    {
        let mut stack: Vec<_> = seeds.into_iter().collect();
        let mut seen: HashSet<Self::Point> = stack.iter().copied().collect();
        Box::new(std::iter::from_fn(move || {
            let p = stack.pop()?;
            for (q, _) in self.support(p) {
                if seen.insert(q) {
                    stack.push(q);
                }
            }
            Some(p)
        }))
    }

    /// The sub-sieve spanned by the closure of `p`: every arrow whose target
    /// lies in the closure. Supports computed in it are relative to the cell.
    fn closure_sieve(&self, p: Self::Point) -> InMemorySieve<Self::Point, Self::Color> {
        let mut out = InMemorySieve::new();
        for q in self.closure(std::iter::once(p)) {
            for (r, c) in self.cone(q) {
                MutableSieve::add_arrow(&mut out, r, q, *c);
            }
        }
        out
    }

    // --- strata helpers ---
    /// Distance from `p` down to a point with an empty cone.
    ///
    /// Points unknown to the sieve have depth 0.
    fn depth(&self, p: Self::Point) -> Result<u32, MeshSieveError> {
        Ok(self.strata()?.depth.get(&p).copied().unwrap_or(0))
    }

    /// Distance from `p` up to a point with an empty support.
    fn height(&self, p: Self::Point) -> Result<u32, MeshSieveError> {
        Ok(self.strata()?.height.get(&p).copied().unwrap_or(0))
    }

    /// All points at depth `d`, ascending.
    fn depth_stratum(&self, d: u32) -> Result<Vec<Self::Point>, MeshSieveError> {
        Ok(self
            .strata()?
            .depth_strata
            .get(d as usize)
            .cloned()
            .unwrap_or_default())
    }

    /// All points at height `h`, ascending.
    fn height_stratum(&self, h: u32) -> Result<Vec<Self::Point>, MeshSieveError> {
        Ok(self
            .strata()?
            .height_strata
            .get(h as usize)
            .cloned()
            .unwrap_or_default())
    }

    /// Maximum depth of the sieve.
    fn diameter(&self) -> Result<u32, MeshSieveError> {
        Ok(self.strata()?.max_depth())
    }
}
