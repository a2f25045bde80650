//! Canonical local numbering of one cell from an order chain.
//!
//! An *order chain* (cell tuple) names one point per topological depth,
//! `(vertex, edge, face, …)`, each in the cone of the next. Starting from the
//! vertex, the walk flips across edges and faces inside the cell's closure
//! until it returns to an element it has already visited; the order in which
//! elements are first reached is the cell's local numbering.

use super::CoSieve;
use crate::data::index::IndexLike;
use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::PointLike;
use crate::topology::sieve::Sieve;
use std::collections::{BTreeMap, HashSet};

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    Patch: PointLike,
    I: IndexLike,
    V: Clone + Default,
{
    /// Indices of the closure of the chain's top cell, in canonical local
    /// order: all vertices first, then all edges, and so on. Zero-length
    /// indices are omitted.
    ///
    /// # Errors
    /// * [`MeshSieveError::InvalidOrderChain`] if the chain does not start at
    ///   depth 0, skips or repeats a depth, or a point is not in the cone of
    ///   the next one.
    /// * [`MeshSieveError::NonManifold`] / [`MeshSieveError::InconsistentSeparation`]
    ///   if an element of the cell does not separate exactly two neighbours.
    /// * [`MeshSieveError::UnresolvedIndex`] if the patch has not been ordered.
    pub fn ordered_indices(
        &self,
        patch: Patch,
        chain: impl IntoIterator<Item = S::Point>,
    ) -> Result<Vec<I>, MeshSieveError> {
        let chain = check_order_chain(&*self.topology, chain)?;
        if !self.has_patch(patch) {
            return Err(MeshSieveError::unknown_patch(patch));
        }
        let top = chain.len() - 1;
        log::debug!("ordering cell {:?} of dimension {top}", chain[top]);

        let mut walk = CellWalk {
            topology: &*self.topology,
            chain,
            ordered: vec![Vec::new(); top + 1],
            done: HashSet::new(),
        };
        walk.order_cell(top)?;

        let mut out = Vec::new();
        for p in walk.ordered.into_iter().flatten() {
            for idx in self.patch_indices(patch, p).filter(|i| !i.is_empty()) {
                if idx.offset().is_none() {
                    return Err(MeshSieveError::UnresolvedIndex {
                        patch: format!("{patch:?}"),
                        point: format!("{p:?}"),
                    });
                }
                out.push(idx);
            }
        }
        Ok(out)
    }
}

/// Sort `chain` by depth and validate it. Returns one point per depth `0..=d`.
fn check_order_chain<S: Sieve + ?Sized>(
    topology: &S,
    chain: impl IntoIterator<Item = S::Point>,
) -> Result<Vec<S::Point>, MeshSieveError> {
    let mut by_depth: BTreeMap<u32, S::Point> = BTreeMap::new();
    for p in chain {
        let d = topology.depth(p)?;
        if let Some(prev) = by_depth.insert(d, p) {
            if prev != p {
                return Err(MeshSieveError::InvalidOrderChain(format!(
                    "points {prev:?} and {p:?} both have depth {d}"
                )));
            }
        }
    }
    match by_depth.keys().next() {
        None => {
            return Err(MeshSieveError::InvalidOrderChain("empty order chain".into()));
        }
        Some(&d) if d != 0 => {
            return Err(MeshSieveError::InvalidOrderChain(format!(
                "minimal depth is {d}, expected 0"
            )));
        }
        _ => {}
    }
    let mut points = Vec::with_capacity(by_depth.len());
    for (expected, (d, p)) in by_depth.into_iter().enumerate() {
        if d as usize != expected {
            return Err(MeshSieveError::InvalidOrderChain(format!(
                "missing point at depth {expected}"
            )));
        }
        if let Some(&below) = points.last() {
            if !topology.cone_contains(p, below) {
                return Err(MeshSieveError::InvalidOrderChain(format!(
                    "point {below:?} at depth {} not in the cone of point {p:?} at depth {d}",
                    d - 1
                )));
            }
        }
        points.push(p);
    }
    Ok(points)
}

/// Mutable state of one cell walk.
struct CellWalk<'a, S: Sieve + ?Sized> {
    topology: &'a S,
    /// Current element per dimension; rewritten as the walk proceeds.
    chain: Vec<S::Point>,
    /// Elements per dimension, in the order they were first reached.
    ordered: Vec<Vec<S::Point>>,
    done: HashSet<S::Point>,
}

impl<S: Sieve + ?Sized> CellWalk<'_, S> {
    fn mark(&mut self, dim: usize, p: S::Point) {
        if self.done.insert(p) {
            log::trace!("  ordered element {p:?} dim {dim}");
            self.ordered[dim].push(p);
        }
    }

    /// Order the closure of `chain[dim]`, returning the last `(dim-1)`-element
    /// crossed. Recursion depth is bounded by the cell dimension.
    fn order_cell(&mut self, dim: usize) -> Result<S::Point, MeshSieveError> {
        match dim {
            0 => {
                let v = self.chain[0];
                self.mark(0, v);
                Ok(v)
            }
            1 => {
                let edge = self.chain[1];
                let ends: Vec<_> = self.topology.cone_points(edge).collect();
                if ends.len() != 2 {
                    return Err(MeshSieveError::NonManifold {
                        element: format!("{edge:?}"),
                        found: ends.len(),
                    });
                }
                let from = self.chain[0];
                let other = ends.into_iter().find(|&q| q != from).ok_or_else(|| {
                    MeshSieveError::InconsistentSeparation(format!("{edge:?}"))
                })?;
                self.mark(0, from);
                self.mark(0, other);
                self.mark(1, edge);
                self.chain[0] = other;
                Ok(other)
            }
            _ => {
                let cell = self.chain[dim];
                let closure = self.topology.closure_sieve(cell);
                // each step reaches a new face, so the walk closes within |closure| steps
                let mut budget = closure.points().count() + 1;
                let mut last;
                loop {
                    let pivot = self.order_cell(dim - 1)?;
                    let faces: Vec<_> = closure.support_points(pivot).collect();
                    if faces.len() != 2 {
                        return Err(MeshSieveError::NonManifold {
                            element: format!("{pivot:?}"),
                            found: faces.len(),
                        });
                    }
                    let current = self.chain[dim - 1];
                    let next = faces.into_iter().find(|&f| f != current).ok_or_else(|| {
                        MeshSieveError::InconsistentSeparation(format!("{pivot:?}"))
                    })?;
                    last = current;
                    self.chain[dim - 1] = next;
                    if self.done.contains(&next) {
                        break;
                    }
                    budget -= 1;
                    if budget == 0 {
                        return Err(MeshSieveError::InconsistentSeparation(format!(
                            "walk around {cell:?} did not close"
                        )));
                    }
                }
                self.chain[dim - 1] = last;
                self.mark(dim, cell);
                Ok(last)
            }
        }
    }
}
