//! BiGraph: colored bipartite incidence between a source and a target point set.
//!
//! A [`BiGraph`] stores arcs `source → target` carrying a color. The *cone* of
//! a target is the list of sources pointing at it; the *support* of a source is
//! the list of targets it points at. Cones iterate by ascending color and, for
//! arcs of the same color, in insertion order; this is what lets a color encode
//! the order of points over a patch or of fields over a point.
//!
//! Arcs are unique per `(source, target, color)`. Adding an arc that already
//! exists is a no-op and keeps its original position.
//!
//! `base()` (targets with a nonempty cone) and `cap()` (sources with a nonempty
//! support) are summaries computed by [`BiGraph::stratify`]. Every mutation
//! drops the summary, and querying it before the next `stratify()` is an error.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::PointLike;
use crate::topology::cache::InvalidateCache;
use std::collections::{HashMap, HashSet};

/// Sorted base/cap summaries, valid until the next mutation.
#[derive(Clone, Debug)]
struct Strata<S, T> {
    base: Vec<T>,
    cap: Vec<S>,
}

/// Colored bipartite graph from `S` points to `T` points.
#[derive(Clone, Debug)]
pub struct BiGraph<S, T, C = ()> {
    /// Incoming arcs per target, sorted by color (stable within a color).
    cones: HashMap<T, Vec<(S, C)>>,
    /// Outgoing arcs per source, in insertion order.
    supports: HashMap<S, Vec<(T, C)>>,
    /// Every arc, for constant-time duplicate checks.
    arcs: HashSet<(S, T, C)>,
    strata: Option<Strata<S, T>>,
}

impl<S, T, C> Default for BiGraph<S, T, C> {
    fn default() -> Self {
        Self {
            cones: HashMap::new(),
            supports: HashMap::new(),
            arcs: HashSet::new(),
            strata: None,
        }
    }
}

type ArcIter<'a, P, C> = std::iter::Map<std::slice::Iter<'a, (P, C)>, fn(&'a (P, C)) -> (P, &'a C)>;

/// Iterator over the `(source, &color)` arcs of a cone.
pub type ConeIter<'a, S, C> = ArcIter<'a, S, C>;
/// Iterator over the `(target, &color)` arcs of a support.
pub type SupportIter<'a, T, C> = ArcIter<'a, T, C>;

fn arc_ref<P: Copy, C>(arc: &(P, C)) -> (P, &C) {
    (arc.0, &arc.1)
}

impl<S: PointLike, T: PointLike, C: PointLike> BiGraph<S, T, C> {
    /// Creates a new, empty `BiGraph`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the arc `src → dst` with `color`.
    ///
    /// Returns `false` if the arc was already present.
    ///
    /// # Example
    /// ```rust
    /// use cosieve::topology::bigraph::BiGraph;
    /// let mut g = BiGraph::<u32, char, u8>::new();
    /// g.add_arrow(1, 'a', 1);
    /// g.add_arrow(2, 'a', 0);
    /// let cone: Vec<_> = g.cone('a').map(|(s, _)| s).collect();
    /// assert_eq!(cone, vec![2, 1]);
    /// ```
    pub fn add_arrow(&mut self, src: S, dst: T, color: C) -> bool {
        if !self.arcs.insert((src, dst, color)) {
            return false;
        }
        let cone = self.cones.entry(dst).or_default();
        let pos = cone.partition_point(|(_, c)| *c <= color);
        cone.insert(pos, (src, color));
        self.supports.entry(src).or_default().push((dst, color));
        self.invalidate_cache();
        true
    }

    /// Append `sources` to the cone of `target`, all with `color`.
    pub fn add_cone(&mut self, sources: impl IntoIterator<Item = S>, target: T, color: C) {
        for src in sources {
            self.add_arrow(src, target, color);
        }
    }

    /// Replace the arcs of `target` carrying `color` with `sources`.
    ///
    /// Arcs of other colors are left in place.
    pub fn set_cone(&mut self, sources: impl IntoIterator<Item = S>, target: T, color: C) {
        let old: Vec<S> = self.cone_with_color(target, color).collect();
        for src in old {
            self.remove_arrow(src, target, &color);
        }
        self.add_cone(sources, target, color);
    }

    /// Remove every arc into `target` in one pass and return them in cone
    /// order.
    ///
    /// # Example
    /// ```rust
    /// use cosieve::topology::bigraph::BiGraph;
    /// let mut g = BiGraph::<u32, char, u8>::new();
    /// g.add_arrow(1, 'a', 1);
    /// g.add_arrow(2, 'a', 0);
    /// g.add_arrow(1, 'b', 0);
    /// assert_eq!(g.clear_cone('a'), vec![(2, 0), (1, 1)]);
    /// assert_eq!(g.support(1).count(), 1);
    /// ```
    pub fn clear_cone(&mut self, target: T) -> Vec<(S, C)> {
        let Some(cone) = self.cones.remove(&target) else {
            return Vec::new();
        };
        for (src, color) in &cone {
            self.arcs.remove(&(*src, target, *color));
            if let Some(sup) = self.supports.get_mut(src) {
                sup.retain(|(t, _)| *t != target);
                if sup.is_empty() {
                    self.supports.remove(src);
                }
            }
        }
        self.invalidate_cache();
        cone
    }

    /// Remove the arc `src → dst` with `color`. Returns whether it existed.
    pub fn remove_arrow(&mut self, src: S, dst: T, color: &C) -> bool {
        if !self.arcs.remove(&(src, dst, *color)) {
            return false;
        }
        if let Some(cone) = self.cones.get_mut(&dst) {
            if let Some(pos) = cone.iter().position(|(s, c)| *s == src && c == color) {
                cone.remove(pos);
            }
            if cone.is_empty() {
                self.cones.remove(&dst);
            }
        }
        if let Some(sup) = self.supports.get_mut(&src) {
            if let Some(pos) = sup.iter().position(|(t, c)| *t == dst && c == color) {
                sup.remove(pos);
            }
            if sup.is_empty() {
                self.supports.remove(&src);
            }
        }
        self.invalidate_cache();
        true
    }

    /// Replace the source `old` of the arc into `target` carrying `color` by
    /// `new`, keeping the arc's position in the cone.
    ///
    /// Returns `false` if no such arc exists. If `new → target` already exists
    /// with `color`, the `old` arc is simply dropped.
    pub fn replace_source_of_target(&mut self, target: T, color: &C, old: S, new: S) -> bool {
        if old == new {
            return self.arcs.contains(&(old, target, *color));
        }
        let Some(cone) = self.cones.get_mut(&target) else {
            return false;
        };
        let Some(pos) = cone.iter().position(|(s, c)| *s == old && c == color) else {
            return false;
        };
        if self.arcs.contains(&(new, target, *color)) {
            return self.remove_arrow(old, target, color);
        }
        cone[pos].0 = new;
        self.arcs.remove(&(old, target, *color));
        self.arcs.insert((new, target, *color));
        if let Some(sup) = self.supports.get_mut(&old) {
            if let Some(i) = sup.iter().position(|(t, c)| *t == target && c == color) {
                sup.remove(i);
            }
            if sup.is_empty() {
                self.supports.remove(&old);
            }
        }
        self.supports.entry(new).or_default().push((target, *color));
        self.invalidate_cache();
        true
    }

    /// Sources pointing at `target` with their colors.
    #[inline]
    pub fn cone(&self, target: T) -> ConeIter<'_, S, C> {
        let f: fn(&(S, C)) -> (S, &C) = arc_ref::<S, C>;
        self.cones
            .get(&target)
            .map(|v| v.iter().map(f))
            .unwrap_or_else(|| [].iter().map(f))
    }

    /// Sources pointing at `target` with exactly `color`, in insertion order.
    pub fn cone_with_color(&self, target: T, color: C) -> impl Iterator<Item = S> + '_ {
        self.cone(target)
            .filter(move |(_, c)| **c == color)
            .map(|(s, _)| s)
    }

    /// Number of arcs into `target`.
    #[inline]
    pub fn cone_len(&self, target: T) -> usize {
        self.cones.get(&target).map_or(0, Vec::len)
    }

    /// Targets reached from `src` with their colors.
    #[inline]
    pub fn support(&self, src: S) -> SupportIter<'_, T, C> {
        let f: fn(&(T, C)) -> (T, &C) = arc_ref::<T, C>;
        self.supports
            .get(&src)
            .map(|v| v.iter().map(f))
            .unwrap_or_else(|| [].iter().map(f))
    }

    /// Targets reached from `src` with exactly `color`.
    pub fn support_with_color(&self, src: S, color: C) -> impl Iterator<Item = T> + '_ {
        self.support(src)
            .filter(move |(_, c)| **c == color)
            .map(|(t, _)| t)
    }

    /// Number of arcs out of `src`.
    #[inline]
    pub fn support_len(&self, src: S) -> usize {
        self.supports.get(&src).map_or(0, Vec::len)
    }

    /// Whether the arc `src → dst` exists with any color.
    pub fn has_arrow(&self, src: S, dst: T) -> bool {
        self.cone(dst).any(|(s, _)| s == src)
    }

    /// Recompute the base/cap summaries. Idempotent.
    pub fn stratify(&mut self) {
        let mut base: Vec<T> = self.cones.keys().copied().collect();
        base.sort_unstable();
        let mut cap: Vec<S> = self.supports.keys().copied().collect();
        cap.sort_unstable();
        self.strata = Some(Strata { base, cap });
    }

    /// Whether `base()`/`cap()` reflect the current arcs.
    #[inline]
    pub fn is_stratified(&self) -> bool {
        self.strata.is_some()
    }

    /// Targets with a nonempty cone, ascending.
    ///
    /// # Errors
    /// [`MeshSieveError::Unstratified`] if the graph changed since the last
    /// [`stratify`](Self::stratify).
    pub fn base(&self) -> Result<impl Iterator<Item = T> + '_, MeshSieveError> {
        self.strata
            .as_ref()
            .map(|s| s.base.iter().copied())
            .ok_or(MeshSieveError::Unstratified)
    }

    /// Sources with a nonempty support, ascending.
    ///
    /// # Errors
    /// [`MeshSieveError::Unstratified`] if the graph changed since the last
    /// [`stratify`](Self::stratify).
    pub fn cap(&self) -> Result<impl Iterator<Item = S> + '_, MeshSieveError> {
        self.strata
            .as_ref()
            .map(|s| s.cap.iter().copied())
            .ok_or(MeshSieveError::Unstratified)
    }

    /// Every target with a nonempty cone, in unspecified order.
    pub fn targets(&self) -> impl Iterator<Item = T> + '_ {
        self.cones.keys().copied()
    }

    /// Every source with a nonempty support, in unspecified order.
    pub fn sources(&self) -> impl Iterator<Item = S> + '_ {
        self.supports.keys().copied()
    }

    /// Total number of arcs.
    pub fn arrow_count(&self) -> usize {
        self.arcs.len()
    }

    /// Drop all arcs.
    pub fn clear(&mut self) {
        self.cones.clear();
        self.supports.clear();
        self.arcs.clear();
        self.invalidate_cache();
    }
}

impl<S, T, C> InvalidateCache for BiGraph<S, T, C> {
    #[inline]
    fn invalidate_cache(&mut self) {
        self.strata = None;
    }
}

impl<S: PointLike, T: PointLike, C: PointLike> DebugInvariants for BiGraph<S, T, C> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "BiGraph invalid");
    }

    fn validate_invariants(&self) -> Result<(), MeshSieveError> {
        let broken = |what: String| Err(MeshSieveError::InvariantViolation(what));
        for (dst, cone) in &self.cones {
            if cone.is_empty() {
                return broken(format!("empty cone kept for {dst:?}"));
            }
            if cone.windows(2).any(|w| w[0].1 > w[1].1) {
                return broken(format!("cone of {dst:?} not sorted by color"));
            }
            let mut seen = HashSet::new();
            for (src, color) in cone {
                if !seen.insert((*src, *color)) {
                    return broken(format!("duplicate arc {src:?} -> {dst:?}"));
                }
                if !self.arcs.contains(&(*src, *dst, *color)) {
                    return broken(format!("arc {src:?} -> {dst:?} missing from the arc index"));
                }
                let mirrored = self
                    .supports
                    .get(src)
                    .is_some_and(|sup| sup.iter().any(|(t, c)| t == dst && c == color));
                if !mirrored {
                    return broken(format!("missing support mirror for {src:?} -> {dst:?}"));
                }
            }
        }
        let n_cone: usize = self.cones.values().map(Vec::len).sum();
        let n_sup: usize = self.supports.values().map(Vec::len).sum();
        if n_sup != n_cone || n_cone != self.arcs.len() {
            return broken(format!(
                "support holds {n_sup} arcs, cones hold {n_cone}, arc index holds {}",
                self.arcs.len()
            ));
        }
        Ok(())
    }
}
