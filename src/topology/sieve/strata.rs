//! Strata computation for sieves.
//!
//! Arrows of a sieve point from lower-dimensional entities to the entities
//! they bound (vertex → edge → face → cell), so the cone of a cell holds its
//! faces. *Depth* is the length of the longest chain of cones below a point
//! (vertices have depth 0); *height* is the length of the longest chain of
//! supports above it (cells have height 0).
//!
//! # Errors
//! * [`MeshSieveError::CycleDetected`]: the topology contains a cycle.

use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::PointLike;
use crate::topology::sieve::Sieve;
use std::collections::HashMap;

/// Precomputed depth/height information for a sieve.
#[derive(Clone, Debug)]
pub struct StrataCache<P> {
    /// Distance from `p` down to a point with an empty cone.
    pub depth: HashMap<P, u32>,
    /// Distance from `p` up to a point with an empty support.
    pub height: HashMap<P, u32>,
    /// `depth_strata[d]` = points at depth `d`, ascending.
    pub depth_strata: Vec<Vec<P>>,
    /// `height_strata[h]` = points at height `h`, ascending.
    pub height_strata: Vec<Vec<P>>,
}

impl<P: PointLike> StrataCache<P> {
    /// Create a new, empty `StrataCache`.
    pub fn new() -> Self {
        Self {
            depth: HashMap::new(),
            height: HashMap::new(),
            depth_strata: Vec::new(),
            height_strata: Vec::new(),
        }
    }

    /// Largest depth of any point (0 for an empty sieve).
    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.depth_strata.len().saturating_sub(1) as u32
    }

    /// Number of stratified points.
    #[inline]
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }
}

impl<P: PointLike> Default for StrataCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn bucket<P: PointLike>(levels: &HashMap<P, u32>) -> Vec<Vec<P>> {
    let n = levels.values().max().map_or(0, |&m| m as usize + 1);
    let mut out = vec![Vec::new(); n];
    for (&p, &l) in levels {
        out[l as usize].push(p);
    }
    for lev in &mut out {
        lev.sort_unstable();
    }
    out
}

/// Compute strata information on-the-fly (no cache).
///
/// ## Complexity
/// **O(|V| + |E|)**: Kahn topological sort followed by one pass in each
/// direction.
pub fn compute_strata<S>(s: &S) -> Result<StrataCache<S::Point>, MeshSieveError>
where
    S: Sieve + ?Sized,
{
    let points: Vec<S::Point> = s.points().collect();

    // Kahn's sort from points with an empty cone, walking supports upward.
    let mut pending: HashMap<S::Point, usize> = HashMap::with_capacity(points.len());
    let mut stack = Vec::new();
    for &p in &points {
        let n = s.cone(p).count();
        if n == 0 {
            stack.push(p);
        }
        pending.insert(p, n);
    }
    stack.sort_unstable_by(|a, b| b.cmp(a));

    let mut topo = Vec::with_capacity(points.len());
    while let Some(p) = stack.pop() {
        topo.push(p);
        for (q, _) in s.support(p) {
            let Some(d) = pending.get_mut(&q) else {
                continue;
            };
            *d -= 1;
            if *d == 0 {
                stack.push(q);
            }
        }
    }
    if topo.len() != points.len() {
        return Err(MeshSieveError::CycleDetected);
    }

    let mut depth = HashMap::with_capacity(topo.len());
    for &p in &topo {
        let d = s
            .cone(p)
            .map(|(q, _)| depth.get(&q).copied().unwrap_or(0))
            .max()
            .map_or(0, |m| m + 1);
        depth.insert(p, d);
    }

    let mut height = HashMap::with_capacity(topo.len());
    for &p in topo.iter().rev() {
        let h = s
            .support(p)
            .map(|(q, _)| height.get(&q).copied().unwrap_or(0))
            .max()
            .map_or(0, |m| m + 1);
        height.insert(p, h);
    }

    Ok(StrataCache {
        depth_strata: bucket(&depth),
        height_strata: bucket(&height),
        depth,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::sieve::{InMemorySieve, MutableSieve};

    #[test]
    fn chain_strata() {
        // 1 → 2 → 3: 1 is a vertex, 3 the top cell
        let mut s = InMemorySieve::<u32>::new();
        s.add_arrow(1, 2, ());
        s.add_arrow(2, 3, ());
        let c = compute_strata(&s).unwrap();
        assert_eq!(c.depth[&1], 0);
        assert_eq!(c.depth[&3], 2);
        assert_eq!(c.height[&1], 2);
        assert_eq!(c.height[&3], 0);
        assert_eq!(c.max_depth(), 2);
        assert_eq!(c.depth_strata[1], vec![2]);
    }

    #[test]
    fn cycle_is_reported() {
        let mut s = InMemorySieve::<u32>::new();
        s.add_arrow(1, 2, ());
        s.add_arrow(2, 1, ());
        assert_eq!(compute_strata(&s).unwrap_err(), MeshSieveError::CycleDetected);
    }
}
