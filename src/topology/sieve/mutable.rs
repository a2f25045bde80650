use super::sieve_trait::Sieve;
use crate::mesh_error::MeshSieveError;
use crate::topology::cache::InvalidateCache;

/// Trait for sieves that support topology mutation.
///
/// [`Sieve`] provides traversal only. `MutableSieve` adds arrow-level
/// mutation, cone-level convenience routines and explicit stratification.
/// Every mutator invalidates cached strata.
pub trait MutableSieve: Sieve + InvalidateCache {
    /// Insert the arrow `src → dst` with `color` (no-op if present).
    fn add_arrow(&mut self, src: Self::Point, dst: Self::Point, color: Self::Color);

    /// Remove the arrow `src → dst` with `color`. Returns whether it existed.
    fn remove_arrow(&mut self, src: Self::Point, dst: Self::Point, color: Self::Color) -> bool;

    /// Recompute base/cap and depth/height summaries.
    ///
    /// # Errors
    /// [`MeshSieveError::CycleDetected`] if the arrows do not form a DAG.
    fn stratify(&mut self) -> Result<(), MeshSieveError>;

    /// Append `sources` to the cone of `target`, all with `color`.
    fn add_cone(
        &mut self,
        sources: impl IntoIterator<Item = Self::Point>,
        target: Self::Point,
        color: Self::Color,
    ) {
        for src in sources {
            self.add_arrow(src, target, color);
        }
        self.invalidate_cache();
    }

    /// Replace the arrows into `target` carrying `color` with `sources`.
    fn set_cone(
        &mut self,
        sources: impl IntoIterator<Item = Self::Point>,
        target: Self::Point,
        color: Self::Color,
    ) {
        let old: Vec<_> = self
            .cone(target)
            .filter(|(_, c)| **c == color)
            .map(|(q, _)| q)
            .collect();
        for src in old {
            self.remove_arrow(src, target, color);
        }
        self.add_cone(sources, target, color);
    }
}
