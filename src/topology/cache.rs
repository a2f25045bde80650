//! Cache invalidation shared by the graph structures.

/// Anything that caches derived topology (base/cap summaries, strata)
/// implements this.
pub trait InvalidateCache {
    /// Drop every derived summary so future queries see the mutation.
    fn invalidate_cache(&mut self);
}

impl<T: InvalidateCache + ?Sized> InvalidateCache for Box<T> {
    #[inline]
    fn invalidate_cache(&mut self) {
        (**self).invalidate_cache();
    }
}
