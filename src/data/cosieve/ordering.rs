//! Offset assignment and storage allocation for patches.
//!
//! Each patch is traversed depth-first from its declared point sequence
//! through the topology's cones. A point receives the next free slice of
//! patch storage the first time it is reached; later visits leave it alone,
//! so a point shared by several cells of one patch is stored once.
//!
//! Layouts for all patches are computed before any index is rewritten or any
//! buffer replaced, so a failure leaves the previous layout in place.

use super::{CoSieve, IndexColor, PatchStorage};
use crate::data::index::IndexLike;
use crate::data::storage::{Storage, VecStorage};
use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::PointLike;
use crate::topology::sieve::Sieve;
use std::collections::HashMap;
use std::fmt::Debug;
use std::ops::Range;

/// Computed, not yet applied, layout of one patch.
struct PatchLayout<P, C, I> {
    size: usize,
    /// Resolved indices per `(point, color)`, in cone order.
    rewrites: Vec<(P, C, Vec<I>)>,
}

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    Patch: PointLike,
    I: IndexLike,
    V: Clone + Default,
{
    /// Assign storage offsets to every declared patch and allocate its buffer.
    ///
    /// Patches are processed in ascending order. Re-ordering unchanged input
    /// yields the same offsets, but every buffer is replaced (values are not
    /// carried over) and its [`layout_version`](Self::layout_version) changes.
    pub fn order_patches(&mut self) -> Result<(), MeshSieveError> {
        let patches = self.patches()?;
        let mut layouts = Vec::with_capacity(patches.len());
        for patch in patches {
            let layout = self.layout_patch(patch)?;
            layouts.push((patch, layout));
        }
        for (patch, layout) in layouts {
            self.install(patch, layout);
        }
        #[cfg(feature = "check-invariants")]
        crate::debug_invariants::DebugInvariants::debug_assert_invariants(self);
        Ok(())
    }

    /// Order a single patch.
    pub fn order_patch(&mut self, patch: Patch) -> Result<(), MeshSieveError> {
        if !self.has_patch(patch) {
            return Err(MeshSieveError::unknown_patch(patch));
        }
        let layout = self.layout_patch(patch)?;
        self.install(patch, layout);
        Ok(())
    }

    fn layout_patch(
        &self,
        patch: Patch,
    ) -> Result<PatchLayout<S::Point, IndexColor<Patch, S::Color>, I>, MeshSieveError> {
        let mut seen: HashMap<S::Point, usize> = HashMap::new();
        let mut offset = 0usize;
        let mut rewrites = Vec::new();
        let mut stack = self.patch(patch);
        stack.reverse();

        while let Some(p) = stack.pop() {
            if seen.contains_key(&p) {
                continue;
            }
            let dim = self.index_dimension(patch, p);
            seen.insert(p, offset);
            log::trace!("patch {patch:?}: point {p:?} dim {dim} at offset {offset}");

            if dim > 0 {
                let mut at = offset;
                let mut groups: Vec<(IndexColor<Patch, S::Color>, Vec<I>)> = Vec::new();
                for (color, idx) in self.colored_indices(patch, p) {
                    let resolved = idx.with_offset(at);
                    at += idx.len();
                    match groups.last_mut() {
                        Some((c, v)) if *c == color => v.push(resolved),
                        _ => groups.push((color, vec![resolved])),
                    }
                }
                rewrites.extend(groups.into_iter().map(|(c, v)| (p, c, v)));
                offset += dim;
            }

            let cone: Vec<_> = self.topology.cone_points(p).collect();
            stack.extend(cone.into_iter().rev().filter(|q| !seen.contains_key(q)));
        }

        if self.config.verify_layout {
            let ranges = rewrites
                .iter()
                .flat_map(|(_, _, v)| v.iter())
                .filter(|i| !i.is_empty())
                .filter_map(|i| i.range())
                .collect();
            check_tiling(patch, ranges, offset)?;
        }
        log::debug!(
            "patch {patch:?}: {} points traversed, storage size {offset}",
            seen.len()
        );
        Ok(PatchLayout {
            size: offset,
            rewrites,
        })
    }

    fn install(&mut self, patch: Patch, layout: PatchLayout<S::Point, IndexColor<Patch, S::Color>, I>) {
        for (p, color, resolved) in layout.rewrites {
            let old: Vec<I> = self.indices.cone_with_color(p, color).collect();
            match (old.as_slice(), resolved.as_slice()) {
                ([o], [n]) => {
                    self.indices.replace_source_of_target(p, &color, *o, *n);
                }
                _ => self.indices.set_cone(resolved, p, color),
            }
        }
        // release the old buffer before allocating its replacement
        self.storage.remove(&patch);
        self.layout_epoch += 1;
        self.storage.insert(
            patch,
            PatchStorage {
                data: VecStorage::with_len(layout.size, V::default()),
                version: self.layout_epoch,
            },
        );
    }
}

/// Check that `ranges` cover `[0, size)` without gaps or overlaps.
pub(crate) fn check_tiling<P: Debug>(
    patch: P,
    mut ranges: Vec<Range<usize>>,
    size: usize,
) -> Result<(), MeshSieveError> {
    ranges.sort_unstable_by_key(|r| (r.start, r.end));
    let mut next = 0;
    for r in ranges {
        if r.start != next {
            return Err(MeshSieveError::InvariantViolation(format!(
                "patch {patch:?}: expected a range at offset {next}, found {}..{}",
                r.start, r.end
            )));
        }
        next = r.end;
    }
    if next != size {
        return Err(MeshSieveError::InvariantViolation(format!(
            "patch {patch:?}: ranges end at {next} but storage has {size} values"
        )));
    }
    Ok(())
}
