//! Reading and writing the values of ordered patches.
//!
//! A point's values are the concatenation of the slices named by its indices
//! in the patch, in index order. Every method here checks the whole request
//! before touching storage, so a failed write leaves the buffer unchanged.

use super::CoSieve;
use crate::data::index::IndexLike;
use crate::data::storage::Storage;
use crate::mesh_error::MeshSieveError;
use crate::topology::bounds::PointLike;
use crate::topology::sieve::Sieve;
use std::borrow::Cow;
use std::ops::Range;

/// Precomputed gather/scatter ranges for a list of points in one patch.
///
/// A plan is tied to the layout it was built from; once the patch is ordered
/// again, using it fails with [`MeshSieveError::StaleLayout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScatterPlan<P, Patch> {
    patch: Patch,
    version: u64,
    points: Vec<(P, usize)>,
    ranges: Vec<Range<usize>>,
    len: usize,
}

impl<P: PointLike, Patch: PointLike> ScatterPlan<P, Patch> {
    #[inline]
    pub fn patch(&self) -> Patch {
        self.patch
    }

    /// Layout version the plan was built against.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Total number of values gathered or scattered.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Planned points with their fiber dimension, in request order.
    pub fn points(&self) -> impl Iterator<Item = (P, usize)> + '_ {
        self.points.iter().copied()
    }
}

impl<S, Patch, I, V> CoSieve<S, Patch, I, V>
where
    S: Sieve,
    Patch: PointLike,
    I: IndexLike,
    V: Clone + Default,
{
    /// The whole buffer of an ordered patch.
    pub fn restrict_patch(&self, patch: Patch) -> Result<&[V], MeshSieveError> {
        Ok(self.patch_storage(patch)?.data.as_slice())
    }

    /// Values of `p` in `patch`.
    ///
    /// A point with a single index borrows straight from storage; a point with
    /// several indices gets an owned concatenation of their slices.
    pub fn restrict(&self, patch: Patch, p: S::Point) -> Result<Cow<'_, [V]>, MeshSieveError> {
        let st = self.patch_storage(patch)?;
        let ranges = self.ranges(patch, p)?;
        match ranges.as_slice() {
            [] => Ok(Cow::Borrowed(&[])),
            [r] => Ok(Cow::Borrowed(st.data.slice(r.start, r.len())?)),
            _ => {
                let mut out = Vec::with_capacity(ranges.iter().map(Range::len).sum());
                for r in &ranges {
                    out.extend_from_slice(st.data.slice(r.start, r.len())?);
                }
                Ok(Cow::Owned(out))
            }
        }
    }

    /// Write `values` over the indices of `p` in `patch`, consecutive chunks
    /// going to consecutive indices.
    ///
    /// # Errors
    /// [`MeshSieveError::ValueLengthMismatch`] unless `values.len()` equals the
    /// fiber dimension of `p`.
    pub fn update(&mut self, patch: Patch, p: S::Point, values: &[V]) -> Result<(), MeshSieveError> {
        self.patch_storage(patch)?;
        let ranges = self.ranges(patch, p)?;
        let expected: usize = ranges.iter().map(Range::len).sum();
        if expected != values.len() {
            return Err(MeshSieveError::ValueLengthMismatch {
                expected,
                found: values.len(),
            });
        }
        let st = self.patch_storage_mut(patch)?;
        check_in_storage(&ranges, st.data.len())?;
        let mut rest = values;
        for r in ranges {
            let (chunk, tail) = rest.split_at(r.len());
            st.data.write_at(r.start, chunk)?;
            rest = tail;
        }
        Ok(())
    }

    /// Gather ranges for `points` in `patch`, checked against the current layout.
    pub fn scatter_plan(
        &self,
        patch: Patch,
        points: impl IntoIterator<Item = S::Point>,
    ) -> Result<ScatterPlan<S::Point, Patch>, MeshSieveError> {
        let st = self.patch_storage(patch)?;
        let mut plan = ScatterPlan {
            patch,
            version: st.version,
            points: Vec::new(),
            ranges: Vec::new(),
            len: 0,
        };
        for p in points {
            let ranges = self.ranges(patch, p)?;
            check_in_storage(&ranges, st.data.len())?;
            let n: usize = ranges.iter().map(Range::len).sum();
            plan.points.push((p, n));
            plan.len += n;
            plan.ranges.extend(ranges);
        }
        Ok(plan)
    }

    /// Concatenated values of the planned points.
    pub fn restrict_with_plan(
        &self,
        plan: &ScatterPlan<S::Point, Patch>,
    ) -> Result<Vec<V>, MeshSieveError> {
        let st = self.patch_storage(plan.patch)?;
        check_version(plan, st.version)?;
        let mut out = Vec::with_capacity(plan.len);
        for r in &plan.ranges {
            out.extend_from_slice(st.data.slice(r.start, r.len())?);
        }
        Ok(out)
    }

    /// Scatter `values` (laid out as [`restrict_with_plan`](Self::restrict_with_plan)
    /// returns them) over the planned points.
    pub fn update_with_plan(
        &mut self,
        plan: &ScatterPlan<S::Point, Patch>,
        values: &[V],
    ) -> Result<(), MeshSieveError> {
        if values.len() != plan.len {
            return Err(MeshSieveError::ValueLengthMismatch {
                expected: plan.len,
                found: values.len(),
            });
        }
        let st = self.patch_storage_mut(plan.patch)?;
        check_version(plan, st.version)?;
        check_in_storage(&plan.ranges, st.data.len())?;
        let mut rest = values;
        for r in &plan.ranges {
            let (chunk, tail) = rest.split_at(r.len());
            st.data.write_at(r.start, chunk)?;
            rest = tail;
        }
        Ok(())
    }

    /// Concatenated values of `points` in `patch`, in request order.
    pub fn restrict_points(
        &self,
        patch: Patch,
        points: impl IntoIterator<Item = S::Point>,
    ) -> Result<Vec<V>, MeshSieveError> {
        let plan = self.scatter_plan(patch, points)?;
        self.restrict_with_plan(&plan)
    }

    /// Write `values` over `points` in `patch`; the inverse of
    /// [`restrict_points`](Self::restrict_points).
    pub fn update_points(
        &mut self,
        patch: Patch,
        points: impl IntoIterator<Item = S::Point>,
        values: &[V],
    ) -> Result<(), MeshSieveError> {
        let plan = self.scatter_plan(patch, points)?;
        self.update_with_plan(&plan, values)
    }
}

fn check_version<P, Patch: PointLike>(
    plan: &ScatterPlan<P, Patch>,
    found: u64,
) -> Result<(), MeshSieveError> {
    if plan.version == found {
        Ok(())
    } else {
        Err(MeshSieveError::StaleLayout {
            patch: format!("{:?}", plan.patch),
            expected: plan.version,
            found,
        })
    }
}

fn check_in_storage(ranges: &[Range<usize>], len: usize) -> Result<(), MeshSieveError> {
    match ranges.iter().find(|r| r.end > len) {
        Some(r) => Err(MeshSieveError::IndexOutOfStorage {
            offset: r.start,
            end: r.end,
            len,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::index::{Interval, IntervalLike};
    use crate::topology::sieve::InMemorySieve;
    use std::sync::Arc;

    fn edge() -> CoSieve<InMemorySieve<u32>, u8> {
        let topo = Arc::new(InMemorySieve::from_arrows([(1, 3, ()), (2, 3, ())]));
        let mut cs = CoSieve::new(topo);
        cs.set_patch([3], 0);
        cs.set_index_dimension_by_depth(0, 2).unwrap();
        cs.set_index_dimension(0, 3, 1);
        cs
    }

    #[test]
    fn access_before_ordering_fails() {
        let cs = edge();
        assert!(matches!(
            cs.restrict(0, 1),
            Err(MeshSieveError::PatchNotOrdered(_))
        ));
        assert!(matches!(
            cs.restrict_patch(4),
            Err(MeshSieveError::UnknownPatch(_))
        ));
    }

    #[test]
    fn single_index_borrows() {
        let mut cs = edge();
        cs.order_patches().unwrap();
        cs.update(0, 2, &[4.0, 5.0]).unwrap();
        let got = cs.restrict(0, 2).unwrap();
        assert!(matches!(got, Cow::Borrowed(_)));
        assert_eq!(&*got, &[4.0, 5.0]);
        drop(got);
        assert_eq!(cs.restrict_patch(0).unwrap().len(), 5);
        assert!(matches!(
            cs.update(0, 2, &[1.0]),
            Err(MeshSieveError::ValueLengthMismatch { expected: 2, found: 1 })
        ));
        assert!(matches!(
            cs.restrict(0, 9),
            Err(MeshSieveError::MissingIndex { .. })
        ));
    }

    #[test]
    fn unresolved_index_is_reported() {
        let mut cs = edge();
        cs.order_patches().unwrap();
        // a point outside the closure of the patch is never ordered
        cs.set_index_dimension(0, 42, 1);
        assert!(matches!(
            cs.restrict(0, 42),
            Err(MeshSieveError::UnresolvedIndex { .. })
        ));
    }

    #[test]
    fn bulk_gather_scatter() {
        let mut cs = edge();
        cs.order_patches().unwrap();
        cs.update_points(0, [1, 3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(&*cs.restrict(0, 3).unwrap(), &[3.0]);
        assert_eq!(&*cs.restrict(0, 2).unwrap(), &[4.0, 5.0]);
        assert_eq!(
            cs.restrict_points(0, [2, 1]).unwrap(),
            vec![4.0, 5.0, 1.0, 2.0]
        );
        let before = cs.restrict_patch(0).unwrap().to_vec();
        assert!(cs.update_points(0, [1, 2], &[0.0; 3]).is_err());
        assert_eq!(cs.restrict_patch(0).unwrap(), before.as_slice());
    }

    #[test]
    fn plan_goes_stale_after_reorder() {
        let mut cs = edge();
        cs.order_patches().unwrap();
        let plan = cs.scatter_plan(0, [1, 2]).unwrap();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.points().collect::<Vec<_>>(), vec![(1, 2), (2, 2)]);
        cs.update_with_plan(&plan, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(cs.restrict_with_plan(&plan).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        cs.order_patches().unwrap();
        assert!(matches!(
            cs.restrict_with_plan(&plan),
            Err(MeshSieveError::StaleLayout { .. })
        ));
        assert!(cs.update_with_plan(&plan, &[0.0; 4]).is_err());
    }

    #[test]
    fn zero_length_point_reads_empty() {
        let mut cs = edge();
        cs.set_index_dimension(0, 3, 0);
        cs.order_patches().unwrap();
        assert!(cs.restrict(0, 3).unwrap().is_empty());
        assert_eq!(cs.index(0, 3), Some(Interval::unresolved(0)));
    }
}
