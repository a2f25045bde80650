//! Reconciliation policies applied by [`CoSieve::reduce_with`](crate::data::cosieve::CoSieve::reduce_with).
//!
//! A policy merges a neighbor's copy of a point's values into the values
//! staged for this rank. Neighbors are visited in ascending rank order.

use crate::mesh_error::MeshSieveError;
use num_traits::Float;
use std::fmt::Debug;
use std::ops::AddAssign;

/// Where a reconciliation happens.
#[derive(Copy, Clone, Debug)]
pub struct OverlapSite<'a> {
    pub point: &'a dyn Debug,
    /// Rank whose values are being merged in.
    pub rank: usize,
    /// Lowest rank among this rank and the neighbors already merged for this
    /// slice.
    pub owner: usize,
}

impl OverlapSite<'_> {
    fn mismatch(&self) -> MeshSieveError {
        MeshSieveError::OverlapValueMismatch {
            point: format!("{:?}", self.point),
            rank: self.rank,
        }
    }
}

/// Rule for merging remote values into local ones.
pub trait ReductionPolicy<V> {
    /// Merge `remote` into `current`; both have the same length.
    fn reconcile(
        &self,
        site: &OverlapSite<'_>,
        current: &mut [V],
        remote: &[V],
    ) -> Result<(), MeshSieveError>;
}

/// Both copies must be identical; the default policy.
#[derive(Copy, Clone, Debug, Default)]
pub struct RequireIdentical;

impl<V: PartialEq> ReductionPolicy<V> for RequireIdentical {
    fn reconcile(
        &self,
        site: &OverlapSite<'_>,
        current: &mut [V],
        remote: &[V],
    ) -> Result<(), MeshSieveError> {
        if current == remote {
            Ok(())
        } else {
            Err(site.mismatch())
        }
    }
}

/// Copies may differ by at most `tol` per component; the local values are kept.
#[derive(Copy, Clone, Debug)]
pub struct Approximately<T> {
    pub tol: T,
}

impl<V: Float> ReductionPolicy<V> for Approximately<V> {
    fn reconcile(
        &self,
        site: &OverlapSite<'_>,
        current: &mut [V],
        remote: &[V],
    ) -> Result<(), MeshSieveError> {
        // written so that NaN on either side fails
        if current
            .iter()
            .zip(remote)
            .all(|(&a, &b)| (a - b).abs() <= self.tol)
        {
            Ok(())
        } else {
            Err(site.mismatch())
        }
    }
}

/// Add every neighbor's contribution.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sum;

impl<V: AddAssign + Copy> ReductionPolicy<V> for Sum {
    fn reconcile(
        &self,
        _site: &OverlapSite<'_>,
        current: &mut [V],
        remote: &[V],
    ) -> Result<(), MeshSieveError> {
        for (c, &r) in current.iter_mut().zip(remote) {
            *c += r;
        }
        Ok(())
    }
}

/// The copy held by the lowest rank wins everywhere.
#[derive(Copy, Clone, Debug, Default)]
pub struct LowestRankWins;

impl<V: Copy> ReductionPolicy<V> for LowestRankWins {
    fn reconcile(
        &self,
        site: &OverlapSite<'_>,
        current: &mut [V],
        remote: &[V],
    ) -> Result<(), MeshSieveError> {
        if site.rank < site.owner {
            current.copy_from_slice(remote);
        }
        Ok(())
    }
}
