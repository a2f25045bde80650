//! `PointId`: a strong, zero-cost handle for mesh entities
//!
//! Every element of a mesh (cell, face, edge, vertex) is represented by an
//! opaque identifier. `PointId` wraps a nonzero `u64` so that 0 stays
//! available as an invalid or sentinel value, and so that `Option<PointId>`
//! has the size of a `u64`.

use crate::mesh_error::MeshSieveError;
use std::{fmt, num::NonZeroU64};

/// Opaque, totally ordered mesh point identifier.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PointId(NonZeroU64);

impl PointId {
    /// Creates a new `PointId` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns [`MeshSieveError::InvalidPointId`] if `raw == 0`.
    ///
    /// # Example
    /// ```rust
    /// # use cosieve::topology::point::PointId;
    /// let p = PointId::new(1)?;
    /// assert_eq!(p.get(), 1);
    /// # Ok::<(), cosieve::mesh_error::MeshSieveError>(())
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, MeshSieveError> {
        NonZeroU64::new(raw)
            .map(PointId)
            .ok_or(MeshSieveError::InvalidPointId)
    }

    /// Returns the inner `u64` value of this `PointId`.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PointId").field(&self.get()).finish()
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl TryFrom<u64> for PointId {
    type Error = MeshSieveError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        PointId::new(raw)
    }
}
