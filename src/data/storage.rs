//! Pluggable storage for patch buffers.
//!
//! This trait abstracts how a patch's flat buffer is stored. The CoSieve owns
//! one storage per patch and replaces it wholesale when the patch is
//! re-ordered.

use core::fmt::{self, Debug};

use crate::mesh_error::MeshSieveError;

/// Contiguous, indexable storage for `V` with slice access.
pub trait Storage<V>: Debug {
    /// Construct a buffer of `len`, filled with `fill`.
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone;

    /// Current length in elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entire read-only buffer.
    fn as_slice(&self) -> &[V];

    /// Entire mutable buffer.
    fn as_mut_slice(&mut self) -> &mut [V];

    /// Read-only view of `[offset .. offset + len)`.
    fn slice(&self, offset: usize, len: usize) -> Result<&[V], MeshSieveError> {
        let end = checked_end(offset, len, self.len())?;
        Ok(&self.as_slice()[offset..end])
    }

    /// Copy `src` into the range `[offset .. offset + src.len())`.
    fn write_at(&mut self, offset: usize, src: &[V]) -> Result<(), MeshSieveError>
    where
        V: Clone,
    {
        let end = checked_end(offset, src.len(), self.len())?;
        self.as_mut_slice()[offset..end].clone_from_slice(src);
        Ok(())
    }
}

fn checked_end(offset: usize, len: usize, total: usize) -> Result<usize, MeshSieveError> {
    offset
        .checked_add(len)
        .filter(|&end| end <= total)
        .ok_or(MeshSieveError::IndexOutOfStorage {
            offset,
            end: offset.saturating_add(len),
            len: total,
        })
}

/// `Vec`-backed storage (default).
#[derive(Clone, PartialEq)]
pub struct VecStorage<V>(pub(crate) Vec<V>);

impl<V> Debug for VecStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecStorage")
            .field("len", &self.0.len())
            .finish()
    }
}

impl<V> Storage<V> for VecStorage<V> {
    fn with_len(len: usize, fill: V) -> Self
    where
        V: Clone,
    {
        Self(vec![fill; len])
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn as_slice(&self) -> &[V] {
        &self.0
    }

    fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.0
    }
}

impl<V> From<Vec<V>> for VecStorage<V> {
    fn from(v: Vec<V>) -> Self {
        Self(v)
    }
}

impl<V> VecStorage<V> {
    pub fn into_inner(self) -> Vec<V> {
        self.0
    }
}
