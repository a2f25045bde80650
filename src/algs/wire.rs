//! Fixed, versioned, little-endian wire types for the overlap exchanges.

use crate::mesh_error::MeshSieveError;
use crate::topology::point::PointId;
use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, size_of};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a received byte buffer into records.
///
/// Received buffers carry no alignment guarantee, so each record is read
/// unaligned.
pub fn decode_records<T: Pod>(bytes: &[u8], neighbor: usize) -> Result<Vec<T>, MeshSieveError> {
    let sz = size_of::<T>();
    if sz == 0 || bytes.len() % sz != 0 {
        return Err(MeshSieveError::WireDecode {
            neighbor,
            message: format!("{} bytes is not a whole number of {sz}-byte records", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(sz)
        .map(bytemuck::pod_read_unaligned)
        .collect())
}

pub fn expect_exact_len(actual: usize, expected: usize, neighbor: usize) -> Result<(), MeshSieveError> {
    if actual == expected {
        Ok(())
    } else {
        Err(MeshSieveError::WireDecode {
            neighbor,
            message: format!("expected {expected} bytes, got {actual}"),
        })
    }
}

/// Identifiers that can be shipped as a `u64`.
pub trait WirePoint: Copy {
    fn to_wire(self) -> u64;
    /// `None` if `w` is not a valid identifier of this type.
    fn from_wire(w: u64) -> Option<Self>;
}

impl WirePoint for PointId {
    #[inline]
    fn to_wire(self) -> u64 {
        self.get()
    }
    #[inline]
    fn from_wire(w: u64) -> Option<Self> {
        PointId::new(w).ok()
    }
}

macro_rules! wire_int {
    ($($t:ty),*) => {$(
        impl WirePoint for $t {
            #[inline]
            fn to_wire(self) -> u64 {
                // sign-extended for signed types; from_wire undoes it
                self as i128 as u64
            }
            #[inline]
            fn from_wire(w: u64) -> Option<Self> {
                <$t>::try_from(w)
                    .ok()
                    .or_else(|| <$t>::try_from(w as i64).ok())
            }
        }
    )*};
}

wire_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64);

impl WirePoint for char {
    #[inline]
    fn to_wire(self) -> u64 {
        u64::from(u32::from(self))
    }
    #[inline]
    fn from_wire(w: u64) -> Option<Self> {
        u32::try_from(w).ok().and_then(char::from_u32)
    }
}

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// All multi-byte integers in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Debug)]
pub struct WireCount {
    pub n_le: u32, // count of following records
}

impl WireCount {
    /// Reserved for a count that does not fit; the receiver rejects it.
    pub const OVERFLOW: u32 = u32::MAX;

    /// Encode `n` records bound for `neighbor`.
    ///
    /// # Errors
    /// [`MeshSieveError::CommError`] if `n` does not fit below [`Self::OVERFLOW`].
    pub fn new(n: usize, neighbor: usize) -> Result<Self, MeshSieveError> {
        match u32::try_from(n) {
            Ok(n) if n != Self::OVERFLOW => Ok(Self { n_le: n.to_le() }),
            _ => Err(MeshSieveError::CommError {
                neighbor,
                message: format!("{n} records exceed the wire count limit"),
            }),
        }
    }

    pub fn overflow() -> Self {
        Self {
            n_le: Self::OVERFLOW.to_le(),
        }
    }

    /// The count sent by `neighbor`.
    ///
    /// # Errors
    /// [`MeshSieveError::CommError`] if the sender could not encode its count.
    pub fn get(&self, neighbor: usize) -> Result<usize, MeshSieveError> {
        match u32::from_le(self.n_le) {
            Self::OVERFLOW => Err(MeshSieveError::CommError {
                neighbor,
                message: format!("rank {neighbor} has more records than a wire count holds"),
            }),
            n => Ok(n as usize),
        }
    }
}

/// `(point, patch)` membership, exchanged to find shared patches.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Debug)]
pub struct WirePatchRecord {
    pub point_le: u64,
    pub patch_le: u64,
}

impl WirePatchRecord {
    pub fn new(point: u64, patch: u64) -> Self {
        Self {
            point_le: point.to_le(),
            patch_le: patch.to_le(),
        }
    }
    pub fn point(&self) -> u64 {
        u64::from_le(self.point_le)
    }
    pub fn patch(&self) -> u64 {
        u64::from_le(self.patch_le)
    }
}

/// One index of a shared point: its position among the point's indices in
/// the patch, and the slice it names.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Debug)]
pub struct WireIndexRecord {
    pub point_le: u64,
    pub patch_le: u64,
    pub ordinal_le: u32,
    pub _pad: u32, // explicit padding to 8-byte alignment
    pub offset_le: u64,
    pub len_le: u64,
}

impl WireIndexRecord {
    pub const SIZE: usize = 40;

    pub fn new(point: u64, patch: u64, ordinal: u32, offset: u64, len: u64) -> Self {
        Self {
            point_le: point.to_le(),
            patch_le: patch.to_le(),
            ordinal_le: ordinal.to_le(),
            _pad: 0,
            offset_le: offset.to_le(),
            len_le: len.to_le(),
        }
    }
    pub fn point(&self) -> u64 {
        u64::from_le(self.point_le)
    }
    pub fn patch(&self) -> u64 {
        u64::from_le(self.patch_le)
    }
    pub fn ordinal(&self) -> u32 {
        u32::from_le(self.ordinal_le)
    }
    pub fn offset(&self) -> u64 {
        u64::from_le(self.offset_le)
    }
    pub fn len(&self) -> u64 {
        u64::from_le(self.len_le)
    }
}

// ===== Compile-time sanity checks =========================================

static_assertions::const_assert_eq!(size_of::<WireCount>(), 4);
static_assertions::const_assert_eq!(size_of::<WirePatchRecord>(), 16);
static_assertions::const_assert_eq!(size_of::<WireIndexRecord>(), WireIndexRecord::SIZE);
static_assertions::const_assert_eq!(align_of::<WireIndexRecord>(), 8);
