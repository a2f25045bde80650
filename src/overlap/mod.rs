//! Overlap between ranks: shared patches and indices, the delta of remote
//! values, and the policies used to reduce it into local storage.

pub mod delta;
#[allow(clippy::module_inception)]
pub mod overlap;
pub mod policy;
mod reduce;

pub use delta::{Delta, OverlapIndex, OverlapPatch};
pub use overlap::{IndexLink, Overlap, OverlapIndices, OverlapPatches, PatchLink};
pub use policy::{
    Approximately, LowestRankWins, OverlapSite, ReductionPolicy, RequireIdentical, Sum,
};
