#![cfg_attr(docsrs, feature(doc_cfg))]
//! # cosieve
//!
//! cosieve is the topology and indexing layer of a parallel PDE toolkit. It
//! represents an unstructured mesh's incidence relations as a colored
//! bipartite graph, attaches degrees of freedom to mesh points through a
//! *CoSieve*, and reconciles the values shared between ranks.
//!
//! ## Features
//! - [`BiGraph`](topology::BiGraph) and the [`Sieve`](topology::Sieve) trait:
//!   cones, supports, closure/star, depth/height strata
//! - [`CoSieve`](data::CoSieve): patches, `(offset, length)` indices,
//!   depth-first storage ordering, canonical cell numbering, restrict/update
//! - overlap completion between ranks and pluggable reduction policies, over
//!   an in-process [`LocalComm`](algs::LocalComm) or MPI (`mpi-support`)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! cosieve = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "check-invariants"]
//! ```
//!
//! ```rust
//! use std::sync::Arc;
//! use cosieve::prelude::*;
//!
//! // triangle: vertices 1..=3, edges 4..=6, face 7
//! let topo = Arc::new(InMemorySieve::<u32>::from_arrows([
//!     (1, 4, ()), (2, 4, ()), (2, 5, ()), (3, 5, ()), (3, 6, ()), (1, 6, ()),
//!     (4, 7, ()), (5, 7, ()), (6, 7, ()),
//! ]));
//! let mut cs: CoSieve<_, u8> = CoSieve::new(topo);
//! cs.set_patch([7], 0);
//! cs.set_index_dimension_by_depth(0, 1)?;
//! cs.order_patches()?;
//! assert_eq!(cs.patch_size(0)?, 3);
//! # Ok::<(), cosieve::mesh_error::MeshSieveError>(())
//! ```

pub mod algs;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod overlap;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm, Wait};
    pub use crate::algs::wire::WirePoint;
    pub use crate::config::CoSieveConfig;
    pub use crate::data::cosieve::{CoSieve, ScatterPlan};
    pub use crate::data::index::{IndexLike, Interval, IntervalLike};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::{ErrorKind, MeshSieveError};
    pub use crate::overlap::{
        Approximately, Delta, LowestRankWins, OverlapIndex, OverlapPatch, ReductionPolicy,
        RequireIdentical, Sum,
    };
    pub use crate::topology::bigraph::BiGraph;
    pub use crate::topology::bounds::{ColorLike, PointLike};
    pub use crate::topology::point::PointId;
    pub use crate::topology::sieve::{InMemorySieve, MutableSieve, Sieve};
}
