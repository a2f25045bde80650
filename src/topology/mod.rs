//! Top-level module for mesh topology abstractions.
//!
//! This module provides the graph substrate consumed by the CoSieve:
//! - [`point::PointId`] and the bound aliases in [`bounds`]
//! - [`bigraph::BiGraph`], the colored bipartite incidence structure
//! - the [`Sieve`] trait with recursive closure/strata queries and its
//!   in-memory implementation

pub mod bigraph;
pub mod bounds;
pub mod cache;
pub mod point;
pub mod sieve;

pub use bigraph::BiGraph;
pub use cache::InvalidateCache;
pub use sieve::*;
