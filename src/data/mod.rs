//! Data module: indices, patch storage and the CoSieve

pub mod cosieve;
pub mod index;
pub mod storage;

pub use crate::debug_invariants::DebugInvariants;

pub use cosieve::{CoSieve, ScatterPlan};
pub use index::{IndexLike, Interval, IntervalLike};
pub use storage::{Storage, VecStorage};
