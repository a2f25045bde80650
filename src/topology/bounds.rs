//! Common bound aliases used across topology code.
//!
//! These traits have blanket impls, so any type satisfying the underlying
//! bounds will automatically implement them. They only reduce duplication in
//! `where` clauses.

/// Canonical bound set for point, patch and index identifiers.
///
/// - `Copy` for cheap pass-by-value in tight loops
/// - `Eq + Hash` for `HashMap`-backed adjacencies
/// - `Ord` for deterministic ordering (base/cap, strata, overlap exchange)
/// - `Debug` for diagnostics and error messages
pub trait PointLike: Copy + Eq + std::hash::Hash + Ord + std::fmt::Debug {}
impl<T> PointLike for T where T: Copy + Eq + std::hash::Hash + Ord + std::fmt::Debug {}

/// Bound for arc colors. Colors order the arcs of a cone, and `Default` is
/// the color used when none is given.
pub trait ColorLike: PointLike + Default {}
impl<T> ColorLike for T where T: PointLike + Default {}
