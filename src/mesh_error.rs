//! MeshSieveError: Unified error type for cosieve public APIs
//!
//! Every fallible operation in the crate returns this type. Variants are
//! grouped into the broad classes reported by [`MeshSieveError::kind`], which
//! callers can use to decide whether a failure is a malformed input
//! (structural), a disagreement between processes (consistency), a misuse of
//! the API (programming) or a transport failure (communication).

use thiserror::Error;

/// Broad classification of a [`MeshSieveError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed topology or order chain.
    Structural,
    /// Values or layouts disagree across an overlap.
    Consistency,
    /// API used out of order (e.g. before ordering, with a stale layout).
    Programming,
    /// The communication facility failed or delivered malformed bytes.
    Communication,
}

/// Unified error type for cosieve operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshSieveError {
    /// Attempted to construct a PointId with a zero value (invalid).
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
    /// The topology contains a cycle; expected a DAG.
    #[error("Topology error: cycle detected in mesh (expected DAG)")]
    CycleDetected,
    /// An order chain failed validation.
    #[error("Invalid order chain: {0}")]
    InvalidOrderChain(String),
    /// An edge (or face) of a cell did not separate exactly two neighbours.
    #[error("Non-manifold element {element}: expected 2 incident faces, found {found}")]
    NonManifold { element: String, found: usize },
    /// Both neighbours across a separating element were the current one.
    #[error("Inconsistent separation across {0}")]
    InconsistentSeparation(String),
    /// Internal bookkeeping of a graph or layout is inconsistent.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Overlapping values disagree under the active reduction policy.
    #[error("Overlap values differ at point {point} shared with rank {rank}")]
    OverlapValueMismatch { point: String, rank: usize },
    /// Two ranks attach a different number or size of indices to a shared point.
    #[error("Overlap layout mismatch at point {point} shared with rank {rank}: {detail}")]
    OverlapShapeMismatch {
        point: String,
        rank: usize,
        detail: String,
    },
    /// Another rank failed an overlap stage, so this rank left it too.
    #[error("Overlap aborted: rank {rank} failed the {stage} exchange")]
    OverlapAborted { rank: usize, stage: &'static str },

    /// The patch has never been declared.
    #[error("Unknown patch {0}")]
    UnknownPatch(String),
    /// Storage for the patch has not been allocated by `order_patches`.
    #[error("Patch {0} has not been ordered")]
    PatchNotOrdered(String),
    /// An index attached to the point still carries the unresolved sentinel offset.
    #[error("Point {point} has unresolved indices in patch {patch}; call order_patches first")]
    UnresolvedIndex { patch: String, point: String },
    /// No index of the requested patch is attached to the point.
    #[error("Point {point} has no index in patch {patch}")]
    MissingIndex { patch: String, point: String },
    /// The same index is already attached to the point under this patch and color.
    #[error("Point {point} already carries index {index} in patch {patch}")]
    DuplicateIndex {
        patch: String,
        point: String,
        index: String,
    },
    /// A scatter plan was built against a layout that has since been replaced.
    #[error("Stale layout for patch {patch}: plan built at version {expected}, storage is at {found}")]
    StaleLayout {
        patch: String,
        expected: u64,
        found: u64,
    },
    /// base/cap queried after a mutation without a fresh `stratify()`.
    #[error("Graph must be stratified after mutation before querying base/cap")]
    Unstratified,
    /// Input value slice does not match the fiber dimension.
    #[error("Value length mismatch: expected {expected}, found {found}")]
    ValueLengthMismatch { expected: usize, found: usize },
    /// An index range falls outside the patch storage.
    #[error("Index range {offset}..{end} exceeds storage of length {len}")]
    IndexOutOfStorage { offset: usize, end: usize, len: usize },

    /// Error during communication with a neighbor.
    #[error("Communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// Bytes received from a neighbor do not decode as the expected record.
    #[error("Wire decode error from rank {neighbor}: {message}")]
    WireDecode { neighbor: usize, message: String },
}

impl MeshSieveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use MeshSieveError::*;
        match self {
            InvalidPointId
            | CycleDetected
            | InvalidOrderChain(_)
            | NonManifold { .. }
            | InconsistentSeparation(_)
            | InvariantViolation(_) => ErrorKind::Structural,
            OverlapValueMismatch { .. }
            | OverlapShapeMismatch { .. }
            | OverlapAborted { .. } => ErrorKind::Consistency,
            UnknownPatch(_)
            | PatchNotOrdered(_)
            | UnresolvedIndex { .. }
            | MissingIndex { .. }
            | DuplicateIndex { .. }
            | StaleLayout { .. }
            | Unstratified
            | ValueLengthMismatch { .. }
            | IndexOutOfStorage { .. } => ErrorKind::Programming,
            CommError { .. } | WireDecode { .. } => ErrorKind::Communication,
        }
    }

    pub(crate) fn unknown_patch(patch: impl std::fmt::Debug) -> Self {
        MeshSieveError::UnknownPatch(format!("{patch:?}"))
    }

    pub(crate) fn not_ordered(patch: impl std::fmt::Debug) -> Self {
        MeshSieveError::PatchNotOrdered(format!("{patch:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            MeshSieveError::InvalidOrderChain("x".into()).kind(),
            ErrorKind::Structural
        );
        assert_eq!(
            MeshSieveError::OverlapValueMismatch {
                point: "1".into(),
                rank: 1
            }
            .kind(),
            ErrorKind::Consistency
        );
        assert_eq!(
            MeshSieveError::OverlapAborted {
                rank: 2,
                stage: "index"
            }
            .kind(),
            ErrorKind::Consistency
        );
        assert_eq!(MeshSieveError::Unstratified.kind(), ErrorKind::Programming);
        assert_eq!(
            MeshSieveError::CommError {
                neighbor: 0,
                message: String::new()
            }
            .kind(),
            ErrorKind::Communication
        );
    }

    #[test]
    fn display_mentions_patch() {
        let e = MeshSieveError::not_ordered(3u32);
        assert_eq!(e.to_string(), "Patch 3 has not been ordered");
    }
}
