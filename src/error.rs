use thiserror::Error;

/// Largest nonzero count / per-leaf assignment count the engine accepts,
/// matching spec.md's repeated use of `INT32_MAX` as the 32-bit signed
/// indexing limit (not `u32::MAX`, which a 32-bit signed index cannot
/// actually address).
pub const INT32_MAX: u32 = i32::MAX as u32;

/// Errors surfaced by the engine. All are non-recoverable from within the
/// engine itself: the caller's in-progress allocations become garbage and no
/// half-built structure is ever returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unsupported element kind token {token:?}")]
    UnsupportedKind { token: String },

    #[error("value kind {got:?} does not match SVT kind {expected:?}")]
    TypeMismatch {
        expected: crate::kind::ElementKind,
        got: crate::kind::ElementKind,
    },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("coordinate {coord} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        dim: usize,
        coord: i64,
        size: u32,
    },

    #[error("invalid index at offset {offset}: {reason}")]
    InvalidIndex { offset: usize, reason: String },

    #[error("{nnz} nonzeros exceeds the 32-bit-indexed output limit of {limit}")]
    TooManyNonzeros { nnz: u64, limit: u32 },

    #[error("{count} assignments to a single leaf exceeds the limit of {limit}")]
    TooManyAssignments { count: u64, limit: u32 },

    #[error("internal invariant violated: {0}")]
    InvariantViolated(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
