//! Error handling for the Forge backend
//!
//! A small closed error set is surfaced from every public backend entry
//! point; no panics cross the backend boundary.

use thiserror::Error;

/// Errors reported by code-generation entry points
///
/// A failure at module granularity aborts the whole codegen call and the
/// caller receives no partial output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A caller programming error: a required argument was absent or
    /// malformed. Surfaced immediately, without side effects.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The selected architecture has no registered backend.
    #[error("no backend registered for architecture {0}")]
    NoBackend(&'static str),

    /// An opcode or width combination with no defined lowering. Silently
    /// emitting nothing would change program semantics, so this is fatal.
    #[error("unsupported lowering: {0}")]
    Unsupported(String),

    /// A broken internal invariant (compiler bug, not caller error).
    #[error("internal backend error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::InvalidArgument("module");
        assert_eq!(err.to_string(), "invalid argument: module");

        let err = BackendError::Unsupported("sext i64 -> i8".to_string());
        assert_eq!(err.to_string(), "unsupported lowering: sext i64 -> i8");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            BackendError::NoBackend("s370"),
            BackendError::NoBackend("s370")
        );
        assert_ne!(
            BackendError::InvalidArgument("module"),
            BackendError::InvalidArgument("function")
        );
    }
}
