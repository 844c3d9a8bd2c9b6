//! Error types for the translation layer.
//!
//! Using thiserror for idiomatic error handling. Every variant can be
//! flattened into the shim's numeric error-code space via [`ShimError::code`],
//! which is what the ABI boundary ultimately reports (0 = success).

use thiserror::Error;

use super::constants::{self, HandleKind};

/// Main error type for handle translation and call forwarding.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimError {
    /// A handle was out of range, free, or of the wrong lifecycle state.
    #[error("invalid {kind} handle {handle}")]
    InvalidHandle { kind: HandleKind, handle: i32 },

    /// An operation tried to free or rebind a predefined object.
    #[error("operation not permitted on static {kind} handle {handle}")]
    StaticHandle { kind: HandleKind, handle: i32 },

    /// The native runtime's status record does not fit the opaque region.
    ///
    /// This is a build/configuration defect surfaced at initialization; it is
    /// not recoverable at runtime.
    #[error("native status is {native} bytes but the opaque region holds {capacity}")]
    StatusCapacity { native: usize, capacity: usize },

    /// A forwarded native call failed; `code` is already in shim space.
    #[error("native call failed with code {code}")]
    NativeCall { code: i32 },

    /// A group was released more times than it was referenced.
    #[error("reference count underflow on group handle {group}")]
    RefCountUnderflow { group: i32 },

    /// A dynamic operation was issued before `init` or after `finalize`.
    #[error("translation layer is not initialized")]
    Uninitialized,
}

impl ShimError {
    /// Flatten into the shim's numeric error space.
    pub fn code(self) -> i32 {
        match self {
            ShimError::InvalidHandle { kind, .. } => kind.error_code(),
            ShimError::StaticHandle { .. } => constants::ERR_ARG,
            ShimError::StatusCapacity { .. } => constants::ERR_INTERN,
            ShimError::NativeCall { code } => code,
            ShimError::RefCountUnderflow { .. } => constants::ERR_INTERN,
            ShimError::Uninitialized => constants::ERR_OTHER,
        }
    }
}

/// Result type alias for translation operations.
pub type ShimResult<T> = Result<T, ShimError>;

/// Numeric return code for a finished operation, 0 on success.
pub fn return_code<T>(result: &ShimResult<T>) -> i32 {
    match result {
        Ok(_) => constants::SUCCESS,
        Err(e) => e.code(),
    }
}
