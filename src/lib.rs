//! mpishim - stable numeric ABI over a message-passing runtime.
//!
//! Client code holds small integer handles and a fixed-layout status record;
//! this crate translates them to and from the underlying runtime's opaque
//! handle types and implementation-varying constants at every call boundary,
//! so binaries need no recompilation when the runtime changes version or
//! vendor.
//!
//! # Primary usage
//!
//! ```
//! use mpishim::runtime::mock::MockRuntime;
//! use mpishim::shim::Shim;
//! use mpishim::core::constants::{COMM_WORLD, TYPE_INT};
//!
//! let mut shim = Shim::new(MockRuntime::new());
//! shim.init().unwrap();
//!
//! assert_eq!(shim.comm_rank(COMM_WORLD).unwrap(), 0);
//!
//! let mut pair = shim.type_contiguous(2, TYPE_INT).unwrap();
//! assert_eq!(shim.type_size(pair).unwrap(), 8);
//! shim.type_free(&mut pair).unwrap();
//!
//! shim.finalize().unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`core`] - pools, linkage, status and constant translation
//! - [`runtime`] - the [`runtime::NativeRuntime`] seam plus a mock for tests
//! - [`shim`] - the forwarding entry points clients consume

pub mod core;
pub mod runtime;
pub mod shim;

// Re-export the types most callers touch.
pub use crate::core::{
    // Error handling
    return_code, ShimError, ShimResult,
    // Handle machinery
    HandleKind, HandlePool, Slot,
    // Status records
    Status,
    // Session management
    TranslationSession,
};
pub use crate::runtime::NativeRuntime;
pub use crate::shim::Shim;
