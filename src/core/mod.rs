// This module is the hub for the translation core shared by every entry
// point: the stable constant space, typed errors, the generic handle pool,
// the constant-translation tables, the status translator, the
// group/communicator linkage graph, the request lifecycle tracker, and the
// session object that owns all of them. Components are layered leaves-first:
// tables and pools know nothing of each other, linkage builds on two pools,
// the session wires everything together at initialization.

//! Core translation infrastructure.
//!
//! # Key components
//!
//! ## Constant space (`constants`)
//! - Handle type aliases and null/static handle layout per object kind
//! - The shim's error-code, comparison and access-mode constants
//!
//! ## Handle pools (`pool`)
//! - Growable slot arrays with first-fit reuse and doubling growth
//! - Explicit `Free`/`Bound` slots, no sentinel-value collisions
//!
//! ## Linkage (`linkage`)
//! - Reference-counted group ownership with an auditable owner list
//!
//! ## Status translation (`status`)
//! - Fixed-layout record with a capacity-checked opaque native image
//!
//! ## Request tracking (`requests`)
//! - Completion-driven handle invalidation, scalar and per-element

pub mod constants;
pub mod error;
pub mod linkage;
pub mod pool;
pub mod requests;
pub mod session;
pub mod status;
pub mod tables;

pub use constants::HandleKind;
pub use error::{return_code, ShimError, ShimResult};
pub use linkage::{CommLinkage, CommRecord, FreedComm, GroupRecord};
pub use pool::{HandlePool, Slot, DEFAULT_POOL_CAPACITY};
pub use requests::RequestTracker;
pub use session::TranslationSession;
pub use status::Status;
pub use tables::ConstantTables;
