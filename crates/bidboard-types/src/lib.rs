//! Common types module for the bidboard marketplace client.
//!
//! This module defines the data model shared by every bidboard crate:
//! orders, proposals, the derived ranking rows, the error kinds surfaced to
//! callers and the typed shapes of the REST envelope.

/// API envelope and identity types exchanged with the marketplace backend.
pub mod api;
/// Domain error kinds surfaced by every marketplace operation.
pub mod error;
/// Order types: fields, statuses, filters and actions.
pub mod order;
/// Proposal types, proposed deadlines and ranking rows.
pub mod proposal;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Opaque credential wrapper that never leaks into logs.
pub mod secret_string;
/// Explicit session value threaded through backend calls.
pub mod session;
/// Storage types for managing persisted data.
pub mod storage;
/// Utility functions for wire decoding and display formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use error::*;
pub use order::*;
pub use proposal::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use session::Session;
pub use storage::*;
pub use utils::{format_brl, format_deadline_days, truncate_id};
pub use validation::*;

/// Opaque, server-assigned order identifier.
pub type OrderId = String;
/// Opaque, server-assigned proposal identifier.
pub type ProposalId = String;
/// Opaque, server-assigned user identifier.
pub type UserId = String;
