//! Common types module for the freelance marketplace.
//!
//! This module defines the documents, request/response shapes and shared
//! enumerations used by every other crate in the workspace. Keeping them in
//! one place lets storage, the lifecycle gates and the HTTP layer agree on a
//! single wire format.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// File metadata records attached to projects, deliverables and messages.
pub mod attachment;
/// Domain events published after successful state changes.
pub mod events;
/// Direct messages exchanged between users.
pub mod message;
/// Orders, deliverables and reviews.
pub mod order;
/// Projects and proposals.
pub mod project;
/// Registry trait for named, config-selected implementations.
pub mod registry;
/// Storage namespaces.
pub mod storage;
/// Users, roles and the authenticated actor.
pub mod user;
/// Utility functions shared across crates.
pub mod utils;
/// Configuration validation types for implementation-specific TOML tables.
pub mod validation;

pub use api::*;
pub use attachment::*;
pub use events::*;
pub use message::*;
pub use order::*;
pub use project::*;
pub use registry::*;
pub use storage::*;
pub use user::*;
pub use utils::{current_timestamp, new_id, truncate_id};
pub use validation::*;
