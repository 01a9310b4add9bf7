//! HTTP handlers for the marketplace API.
//!
//! Each module maps one resource's routes onto the engine's handlers and
//! wraps results in the response envelope.

pub mod extract;
pub mod messages;
pub mod orders;
pub mod projects;
pub mod users;
