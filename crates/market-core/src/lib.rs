//! Core engine for the freelance marketplace.
//!
//! This crate holds the marketplace's business rules. The [`lifecycle`]
//! gates decide whether an operation on a project or order is allowed, the
//! [`state`] machines persist the outcome, and the [`handlers`] expose one
//! entry point per operation to the HTTP layer. A [`MarketEngine`] ties them
//! to a storage backend and an event bus and is built from configuration by
//! the [`MarketBuilder`].

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod lifecycle;
pub mod state;

pub use builder::{BuilderError, MarketBuilder, MarketFactories};
pub use engine::{event_bus::EventBus, EngineError, MarketEngine};
pub use handlers::HandlerError;
pub use lifecycle::LifecycleError;
