//! Core marketplace engine.
//!
//! The [`MarketEngine`] owns the storage service, the state machines and the
//! request handlers, and runs the activity loop that records every domain
//! event published on the bus.

pub mod event_bus;
pub mod lifecycle;

use crate::handlers::message::MessageStore;
use crate::handlers::user::UserStore;
use crate::handlers::{MessageHandler, OrderHandler, ProjectHandler, UserHandler};
use crate::state::{OrderStateMachine, ProjectStateMachine};
use market_config::Config;
use market_storage::StorageService;
use market_types::{
	truncate_id, MarketEvent, MessageEvent, OrderEvent, ProjectEvent, UserEvent,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

/// Main marketplace engine shared by the HTTP layer.
#[derive(Clone)]
pub struct MarketEngine {
	config: Config,
	storage: Arc<StorageService>,
	event_bus: event_bus::EventBus,
	users: Arc<UserHandler>,
	projects: Arc<ProjectHandler>,
	orders: Arc<OrderHandler>,
	messages: Arc<MessageHandler>,
}

impl MarketEngine {
	/// Creates the engine and its handlers on top of `storage`.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let limits = config.marketplace.clone();

		let project_machine = Arc::new(ProjectStateMachine::new(storage.clone()));
		let order_machine = Arc::new(OrderStateMachine::new(storage.clone()));
		let message_store = Arc::new(MessageStore::new(storage.clone()));
		let user_store = Arc::new(UserStore::new(storage.clone()));

		let users = Arc::new(UserHandler::new(
			user_store,
			storage.clone(),
			event_bus.clone(),
			limits.clone(),
		));

		let projects = Arc::new(ProjectHandler::new(
			project_machine,
			event_bus.clone(),
			limits.clone(),
		));

		let orders = Arc::new(OrderHandler::new(
			order_machine,
			projects.clone(),
			users.clone(),
			storage.clone(),
			event_bus.clone(),
			limits.clone(),
		));

		let messages = Arc::new(MessageHandler::new(
			message_store,
			users.clone(),
			event_bus.clone(),
			limits,
		));

		Self {
			config,
			storage,
			event_bus,
			users,
			projects,
			orders,
			messages,
		}
	}

	/// Records marketplace activity until a shutdown signal arrives.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut event_receiver = self.event_bus.subscribe();

		loop {
			tokio::select! {
				received = event_receiver.recv() => {
					match received {
						Ok(event) => log_event(&event),
						Err(RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "Activity log fell behind the event bus");
						}
						Err(RecvError::Closed) => {
							return Err(EngineError::Service("Event bus closed".into()));
						}
					}
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		self.shutdown().await
	}

	pub fn users(&self) -> &Arc<UserHandler> {
		&self.users
	}

	pub fn projects(&self) -> &Arc<ProjectHandler> {
		&self.projects
	}

	pub fn orders(&self) -> &Arc<OrderHandler> {
		&self.orders
	}

	pub fn messages(&self) -> &Arc<MessageHandler> {
		&self.messages
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}
}

fn log_event(event: &MarketEvent) {
	match event {
		MarketEvent::User(UserEvent::Registered { user_id, role }) => {
			tracing::info!(user_id = %truncate_id(user_id), %role, "User registered");
		},
		MarketEvent::User(UserEvent::ProfileUpdated { user_id }) => {
			tracing::debug!(user_id = %truncate_id(user_id), "Profile updated");
		},
		MarketEvent::Project(ProjectEvent::StatusChanged {
			project_id,
			from,
			to,
		}) => {
			tracing::info!(
				project_id = %truncate_id(project_id),
				%from,
				%to,
				"Project status changed"
			);
		},
		MarketEvent::Order(OrderEvent::StatusChanged { order_id, from, to }) => {
			tracing::info!(
				order_id = %truncate_id(order_id),
				%from,
				%to,
				"Order status changed"
			);
		},
		MarketEvent::Message(MessageEvent::Sent {
			message_id,
			receiver,
			..
		}) => {
			tracing::debug!(
				message_id = %truncate_id(message_id),
				receiver = %truncate_id(receiver),
				"Message delivered"
			);
		},
		other => tracing::debug!(event = ?other, "Marketplace activity"),
	}
}
