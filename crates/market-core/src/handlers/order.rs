//! Order handler for creating and executing orders.
//!
//! An order is created by the project's client once a freelancer has been
//! chosen. Creation also keeps the project consistent: a still-open project
//! is assigned to the order's freelancer. All reads and writes are limited
//! to the two participants.

use super::{HandlerError, ProjectHandler, UserHandler};
use crate::engine::event_bus::EventBus;
use crate::lifecycle::{self, validate_request, LifecycleError};
use crate::state::OrderStateMachine;
use market_config::MarketplaceConfig;
use market_storage::StorageService;
use market_types::{
	current_timestamp, paginate, truncate_id, Actor, CreateOrderRequest, DeliverableRequest,
	FileRef, MarketEvent, Order, OrderEvent, OrderMessageRequest, OrderQuery,
	OrderStatusRequest, Pagination, ReviewRequest, StorageKey, SubmitDeliverableRequest,
	UserRole,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Handler for orders.
pub struct OrderHandler {
	orders: Arc<OrderStateMachine>,
	projects: Arc<ProjectHandler>,
	users: Arc<UserHandler>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
	limits: MarketplaceConfig,
	/// Held across the one-order-per-project check and the insert.
	creation_lock: Mutex<()>,
}

impl OrderHandler {
	pub fn new(
		orders: Arc<OrderStateMachine>,
		projects: Arc<ProjectHandler>,
		users: Arc<UserHandler>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
		limits: MarketplaceConfig,
	) -> Self {
		Self {
			orders,
			projects,
			users,
			storage,
			event_bus,
			limits,
			creation_lock: Mutex::new(()),
		}
	}

	/// Creates the single order for a project.
	#[instrument(skip_all, fields(project_id = %truncate_id(&request.project_id)))]
	pub async fn create(
		&self,
		actor: &Actor,
		request: CreateOrderRequest,
	) -> Result<Order, HandlerError> {
		lifecycle::order::validate_terms(&request)?;

		let _guard = self.creation_lock.lock().await;
		let project = self.projects.get(&request.project_id).await?;
		let order_exists = self
			.storage
			.exists(StorageKey::OrderByProject.as_str(), &project.id)
			.await?;

		let order = lifecycle::order::create_from_accepted_proposal(
			&project,
			order_exists,
			request,
			actor,
			current_timestamp(),
		)?;

		match self.users.get(&order.freelancer).await {
			Ok(user) if user.role == UserRole::Freelancer => {},
			Ok(_) | Err(HandlerError::Lifecycle(LifecycleError::NotFound(_))) => {
				return Err(LifecycleError::NotFound("Freelancer not found".into()).into());
			},
			Err(e) => return Err(e),
		}

		// The project is assigned last; earlier writes are rolled back if a
		// later one fails.
		self.storage
			.store(StorageKey::OrderByProject.as_str(), &project.id, &order.id)
			.await?;
		if let Err(e) = self.orders.store(&order).await {
			self.discard(&order, false).await;
			return Err(e.into());
		}
		if let Err(e) = self
			.projects
			.assign_for_order(&project.id, &order.freelancer, order.price)
			.await
		{
			self.discard(&order, true).await;
			return Err(e);
		}

		tracing::info!(order_id = %truncate_id(&order.id), "Order created");
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Created {
				order_id: order.id.clone(),
				project_id: order.project.clone(),
			}))
			.ok();

		Ok(order)
	}

	/// Removes the index entry and, when `stored`, the order document of a
	/// creation that failed part way.
	async fn discard(&self, order: &Order, stored: bool) {
		if stored {
			if let Err(e) = self.orders.remove_with(&order.id, |_| Ok(())).await {
				tracing::error!(order_id = %truncate_id(&order.id), error = %e, "Failed to roll back order");
			}
		}
		if let Err(e) = self
			.storage
			.remove(StorageKey::OrderByProject.as_str(), &order.project)
			.await
		{
			tracing::error!(project_id = %truncate_id(&order.project), error = %e, "Failed to roll back order index");
		}
	}

	/// Gets an order the actor takes part in.
	pub async fn get(&self, order_id: &str, actor: &Actor) -> Result<Order, HandlerError> {
		let order = self.orders.get(order_id).await?;
		lifecycle::order::check_access(&order, actor)?;
		Ok(order)
	}

	/// Orders where the actor is the client or the freelancer, newest first.
	pub async fn list(
		&self,
		actor: &Actor,
		query: OrderQuery,
	) -> Result<(Vec<Order>, Pagination), HandlerError> {
		let mut orders: Vec<Order> = self
			.orders
			.all()
			.await?
			.into_iter()
			.filter(|o| o.participant(&actor.id).is_some())
			.filter(|o| query.status.map_or(true, |s| o.status == s))
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

		Ok(paginate(
			orders,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		))
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn update_status(
		&self,
		order_id: &str,
		actor: &Actor,
		request: OrderStatusRequest,
	) -> Result<Order, HandlerError> {
		let (order, change) = self
			.orders
			.update_with(order_id, |order| {
				lifecycle::order::update_status(
					order,
					request.status,
					request.progress,
					actor,
					current_timestamp(),
				)
			})
			.await?;

		tracing::info!(status = %order.status, progress = order.progress, "Order updated");
		if change.changed() {
			self.event_bus
				.publish(MarketEvent::Order(OrderEvent::StatusChanged {
					order_id: order.id.clone(),
					from: change.from,
					to: change.to,
				}))
				.ok();
		}

		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn add_deliverable(
		&self,
		order_id: &str,
		actor: &Actor,
		request: DeliverableRequest,
	) -> Result<Order, HandlerError> {
		let (order, deliverable) = self
			.orders
			.update_with(order_id, |order| {
				lifecycle::order::add_deliverable(order, request, actor)
			})
			.await?;

		tracing::info!(deliverable_id = %truncate_id(&deliverable.id), "Deliverable added");
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::DeliverableAdded {
				order_id: order.id.clone(),
				deliverable_id: deliverable.id,
			}))
			.ok();

		Ok(order)
	}

	#[instrument(skip_all, fields(
		order_id = %truncate_id(order_id),
		deliverable_id = %truncate_id(deliverable_id),
	))]
	pub async fn submit_deliverable(
		&self,
		order_id: &str,
		deliverable_id: &str,
		actor: &Actor,
		request: SubmitDeliverableRequest,
	) -> Result<Order, HandlerError> {
		validate_request(&request)?;
		let now = current_timestamp();
		let files: Vec<FileRef> = request
			.files
			.into_iter()
			.map(|file| FileRef {
				uploaded_at: Some(now),
				..file
			})
			.collect();

		let max_files = self.limits.max_deliverable_files;
		let (order, ()) = self
			.orders
			.update_with(order_id, |order| {
				lifecycle::order::submit_deliverable(
					order,
					deliverable_id,
					files,
					max_files,
					actor,
					now,
				)
			})
			.await?;

		tracing::info!("Deliverable submitted");
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::DeliverableSubmitted {
				order_id: order.id.clone(),
				deliverable_id: deliverable_id.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Posts to the order's own message thread.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn add_message(
		&self,
		order_id: &str,
		actor: &Actor,
		request: OrderMessageRequest,
	) -> Result<Order, HandlerError> {
		validate_request(&request)?;
		let (order, message) = self
			.orders
			.update_with(order_id, |order| {
				lifecycle::order::add_message(order, request, actor, current_timestamp())
			})
			.await?;

		tracing::debug!(message_id = %truncate_id(&message.id), "Order message added");
		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn add_review(
		&self,
		order_id: &str,
		actor: &Actor,
		request: ReviewRequest,
	) -> Result<Order, HandlerError> {
		let (order, side) = self
			.orders
			.update_with(order_id, |order| {
				lifecycle::order::add_review(
					order,
					request.rating,
					request.comment,
					actor,
					current_timestamp(),
				)
			})
			.await?;

		tracing::info!(?side, rating = request.rating, "Review added");
		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::ReviewAdded {
				order_id: order.id.clone(),
				reviewer: actor.id.clone(),
			}))
			.ok();

		Ok(order)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{
		accepted_project, order_request, post_project, register, FailingWrites, TestMarket,
	};
	use std::sync::atomic::Ordering;
	use market_types::{
		DeliverableStatus, OrderStatus, Participant, ProjectStatus, ProposalDecision,
	};
	use rust_decimal::Decimal;

	fn file(name: &str) -> FileRef {
		FileRef {
			filename: name.into(),
			original_name: Some(name.into()),
			path: format!("uploads/{}", name),
			size: 42,
			uploaded_at: None,
		}
	}

	#[tokio::test]
	async fn test_one_order_per_project() {
		let market = TestMarket::new();
		let (client, freelancer, project) = accepted_project(&market).await;

		let order = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.client, client.id);

		let err = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_create_checks_ownership_and_input() {
		let market = TestMarket::new();
		let (client, freelancer, project) = accepted_project(&market).await;

		let err = market
			.orders()
			.create(&freelancer.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Forbidden(_))));

		let mut free = order_request(&project.id, &freelancer.id);
		free.price = Decimal::ZERO;
		let err = market.orders().create(&client.actor(), free).await.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Invalid(_))));

		let err = market
			.orders()
			.create(&client.actor(), order_request("missing", &freelancer.id))
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_order_on_open_project_assigns_freelancer() {
		let market = TestMarket::new();
		let client = register(&market, "c@example.com", UserRole::Client).await;
		let freelancer = register(&market, "f@example.com", UserRole::Freelancer).await;
		let project = post_project(&market, &client).await;

		let err = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &client.id))
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::NotFound(_))));
		assert_eq!(
			market.projects().get(&project.id).await.unwrap().status,
			ProjectStatus::Open
		);

		market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();

		let project = market.projects().get(&project.id).await.unwrap();
		assert_eq!(project.status, ProjectStatus::InProgress);
		assert_eq!(project.freelancer.as_deref(), Some(freelancer.id.as_str()));
	}

	#[tokio::test]
	async fn test_failed_assignment_leaves_no_order() {
		let backend = FailingWrites::new(StorageKey::Projects.as_str());
		let failing = backend.failing.clone();
		let market = TestMarket::with_backend(Box::new(backend));
		let client = register(&market, "c@example.com", UserRole::Client).await;
		let freelancer = register(&market, "f@example.com", UserRole::Freelancer).await;
		let project = post_project(&market, &client).await;

		failing.store(true, Ordering::SeqCst);
		let err = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Storage(_)));

		let (orders, _) = market
			.orders()
			.list(&client.actor(), OrderQuery::default())
			.await
			.unwrap();
		assert!(orders.is_empty());
		assert!(!market
			.storage()
			.exists(StorageKey::OrderByProject.as_str(), &project.id)
			.await
			.unwrap());
		assert_eq!(
			market.projects().get(&project.id).await.unwrap().status,
			ProjectStatus::Open
		);

		failing.store(false, Ordering::SeqCst);
		let order = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();
		let project = market.projects().get(&project.id).await.unwrap();
		assert_eq!(project.status, ProjectStatus::InProgress);
		assert_eq!(project.freelancer.as_deref(), Some(order.freelancer.as_str()));
	}

	#[tokio::test]
	async fn test_orders_are_private_to_participants() {
		let market = TestMarket::new();
		let (client, freelancer, project) = accepted_project(&market).await;
		let outsider = register(&market, "x@example.com", UserRole::Freelancer).await;
		let order = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();

		assert!(market.orders().get(&order.id, &freelancer.actor()).await.is_ok());
		assert!(matches!(
			market.orders().get(&order.id, &outsider.actor()).await,
			Err(HandlerError::Lifecycle(LifecycleError::Forbidden(_)))
		));

		let (mine, page) = market
			.orders()
			.list(&client.actor(), OrderQuery::default())
			.await
			.unwrap();
		assert_eq!(mine.len(), 1);
		assert_eq!(page.total, 1);

		let (theirs, _) = market
			.orders()
			.list(&outsider.actor(), OrderQuery::default())
			.await
			.unwrap();
		assert!(theirs.is_empty());
	}

	#[tokio::test]
	async fn test_deliverable_flow() {
		let market = TestMarket::new();
		let (client, freelancer, project) = accepted_project(&market).await;
		let order = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();

		let err = market
			.orders()
			.add_deliverable(
				&order.id,
				&client.actor(),
				DeliverableRequest {
					title: "Designs".into(),
					description: None,
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Forbidden(_))));

		let order = market
			.orders()
			.add_deliverable(
				&order.id,
				&freelancer.actor(),
				DeliverableRequest {
					title: "Designs".into(),
					description: Some("First pass".into()),
				},
			)
			.await
			.unwrap();
		let deliverable_id = order.deliverables[0].id.clone();

		let err = market
			.orders()
			.submit_deliverable(
				&order.id,
				&deliverable_id,
				&freelancer.actor(),
				SubmitDeliverableRequest { files: vec![] },
			)
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Invalid(_))));

		let order = market
			.orders()
			.submit_deliverable(
				&order.id,
				&deliverable_id,
				&freelancer.actor(),
				SubmitDeliverableRequest {
					files: vec![file("mockup.png")],
				},
			)
			.await
			.unwrap();
		let deliverable = &order.deliverables[0];
		assert_eq!(deliverable.status, DeliverableStatus::Completed);
		assert!(deliverable.submitted_at.is_some());
		assert!(deliverable.files[0].uploaded_at.is_some());
	}

	#[tokio::test]
	async fn test_order_messages_and_reviews() {
		let market = TestMarket::new();
		let (client, freelancer, project) = accepted_project(&market).await;
		let order = market
			.orders()
			.create(&client.actor(), order_request(&project.id, &freelancer.id))
			.await
			.unwrap();

		let order = market
			.orders()
			.add_message(
				&order.id,
				&client.actor(),
				OrderMessageRequest {
					message: "Kickoff tomorrow?".into(),
					attachments: vec![],
				},
			)
			.await
			.unwrap();
		assert_eq!(order.messages.len(), 1);
		assert_eq!(order.messages[0].sender, client.id);

		let review = || ReviewRequest {
			rating: 5,
			comment: Some("Great".into()),
		};
		let err = market
			.orders()
			.add_review(&order.id, &client.actor(), review())
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::Conflict(_))));

		market
			.orders()
			.update_status(
				&order.id,
				&freelancer.actor(),
				OrderStatusRequest {
					status: Some(OrderStatus::Completed),
					progress: None,
				},
			)
			.await
			.unwrap();

		let reviewed = market
			.orders()
			.add_review(&order.id, &client.actor(), review())
			.await
			.unwrap();
		assert!(reviewed.reviews.client_review.is_some());
		assert_eq!(
			reviewed.participant(&freelancer.id),
			Some(Participant::Freelancer)
		);
	}

	#[tokio::test]
	async fn test_rejected_proposal_does_not_change_project() {
		let market = TestMarket::new();
		let client = register(&market, "c@example.com", UserRole::Client).await;
		let freelancer = register(&market, "f@example.com", UserRole::Freelancer).await;
		let project = post_project(&market, &client).await;
		let proposal = crate::test_support::propose(&market, &project.id, &freelancer).await;

		let project = market
			.projects()
			.decide_proposal(
				&project.id,
				&proposal.id,
				ProposalDecision::Rejected,
				&client.actor(),
			)
			.await
			.unwrap();
		assert_eq!(project.status, ProjectStatus::Open);
		assert!(project.freelancer.is_none());
	}
}
