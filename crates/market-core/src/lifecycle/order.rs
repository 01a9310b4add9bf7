//! Order lifecycle gate.
//!
//! Validates ownership and status before order creation, progress and status
//! updates, deliverable handling and reviews.

use super::{clamp_progress, validate_request, LifecycleError, StatusChange};
use crate::state::order::is_valid_transition;
use market_types::{
	new_id, Actor, CreateOrderRequest, Deliverable, DeliverableRequest, DeliverableStatus,
	FileRef, Order, OrderMessage, OrderMessageRequest, OrderStatus, Participant, Project,
	ProjectStatus, Review, Reviews,
};
use rust_decimal::Decimal;

/// Checks the fields of an order creation request.
pub fn validate_terms(request: &CreateOrderRequest) -> Result<(), LifecycleError> {
	validate_request(request)
		.map_err(|_| LifecycleError::Invalid("All required fields must be provided".into()))?;
	if request.price <= Decimal::ZERO {
		return Err(LifecycleError::Invalid("Price must be positive".into()));
	}
	if request.deadline == 0 {
		return Err(LifecycleError::Invalid("Deadline is required".into()));
	}
	Ok(())
}

/// Builds the single order for `project` from the client's accepted terms.
///
/// `order_exists` tells whether an order has already been recorded for the
/// project.
pub fn create_from_accepted_proposal(
	project: &Project,
	order_exists: bool,
	request: CreateOrderRequest,
	actor: &Actor,
	now: u64,
) -> Result<Order, LifecycleError> {
	validate_terms(&request)?;
	if !actor.is(&project.client) {
		return Err(LifecycleError::Forbidden(
			"Not authorized to create order for this project".into(),
		));
	}
	if order_exists {
		return Err(LifecycleError::Conflict(
			"Order already exists for this project".into(),
		));
	}
	if matches!(
		project.status,
		ProjectStatus::Completed | ProjectStatus::Cancelled
	) {
		return Err(LifecycleError::Conflict(format!(
			"Project is {}",
			project.status
		)));
	}
	if let Some(assigned) = project.freelancer.as_deref() {
		if assigned != request.freelancer_id {
			return Err(LifecycleError::Conflict(
				"Project is assigned to a different freelancer".into(),
			));
		}
	}

	Ok(Order {
		id: new_id(),
		project: project.id.clone(),
		client: project.client.clone(),
		freelancer: request.freelancer_id,
		status: OrderStatus::Pending,
		price: request.price,
		timeline: request.timeline,
		start_date: now,
		deadline: request.deadline,
		progress: 0,
		deliverables: Vec::new(),
		messages: Vec::new(),
		reviews: Reviews::default(),
		completed_at: None,
		created_at: now,
		updated_at: now,
	})
}

fn participant(order: &Order, actor: &Actor) -> Result<Participant, LifecycleError> {
	order
		.participant(&actor.id)
		.ok_or_else(|| LifecycleError::Forbidden("Not authorized to access this order".into()))
}

fn require_freelancer(order: &Order, actor: &Actor) -> Result<(), LifecycleError> {
	if actor.is(&order.freelancer) {
		Ok(())
	} else {
		Err(LifecycleError::Forbidden(
			"Only the assigned freelancer can manage deliverables".into(),
		))
	}
}

fn require_open(order: &Order) -> Result<(), LifecycleError> {
	match order.status {
		OrderStatus::Completed | OrderStatus::Cancelled => Err(LifecycleError::Conflict(
			format!("Order is {}", order.status),
		)),
		_ => Ok(()),
	}
}

/// Checks that `actor` may read the order.
pub fn check_access(order: &Order, actor: &Actor) -> Result<(), LifecycleError> {
	participant(order, actor).map(|_| ())
}

/// Applies a participant's status and progress update.
///
/// Same rules as for projects: progress is taken only from the freelancer
/// and clamped, and `completed` forces progress 100.
pub fn update_status(
	order: &mut Order,
	new_status: Option<OrderStatus>,
	progress: Option<i64>,
	actor: &Actor,
	now: u64,
) -> Result<StatusChange<OrderStatus>, LifecycleError> {
	let side = participant(order, actor)?;

	let from = order.status;
	let to = new_status.unwrap_or(from);
	if !is_valid_transition(from, to) {
		return Err(LifecycleError::Conflict(format!(
			"Cannot change order status from {} to {}",
			from, to
		)));
	}

	if let (Some(progress), Participant::Freelancer) = (progress, side) {
		order.progress = clamp_progress(progress);
	}

	order.status = to;
	if to == OrderStatus::Completed {
		order.progress = 100;
		if from != OrderStatus::Completed {
			order.completed_at = Some(now);
		}
	}

	Ok(StatusChange { from, to })
}

/// Appends a pending deliverable.
pub fn add_deliverable(
	order: &mut Order,
	request: DeliverableRequest,
	actor: &Actor,
) -> Result<Deliverable, LifecycleError> {
	require_freelancer(order, actor)?;
	validate_request(&request)?;
	require_open(order)?;

	let deliverable = Deliverable {
		id: new_id(),
		title: request.title.trim().to_string(),
		description: request.description,
		status: DeliverableStatus::Pending,
		files: Vec::new(),
		submitted_at: None,
		approved_at: None,
	};
	order.deliverables.push(deliverable.clone());
	Ok(deliverable)
}

/// Attaches files to a deliverable and marks it completed.
pub fn submit_deliverable(
	order: &mut Order,
	deliverable_id: &str,
	files: Vec<FileRef>,
	max_files: usize,
	actor: &Actor,
	now: u64,
) -> Result<(), LifecycleError> {
	require_freelancer(order, actor)?;
	if order.deliverable_mut(deliverable_id).is_none() {
		return Err(LifecycleError::NotFound("Deliverable not found".into()));
	}
	if files.is_empty() {
		return Err(LifecycleError::Invalid("No files uploaded".into()));
	}
	if files.len() > max_files {
		return Err(LifecycleError::Invalid(format!(
			"At most {} files can be submitted at once",
			max_files
		)));
	}
	require_open(order)?;

	if let Some(deliverable) = order.deliverable_mut(deliverable_id) {
		deliverable.files = files;
		deliverable.status = DeliverableStatus::Completed;
		deliverable.submitted_at = Some(now);
	}
	Ok(())
}

/// Appends a message to the order's own thread.
pub fn add_message(
	order: &mut Order,
	request: OrderMessageRequest,
	actor: &Actor,
	now: u64,
) -> Result<OrderMessage, LifecycleError> {
	participant(order, actor)?;
	if request.message.trim().is_empty() {
		return Err(LifecycleError::Invalid("Message is required".into()));
	}

	let message = OrderMessage {
		id: new_id(),
		sender: actor.id.clone(),
		message: request.message,
		attachments: request.attachments,
		timestamp: now,
	};
	order.messages.push(message.clone());
	Ok(message)
}

/// Stores the actor's review of a completed order.
///
/// Each side reviews at most once.
pub fn add_review(
	order: &mut Order,
	rating: i64,
	comment: Option<String>,
	actor: &Actor,
	now: u64,
) -> Result<Participant, LifecycleError> {
	let rating = u8::try_from(rating)
		.ok()
		.filter(|r| (1..=5).contains(r))
		.ok_or_else(|| LifecycleError::Invalid("Rating must be between 1 and 5".into()))?;
	if order.status != OrderStatus::Completed {
		return Err(LifecycleError::Conflict(
			"Can only review completed orders".into(),
		));
	}
	let side = participant(order, actor)?;

	let slot = order.reviews.slot_mut(side);
	if slot.is_some() {
		return Err(LifecycleError::Conflict(match side {
			Participant::Client => "Client review already exists".into(),
			Participant::Freelancer => "Freelancer review already exists".into(),
		}));
	}
	*slot = Some(Review {
		rating,
		comment,
		created_at: now,
	});
	Ok(side)
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::{
		Budget, ProjectCategory, ProjectPriority, ProjectTimeline, ProposalDecision,
		ProposalTerms, UserRole,
	};

	fn client() -> Actor {
		Actor::new("client-1", UserRole::Client)
	}

	fn freelancer() -> Actor {
		Actor::new("free-1", UserRole::Freelancer)
	}

	fn project() -> Project {
		Project {
			id: "project-1".into(),
			title: "App".into(),
			description: "Mobile app".into(),
			client: "client-1".into(),
			freelancer: None,
			category: ProjectCategory::MobileDevelopment,
			skills: vec![],
			budget: Budget {
				min: Decimal::new(100, 0),
				max: Decimal::new(900, 0),
			},
			timeline: ProjectTimeline::TwoWeeks,
			status: ProjectStatus::Open,
			priority: ProjectPriority::High,
			attachments: vec![],
			proposals: vec![],
			progress: 0,
			final_price: None,
			completed_at: None,
			created_at: 1,
			updated_at: 1,
		}
	}

	fn request(freelancer_id: &str) -> CreateOrderRequest {
		CreateOrderRequest {
			project_id: "project-1".into(),
			freelancer_id: freelancer_id.into(),
			price: Decimal::new(500, 0),
			timeline: "2 weeks".into(),
			deadline: 2_000_000_000,
		}
	}

	fn order() -> Order {
		create_from_accepted_proposal(&project(), false, request("free-1"), &client(), 5).unwrap()
	}

	fn file() -> FileRef {
		FileRef {
			filename: "design.fig".into(),
			original_name: Some("Design.fig".into()),
			path: "uploads/design.fig".into(),
			size: 2048,
			uploaded_at: Some(6),
		}
	}

	#[test]
	fn test_create_order() {
		let order = order();
		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.client, "client-1");
		assert_eq!(order.freelancer, "free-1");
		assert_eq!(order.start_date, 5);
	}

	#[test]
	fn test_create_order_checks() {
		let mut missing = request("free-1");
		missing.timeline = String::new();
		assert!(matches!(
			create_from_accepted_proposal(&project(), false, missing, &client(), 5),
			Err(LifecycleError::Invalid(_))
		));

		assert!(matches!(
			create_from_accepted_proposal(&project(), false, request("free-1"), &freelancer(), 5),
			Err(LifecycleError::Forbidden(_))
		));

		assert!(matches!(
			create_from_accepted_proposal(&project(), true, request("free-1"), &client(), 5),
			Err(LifecycleError::Conflict(_))
		));
	}

	#[test]
	fn test_create_order_respects_assignment() {
		let mut assigned = project();
		let proposal = crate::lifecycle::project::submit_proposal(
			&mut assigned,
			&freelancer(),
			ProposalTerms {
				message: None,
				proposed_budget: Decimal::new(500, 0),
				proposed_timeline: "2 weeks".into(),
			},
			2,
		)
		.unwrap();
		crate::lifecycle::project::decide_proposal(
			&mut assigned,
			&proposal.id,
			ProposalDecision::Accepted,
			&client(),
		)
		.unwrap();

		assert!(create_from_accepted_proposal(&assigned, false, request("free-1"), &client(), 5)
			.is_ok());
		assert!(matches!(
			create_from_accepted_proposal(&assigned, false, request("free-2"), &client(), 5),
			Err(LifecycleError::Conflict(_))
		));
	}

	#[test]
	fn test_status_update_clamps_and_completes() {
		let mut order = order();

		update_status(&mut order, Some(OrderStatus::InProgress), Some(-5), &freelancer(), 7)
			.unwrap();
		assert_eq!(order.progress, 0);
		update_status(&mut order, None, Some(150), &freelancer(), 8).unwrap();
		assert_eq!(order.progress, 100);

		update_status(&mut order, None, Some(40), &freelancer(), 8).unwrap();
		let change =
			update_status(&mut order, Some(OrderStatus::Completed), None, &client(), 9).unwrap();
		assert!(change.changed());
		assert_eq!(order.progress, 100);
		assert_eq!(order.completed_at, Some(9));

		assert!(matches!(
			update_status(&mut order, Some(OrderStatus::Disputed), None, &client(), 10),
			Err(LifecycleError::Conflict(_))
		));
	}

	#[test]
	fn test_status_update_requires_participant() {
		let mut order = order();
		let stranger = Actor::new("someone", UserRole::Freelancer);
		assert!(matches!(
			update_status(&mut order, Some(OrderStatus::Active), None, &stranger, 7),
			Err(LifecycleError::Forbidden(_))
		));
		assert_eq!(order.status, OrderStatus::Pending);
	}

	#[test]
	fn test_deliverables() {
		let mut order = order();
		let deliverable_request = DeliverableRequest {
			title: "Wireframes".into(),
			description: None,
		};

		assert!(matches!(
			add_deliverable(&mut order, deliverable_request.clone(), &client()),
			Err(LifecycleError::Forbidden(_))
		));
		let deliverable = add_deliverable(&mut order, deliverable_request, &freelancer()).unwrap();
		assert_eq!(deliverable.status, DeliverableStatus::Pending);

		assert!(matches!(
			submit_deliverable(&mut order, &deliverable.id, vec![], 10, &freelancer(), 7),
			Err(LifecycleError::Invalid(_))
		));
		assert!(matches!(
			submit_deliverable(&mut order, "missing", vec![file()], 10, &freelancer(), 7),
			Err(LifecycleError::NotFound(_))
		));

		submit_deliverable(&mut order, &deliverable.id, vec![file()], 10, &freelancer(), 7)
			.unwrap();
		let stored = &order.deliverables[0];
		assert_eq!(stored.status, DeliverableStatus::Completed);
		assert_eq!(stored.submitted_at, Some(7));
		assert_eq!(stored.files.len(), 1);
	}

	#[test]
	fn test_deliverable_requires_title() {
		let mut order = order();
		let request = DeliverableRequest {
			title: String::new(),
			description: None,
		};
		assert!(matches!(
			add_deliverable(&mut order, request, &freelancer()),
			Err(LifecycleError::Invalid(_))
		));
	}

	#[test]
	fn test_review_before_completion_conflicts() {
		let mut order = order();
		assert!(matches!(
			add_review(&mut order, 5, None, &client(), 7),
			Err(LifecycleError::Conflict(_))
		));
		assert!(order.reviews.client_review.is_none());
	}

	#[test]
	fn test_one_review_per_side() {
		let mut order = order();
		update_status(&mut order, Some(OrderStatus::Completed), None, &freelancer(), 7).unwrap();

		assert_eq!(
			add_review(&mut order, 5, Some("Great".into()), &client(), 8).unwrap(),
			Participant::Client
		);
		assert!(matches!(
			add_review(&mut order, 4, None, &client(), 9),
			Err(LifecycleError::Conflict(_))
		));
		assert_eq!(
			add_review(&mut order, 4, None, &freelancer(), 9).unwrap(),
			Participant::Freelancer
		);

		assert_eq!(order.reviews.client_review.as_ref().map(|r| r.rating), Some(5));
		assert_eq!(
			order.reviews.freelancer_review.as_ref().map(|r| r.created_at),
			Some(9)
		);
	}

	#[test]
	fn test_review_rating_and_participant_checks() {
		let mut order = order();
		update_status(&mut order, Some(OrderStatus::Completed), None, &client(), 7).unwrap();

		assert!(matches!(
			add_review(&mut order, 0, None, &client(), 8),
			Err(LifecycleError::Invalid(_))
		));
		assert!(matches!(
			add_review(&mut order, 6, None, &client(), 8),
			Err(LifecycleError::Invalid(_))
		));
		let stranger = Actor::new("other", UserRole::Client);
		assert!(matches!(
			add_review(&mut order, 3, None, &stranger, 8),
			Err(LifecycleError::Forbidden(_))
		));
	}

	#[test]
	fn test_order_messages() {
		let mut order = order();
		let message = add_message(
			&mut order,
			OrderMessageRequest {
				message: "Started".into(),
				attachments: vec![],
			},
			&freelancer(),
			7,
		)
		.unwrap();
		assert_eq!(message.sender, "free-1");
		assert_eq!(order.messages.len(), 1);

		let stranger = Actor::new("other", UserRole::Client);
		assert!(matches!(
			add_message(
				&mut order,
				OrderMessageRequest {
					message: "hi".into(),
					attachments: vec![],
				},
				&stranger,
				8
			),
			Err(LifecycleError::Forbidden(_))
		));
	}
}
