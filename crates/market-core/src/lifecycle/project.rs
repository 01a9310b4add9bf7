//! Project lifecycle gate.
//!
//! Validates ownership and status before proposal submission, proposal
//! decisions and status updates. Every function either applies the whole
//! change to the project or returns an error with the project untouched.

use super::{clamp_progress, validate_request, LifecycleError, StatusChange};
use crate::state::project::is_valid_transition;
use market_types::{
	new_id, Actor, CreateProjectRequest, FileRef, Participant, Project, ProjectStatus,
	Proposal, ProposalDecision, ProposalStatus, ProposalTerms, UserRole,
};
use rust_decimal::Decimal;

/// Builds a new open project owned by `actor`.
pub fn create_project(
	actor: &Actor,
	request: CreateProjectRequest,
	now: u64,
) -> Result<Project, LifecycleError> {
	if actor.role != UserRole::Client {
		return Err(LifecycleError::Forbidden(
			"Only clients can post projects".into(),
		));
	}
	validate_request(&request)?;
	if request.budget.min < Decimal::ZERO || request.budget.max < request.budget.min {
		return Err(LifecycleError::Invalid(
			"Budget must satisfy 0 <= min <= max".into(),
		));
	}

	Ok(Project {
		id: new_id(),
		title: request.title.trim().to_string(),
		description: request.description,
		client: actor.id.clone(),
		freelancer: None,
		category: request.category,
		skills: request.skills,
		budget: request.budget,
		timeline: request.timeline,
		status: ProjectStatus::Open,
		priority: request.priority,
		attachments: Vec::new(),
		proposals: Vec::new(),
		progress: 0,
		final_price: None,
		completed_at: None,
		created_at: now,
		updated_at: now,
	})
}

/// Appends a pending proposal from `actor`.
///
/// Only pending or accepted proposals block a new one; a freelancer whose
/// proposal was rejected may propose again.
pub fn submit_proposal(
	project: &mut Project,
	actor: &Actor,
	terms: ProposalTerms,
	now: u64,
) -> Result<Proposal, LifecycleError> {
	if actor.role != UserRole::Freelancer {
		return Err(LifecycleError::Forbidden(
			"Only freelancers can submit proposals".into(),
		));
	}
	if terms.proposed_budget <= Decimal::ZERO {
		return Err(LifecycleError::Invalid(
			"Proposed budget must be positive".into(),
		));
	}
	if terms.proposed_timeline.trim().is_empty() {
		return Err(LifecycleError::Invalid(
			"Proposed timeline is required".into(),
		));
	}
	if project.status != ProjectStatus::Open {
		return Err(LifecycleError::Conflict(
			"Project is not open for proposals".into(),
		));
	}
	if project.has_active_proposal_from(&actor.id) {
		return Err(LifecycleError::Conflict(
			"You have already submitted a proposal for this project".into(),
		));
	}

	let proposal = Proposal {
		id: new_id(),
		freelancer: actor.id.clone(),
		message: terms.message,
		proposed_budget: terms.proposed_budget,
		proposed_timeline: terms.proposed_timeline,
		status: ProposalStatus::Pending,
		submitted_at: now,
	};
	project.proposals.push(proposal.clone());
	Ok(proposal)
}

/// Applies the client's decision to one proposal.
///
/// Accepting assigns the proposal's freelancer, moves the project to
/// `in-progress` and fixes the final price. Rejecting changes only the
/// proposal. At most one proposal per project is ever accepted.
pub fn decide_proposal(
	project: &mut Project,
	proposal_id: &str,
	decision: ProposalDecision,
	actor: &Actor,
) -> Result<(), LifecycleError> {
	if !actor.is(&project.client) {
		return Err(LifecycleError::Forbidden(
			"Not authorized to modify this project".into(),
		));
	}
	let current = project
		.proposal(proposal_id)
		.map(|p| p.status)
		.ok_or_else(|| LifecycleError::NotFound("Proposal not found".into()))?;

	match decision {
		ProposalDecision::Accepted => {
			if project.accepted_proposal().is_some() || project.status != ProjectStatus::Open {
				return Err(LifecycleError::Conflict(
					"Project already has an accepted proposal".into(),
				));
			}
			let (freelancer, budget) = {
				let proposal = project
					.proposal_mut(proposal_id)
					.ok_or_else(|| LifecycleError::NotFound("Proposal not found".into()))?;
				proposal.status = ProposalStatus::Accepted;
				(proposal.freelancer.clone(), proposal.proposed_budget)
			};
			project.freelancer = Some(freelancer);
			project.status = ProjectStatus::InProgress;
			project.final_price = Some(budget);
		},
		ProposalDecision::Rejected => {
			if current == ProposalStatus::Accepted {
				return Err(LifecycleError::Conflict(
					"An accepted proposal cannot be rejected".into(),
				));
			}
			if let Some(proposal) = project.proposal_mut(proposal_id) {
				proposal.status = ProposalStatus::Rejected;
			}
		},
	}
	Ok(())
}

/// Assigns `freelancer` to a still-open project when an order is created
/// for it directly.
pub fn assign_freelancer(
	project: &mut Project,
	freelancer: &str,
	price: Decimal,
) -> Result<(), LifecycleError> {
	if project.status == ProjectStatus::Open {
		project.freelancer = Some(freelancer.to_string());
		project.status = ProjectStatus::InProgress;
		if project.final_price.is_none() {
			project.final_price = Some(price);
		}
		return Ok(());
	}
	if project.freelancer.as_deref() != Some(freelancer) {
		return Err(LifecycleError::Conflict(
			"Project is assigned to a different freelancer".into(),
		));
	}
	Ok(())
}

/// Applies a participant's status and progress update.
///
/// Progress is only taken from the assigned freelancer and is clamped into
/// `0..=100`. A project that ends up `completed` always has progress 100.
pub fn update_status(
	project: &mut Project,
	new_status: Option<ProjectStatus>,
	progress: Option<i64>,
	actor: &Actor,
	now: u64,
) -> Result<StatusChange<ProjectStatus>, LifecycleError> {
	let participant = project.participant(&actor.id).ok_or_else(|| {
		LifecycleError::Forbidden("Not authorized to modify this project".into())
	})?;

	let from = project.status;
	let to = new_status.unwrap_or(from);
	if !is_valid_transition(from, to) {
		return Err(LifecycleError::Conflict(format!(
			"Cannot change project status from {} to {}",
			from, to
		)));
	}

	if let (Some(progress), Participant::Freelancer) = (progress, participant) {
		project.progress = clamp_progress(progress);
	}

	project.status = to;
	if to == ProjectStatus::Completed {
		project.progress = 100;
		if from != ProjectStatus::Completed {
			project.completed_at = Some(now);
		}
	}

	Ok(StatusChange { from, to })
}

/// Appends file records to a project's attachments.
pub fn add_attachments(
	project: &mut Project,
	files: Vec<FileRef>,
	max_attachments: usize,
	actor: &Actor,
) -> Result<(), LifecycleError> {
	if !actor.is(&project.client) {
		return Err(LifecycleError::Forbidden(
			"Not authorized to upload files for this project".into(),
		));
	}
	if files.is_empty() {
		return Err(LifecycleError::Invalid("No files uploaded".into()));
	}
	if project.attachments.len() + files.len() > max_attachments {
		return Err(LifecycleError::Invalid(format!(
			"A project can have at most {} attachments",
			max_attachments
		)));
	}
	project.attachments.extend(files);
	Ok(())
}

/// Checks that `actor` may delete the project.
pub fn check_delete(project: &Project, actor: &Actor) -> Result<(), LifecycleError> {
	if !actor.is(&project.client) {
		return Err(LifecycleError::Forbidden(
			"Not authorized to delete this project".into(),
		));
	}
	if project.status != ProjectStatus::Open {
		return Err(LifecycleError::Conflict(
			"Only open projects can be deleted".into(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use market_types::{Budget, ProjectCategory, ProjectPriority, ProjectTimeline};

	fn client() -> Actor {
		Actor::new("client-1", UserRole::Client)
	}

	fn freelancer(id: &str) -> Actor {
		Actor::new(id, UserRole::Freelancer)
	}

	fn terms(budget: i64) -> ProposalTerms {
		ProposalTerms {
			message: Some("I can do this".into()),
			proposed_budget: Decimal::new(budget, 0),
			proposed_timeline: "2 weeks".into(),
		}
	}

	fn open_project() -> Project {
		let request = CreateProjectRequest {
			title: "Landing page".into(),
			description: "Marketing site".into(),
			category: ProjectCategory::WebDevelopment,
			skills: vec!["rust".into()],
			budget: Budget {
				min: Decimal::new(100, 0),
				max: Decimal::new(1000, 0),
			},
			timeline: ProjectTimeline::OneMonth,
			priority: ProjectPriority::Normal,
		};
		create_project(&client(), request, 10).unwrap()
	}

	fn assert_freelancer_invariant(project: &Project) {
		assert_eq!(
			project.freelancer.is_some(),
			project.status != ProjectStatus::Open
		);
	}

	#[test]
	fn test_create_requires_client_role() {
		let project = open_project();
		assert_eq!(project.status, ProjectStatus::Open);
		assert_freelancer_invariant(&project);

		let request = CreateProjectRequest {
			title: "x".into(),
			description: "y".into(),
			category: ProjectCategory::Other,
			skills: vec![],
			budget: Budget {
				min: Decimal::ONE,
				max: Decimal::ONE,
			},
			timeline: ProjectTimeline::Flexible,
			priority: ProjectPriority::Low,
		};
		let err = create_project(&freelancer("f1"), request, 10).unwrap_err();
		assert!(matches!(err, LifecycleError::Forbidden(_)));
	}

	#[test]
	fn test_create_rejects_inverted_budget() {
		let request = CreateProjectRequest {
			title: "x".into(),
			description: "y".into(),
			category: ProjectCategory::Other,
			skills: vec![],
			budget: Budget {
				min: Decimal::new(500, 0),
				max: Decimal::new(100, 0),
			},
			timeline: ProjectTimeline::Flexible,
			priority: ProjectPriority::Low,
		};
		assert!(matches!(
			create_project(&client(), request, 10),
			Err(LifecycleError::Invalid(_))
		));
	}

	#[test]
	fn test_second_proposal_from_same_freelancer_conflicts() {
		let mut project = open_project();
		submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();

		let err = submit_proposal(&mut project, &freelancer("f1"), terms(400), 12).unwrap_err();
		assert!(matches!(err, LifecycleError::Conflict(_)));
		assert_eq!(project.proposals.len(), 1);
	}

	#[test]
	fn test_rejected_freelancer_may_propose_again() {
		let mut project = open_project();
		let first = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();
		decide_proposal(&mut project, &first.id, ProposalDecision::Rejected, &client()).unwrap();

		submit_proposal(&mut project, &freelancer("f1"), terms(450), 12).unwrap();
		assert_eq!(project.proposals.len(), 2);
		assert_eq!(project.status, ProjectStatus::Open);
	}

	#[test]
	fn test_proposal_checks() {
		let mut project = open_project();
		assert!(matches!(
			submit_proposal(&mut project, &client(), terms(500), 11),
			Err(LifecycleError::Forbidden(_))
		));
		assert!(matches!(
			submit_proposal(&mut project, &freelancer("f1"), terms(0), 11),
			Err(LifecycleError::Invalid(_))
		));

		project.status = ProjectStatus::Cancelled;
		assert!(matches!(
			submit_proposal(&mut project, &freelancer("f1"), terms(500), 11),
			Err(LifecycleError::Conflict(_))
		));
		assert!(project.proposals.is_empty());
	}

	#[test]
	fn test_accept_assigns_freelancer() {
		let mut project = open_project();
		let proposal = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();

		decide_proposal(&mut project, &proposal.id, ProposalDecision::Accepted, &client())
			.unwrap();

		assert_eq!(project.status, ProjectStatus::InProgress);
		assert_eq!(project.freelancer.as_deref(), Some("f1"));
		assert_eq!(project.final_price, Some(Decimal::new(500, 0)));
		assert_eq!(project.proposals[0].status, ProposalStatus::Accepted);
		assert_freelancer_invariant(&project);
	}

	#[test]
	fn test_second_acceptance_conflicts() {
		let mut project = open_project();
		let first = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();
		let second = submit_proposal(&mut project, &freelancer("f2"), terms(450), 12).unwrap();

		decide_proposal(&mut project, &first.id, ProposalDecision::Accepted, &client()).unwrap();
		let err = decide_proposal(&mut project, &second.id, ProposalDecision::Accepted, &client())
			.unwrap_err();

		assert!(matches!(err, LifecycleError::Conflict(_)));
		assert_eq!(project.freelancer.as_deref(), Some("f1"));
		assert_eq!(project.proposals[1].status, ProposalStatus::Pending);
	}

	#[test]
	fn test_reject_changes_only_the_proposal() {
		let mut project = open_project();
		let proposal = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();
		let before = project.clone();

		decide_proposal(&mut project, &proposal.id, ProposalDecision::Rejected, &client())
			.unwrap();

		assert_eq!(project.proposals[0].status, ProposalStatus::Rejected);
		let mut expected = before;
		expected.proposals[0].status = ProposalStatus::Rejected;
		assert_eq!(project, expected);
	}

	#[test]
	fn test_accepted_proposal_cannot_be_rejected() {
		let mut project = open_project();
		let proposal = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();
		decide_proposal(&mut project, &proposal.id, ProposalDecision::Accepted, &client())
			.unwrap();

		let err = decide_proposal(&mut project, &proposal.id, ProposalDecision::Rejected, &client())
			.unwrap_err();
		assert!(matches!(err, LifecycleError::Conflict(_)));
	}

	#[test]
	fn test_decision_checks_owner_then_proposal() {
		let mut project = open_project();
		let proposal = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();

		let stranger = Actor::new("client-2", UserRole::Client);
		assert!(matches!(
			decide_proposal(&mut project, &proposal.id, ProposalDecision::Accepted, &stranger),
			Err(LifecycleError::Forbidden(_))
		));
		assert!(matches!(
			decide_proposal(&mut project, "missing", ProposalDecision::Accepted, &client()),
			Err(LifecycleError::NotFound(_))
		));
	}

	fn in_progress_project() -> Project {
		let mut project = open_project();
		let proposal = submit_proposal(&mut project, &freelancer("f1"), terms(500), 11).unwrap();
		decide_proposal(&mut project, &proposal.id, ProposalDecision::Accepted, &client())
			.unwrap();
		project
	}

	#[test]
	fn test_progress_clamped_and_freelancer_only() {
		let mut project = in_progress_project();

		update_status(&mut project, None, Some(150), &freelancer("f1"), 20).unwrap();
		assert_eq!(project.progress, 100);
		update_status(&mut project, None, Some(-5), &freelancer("f1"), 20).unwrap();
		assert_eq!(project.progress, 0);

		// The client's progress value is ignored.
		update_status(&mut project, None, Some(70), &client(), 20).unwrap();
		assert_eq!(project.progress, 0);
	}

	#[test]
	fn test_completion_forces_full_progress() {
		let mut project = in_progress_project();
		let change = update_status(
			&mut project,
			Some(ProjectStatus::Completed),
			Some(30),
			&freelancer("f1"),
			25,
		)
		.unwrap();

		assert_eq!(
			change,
			StatusChange {
				from: ProjectStatus::InProgress,
				to: ProjectStatus::Completed
			}
		);
		assert_eq!(project.progress, 100);
		assert_eq!(project.completed_at, Some(25));
	}

	#[test]
	fn test_status_update_rules() {
		let mut project = in_progress_project();
		assert!(matches!(
			update_status(&mut project, Some(ProjectStatus::Open), None, &client(), 20),
			Err(LifecycleError::Conflict(_))
		));
		assert!(matches!(
			update_status(
				&mut project,
				Some(ProjectStatus::Cancelled),
				None,
				&freelancer("f2"),
				20
			),
			Err(LifecycleError::Forbidden(_))
		));

		update_status(&mut project, Some(ProjectStatus::Cancelled), None, &client(), 20).unwrap();
		assert!(matches!(
			update_status(&mut project, Some(ProjectStatus::InProgress), None, &client(), 21),
			Err(LifecycleError::Conflict(_))
		));
		assert_freelancer_invariant(&project);
	}

	#[test]
	fn test_assign_freelancer() {
		let mut project = open_project();
		assign_freelancer(&mut project, "f1", Decimal::new(300, 0)).unwrap();
		assert_eq!(project.status, ProjectStatus::InProgress);
		assert_eq!(project.final_price, Some(Decimal::new(300, 0)));

		assign_freelancer(&mut project, "f1", Decimal::new(300, 0)).unwrap();
		assert!(matches!(
			assign_freelancer(&mut project, "f2", Decimal::new(300, 0)),
			Err(LifecycleError::Conflict(_))
		));
	}

	#[test]
	fn test_attachments_and_delete() {
		let mut project = open_project();
		let file = FileRef {
			filename: "brief.pdf".into(),
			original_name: None,
			path: "uploads/brief.pdf".into(),
			size: 1024,
			uploaded_at: None,
		};

		assert!(matches!(
			add_attachments(&mut project, vec![], 5, &client()),
			Err(LifecycleError::Invalid(_))
		));
		assert!(matches!(
			add_attachments(&mut project, vec![file.clone()], 5, &freelancer("f1")),
			Err(LifecycleError::Forbidden(_))
		));
		add_attachments(&mut project, vec![file.clone()], 1, &client()).unwrap();
		assert!(matches!(
			add_attachments(&mut project, vec![file], 1, &client()),
			Err(LifecycleError::Invalid(_))
		));

		check_delete(&project, &client()).unwrap();
		let assigned = in_progress_project();
		assert!(matches!(
			check_delete(&assigned, &client()),
			Err(LifecycleError::Conflict(_))
		));
	}
}
