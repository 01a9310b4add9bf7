//! Project handler for posting projects and managing proposals.
//!
//! Browsing and single-project reads are public. Every mutation goes through
//! the project lifecycle gate inside [`ProjectStateMachine::update_with`], so
//! a refused operation never reaches storage.

use super::{matches_any_skill, skill_filter, HandlerError};
use crate::engine::event_bus::EventBus;
use crate::lifecycle::{self, validate_request};
use crate::state::ProjectStateMachine;
use market_config::MarketplaceConfig;
use market_types::{
	current_timestamp, paginate, truncate_id, Actor, AttachmentsRequest, CreateProjectRequest,
	FileRef, MarketEvent, MyProjectsQuery, Pagination, Project, ProjectEvent, ProjectQuery,
	ProjectStatus, ProjectStatusRequest, Proposal, ProposalDecision, ProposalRequest,
	ProposalStatus, ProposalTerms, UserRole,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;

/// Handler for projects and their proposals.
pub struct ProjectHandler {
	projects: Arc<ProjectStateMachine>,
	event_bus: EventBus,
	limits: MarketplaceConfig,
}

impl ProjectHandler {
	pub fn new(
		projects: Arc<ProjectStateMachine>,
		event_bus: EventBus,
		limits: MarketplaceConfig,
	) -> Self {
		Self {
			projects,
			event_bus,
			limits,
		}
	}

	/// Posts a new open project on behalf of a client.
	#[instrument(skip_all, fields(client = %truncate_id(&actor.id)))]
	pub async fn create(
		&self,
		actor: &Actor,
		request: CreateProjectRequest,
	) -> Result<Project, HandlerError> {
		let project = lifecycle::project::create_project(actor, request, current_timestamp())?;
		self.projects.store(&project).await?;

		tracing::info!(project_id = %truncate_id(&project.id), "Project created");
		self.event_bus
			.publish(MarketEvent::Project(ProjectEvent::Created {
				project_id: project.id.clone(),
				client: project.client.clone(),
			}))
			.ok();

		Ok(project)
	}

	pub async fn get(&self, project_id: &str) -> Result<Project, HandlerError> {
		Ok(self.projects.get(project_id).await?)
	}

	async fn newest_first(&self) -> Result<Vec<Project>, HandlerError> {
		let mut projects = self.projects.all().await?;
		projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
		Ok(projects)
	}

	/// Public project listing. Shows open projects unless a status is given.
	pub async fn browse(
		&self,
		query: ProjectQuery,
	) -> Result<(Vec<Project>, Pagination), HandlerError> {
		let status = query.status.unwrap_or(ProjectStatus::Open);
		let skills = skill_filter(query.skills.as_deref());

		let projects: Vec<Project> = self
			.newest_first()
			.await?
			.into_iter()
			.filter(|p| p.status == status)
			.filter(|p| query.category.map_or(true, |c| p.category == c))
			.filter(|p| query.timeline.map_or(true, |t| p.timeline == t))
			.filter(|p| query.budget_min.map_or(true, |min| p.budget.min >= min))
			.filter(|p| query.budget_max.map_or(true, |max| p.budget.max <= max))
			.filter(|p| matches_any_skill(&p.skills, &skills))
			.collect();

		Ok(paginate(
			projects,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		))
	}

	/// Projects the actor owns (clients) or is assigned to (freelancers).
	pub async fn my_projects(
		&self,
		actor: &Actor,
		query: MyProjectsQuery,
	) -> Result<(Vec<Project>, Pagination), HandlerError> {
		let projects: Vec<Project> = self
			.newest_first()
			.await?
			.into_iter()
			.filter(|p| match actor.role {
				UserRole::Client => p.client == actor.id,
				UserRole::Freelancer => p.freelancer.as_deref() == Some(actor.id.as_str()),
			})
			.filter(|p| query.status.map_or(true, |s| p.status == s))
			.collect();

		Ok(paginate(
			projects,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		))
	}

	/// Records uploaded file metadata on the project and returns the full
	/// attachment list.
	#[instrument(skip_all, fields(project_id = %truncate_id(project_id)))]
	pub async fn add_attachments(
		&self,
		project_id: &str,
		actor: &Actor,
		request: AttachmentsRequest,
	) -> Result<Vec<FileRef>, HandlerError> {
		validate_request(&request)?;
		let now = current_timestamp();
		let files: Vec<FileRef> = request
			.attachments
			.into_iter()
			.map(|file| FileRef {
				uploaded_at: Some(now),
				..file
			})
			.collect();
		let count = files.len();

		let max = self.limits.max_attachments;
		let (project, ()) = self
			.projects
			.update_with(project_id, |project| {
				lifecycle::project::add_attachments(project, files, max, actor)
			})
			.await?;

		tracing::info!(count, "Attachments added");
		Ok(project.attachments)
	}

	/// Submits a freelancer's proposal.
	#[instrument(skip_all, fields(
		project_id = %truncate_id(project_id),
		freelancer = %truncate_id(&actor.id),
	))]
	pub async fn submit_proposal(
		&self,
		project_id: &str,
		actor: &Actor,
		request: ProposalRequest,
	) -> Result<Project, HandlerError> {
		let terms = ProposalTerms {
			message: request.message,
			proposed_budget: request.proposed_budget,
			proposed_timeline: request.proposed_timeline,
		};

		let (project, proposal): (Project, Proposal) = self
			.projects
			.update_with(project_id, |project| {
				lifecycle::project::submit_proposal(project, actor, terms, current_timestamp())
			})
			.await?;

		tracing::info!(proposal_id = %truncate_id(&proposal.id), "Proposal submitted");
		self.event_bus
			.publish(MarketEvent::Project(ProjectEvent::ProposalSubmitted {
				project_id: project.id.clone(),
				proposal_id: proposal.id,
				freelancer: proposal.freelancer,
			}))
			.ok();

		Ok(project)
	}

	/// Accepts or rejects a proposal on the actor's project.
	#[instrument(skip_all, fields(
		project_id = %truncate_id(project_id),
		proposal_id = %truncate_id(proposal_id),
	))]
	pub async fn decide_proposal(
		&self,
		project_id: &str,
		proposal_id: &str,
		decision: ProposalDecision,
		actor: &Actor,
	) -> Result<Project, HandlerError> {
		let (project, previous) = self
			.projects
			.update_with(project_id, |project| {
				let previous = project.status;
				lifecycle::project::decide_proposal(project, proposal_id, decision, actor)?;
				Ok(previous)
			})
			.await?;

		let status = ProposalStatus::from(decision);
		tracing::info!(%status, "Proposal decided");
		self.event_bus
			.publish(MarketEvent::Project(ProjectEvent::ProposalDecided {
				project_id: project.id.clone(),
				proposal_id: proposal_id.to_string(),
				status,
			}))
			.ok();
		if project.status != previous {
			self.publish_status_change(&project.id, previous, project.status);
		}

		Ok(project)
	}

	/// Updates status and progress on behalf of a project participant.
	#[instrument(skip_all, fields(project_id = %truncate_id(project_id)))]
	pub async fn update_status(
		&self,
		project_id: &str,
		actor: &Actor,
		request: ProjectStatusRequest,
	) -> Result<Project, HandlerError> {
		let (project, change) = self
			.projects
			.update_with(project_id, |project| {
				lifecycle::project::update_status(
					project,
					request.status,
					request.progress,
					actor,
					current_timestamp(),
				)
			})
			.await?;

		tracing::info!(status = %project.status, progress = project.progress, "Project updated");
		if change.changed() {
			self.publish_status_change(&project.id, change.from, change.to);
		}

		Ok(project)
	}

	/// Deletes an open project owned by the actor.
	#[instrument(skip_all, fields(project_id = %truncate_id(project_id)))]
	pub async fn delete(&self, project_id: &str, actor: &Actor) -> Result<(), HandlerError> {
		self.projects
			.remove_with(project_id, |project| {
				lifecycle::project::check_delete(project, actor)
			})
			.await?;

		tracing::info!("Project deleted");
		self.event_bus
			.publish(MarketEvent::Project(ProjectEvent::Deleted {
				project_id: project_id.to_string(),
			}))
			.ok();

		Ok(())
	}

	/// Assigns `freelancer` to the project when an order is created for it.
	pub(crate) async fn assign_for_order(
		&self,
		project_id: &str,
		freelancer: &str,
		price: Decimal,
	) -> Result<Project, HandlerError> {
		let (project, previous) = self
			.projects
			.update_with(project_id, |project| {
				let previous = project.status;
				lifecycle::project::assign_freelancer(project, freelancer, price)?;
				Ok(previous)
			})
			.await?;
		if project.status != previous {
			self.publish_status_change(&project.id, previous, project.status);
		}
		Ok(project)
	}

	fn publish_status_change(&self, project_id: &str, from: ProjectStatus, to: ProjectStatus) {
		self.event_bus
			.publish(MarketEvent::Project(ProjectEvent::StatusChanged {
				project_id: project_id.to_string(),
				from,
				to,
			}))
			.ok();
	}
}
