//! Project endpoints: posting, browsing, proposals and status.

use super::extract::{Authenticated, Params, Payload};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use market_types::{
	APIError, AttachmentsBody, AttachmentsRequest, CreateProjectRequest, Empty, Envelope,
	MyProjectsQuery, ProjectBody, ProjectPage, ProjectQuery, ProjectStatusRequest,
	ProposalDecisionRequest, ProposalRequest,
};

type ProjectResponse = Result<Json<Envelope<ProjectBody>>, APIError>;

/// Handles GET /api/projects. Public.
pub async fn browse(
	State(state): State<AppState>,
	Params(query): Params<ProjectQuery>,
) -> Result<Json<Envelope<ProjectPage>>, APIError> {
	let (projects, pagination) = state.engine.projects().browse(query).await?;
	Ok(Json(Envelope::ok(ProjectPage {
		projects,
		pagination,
	})))
}

/// Handles POST /api/projects.
pub async fn create(
	State(state): State<AppState>,
	auth: Authenticated,
	Payload(request): Payload<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Envelope<ProjectBody>>), APIError> {
	let project = state
		.engine
		.projects()
		.create(&auth.actor(), request)
		.await?;
	Ok((
		StatusCode::CREATED,
		Json(Envelope::with_message(
			"Project created successfully",
			ProjectBody { project },
		)),
	))
}

/// Handles GET /api/projects/my-projects.
pub async fn my_projects(
	State(state): State<AppState>,
	auth: Authenticated,
	Params(query): Params<MyProjectsQuery>,
) -> Result<Json<Envelope<ProjectPage>>, APIError> {
	let (projects, pagination) = state
		.engine
		.projects()
		.my_projects(&auth.actor(), query)
		.await?;
	Ok(Json(Envelope::ok(ProjectPage {
		projects,
		pagination,
	})))
}

/// Handles GET /api/projects/{id}. Public.
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ProjectResponse {
	let project = state.engine.projects().get(&id).await?;
	Ok(Json(Envelope::ok(ProjectBody { project })))
}

/// Handles DELETE /api/projects/{id}.
pub async fn delete(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
) -> Result<Json<Envelope<Empty>>, APIError> {
	state.engine.projects().delete(&id, &auth.actor()).await?;
	Ok(Json(Envelope::with_message(
		"Project deleted successfully",
		Empty {},
	)))
}

/// Handles POST /api/projects/{id}/attachments.
pub async fn add_attachments(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<AttachmentsRequest>,
) -> Result<Json<Envelope<AttachmentsBody>>, APIError> {
	let attachments = state
		.engine
		.projects()
		.add_attachments(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Files uploaded successfully",
		AttachmentsBody { attachments },
	)))
}

/// Handles POST /api/projects/{id}/propose.
pub async fn propose(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<ProposalRequest>,
) -> ProjectResponse {
	let project = state
		.engine
		.projects()
		.submit_proposal(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Proposal submitted successfully",
		ProjectBody { project },
	)))
}

/// Handles PUT /api/projects/{id}/proposals/{proposal_id}.
pub async fn decide_proposal(
	State(state): State<AppState>,
	auth: Authenticated,
	Path((id, proposal_id)): Path<(String, String)>,
	Payload(request): Payload<ProposalDecisionRequest>,
) -> ProjectResponse {
	let project = state
		.engine
		.projects()
		.decide_proposal(&id, &proposal_id, request.status, &auth.actor())
		.await?;
	Ok(Json(Envelope::with_message(
		"Proposal updated successfully",
		ProjectBody { project },
	)))
}

/// Handles PUT /api/projects/{id}/status.
pub async fn update_status(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<ProjectStatusRequest>,
) -> ProjectResponse {
	let project = state
		.engine
		.projects()
		.update_status(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Project status updated successfully",
		ProjectBody { project },
	)))
}
