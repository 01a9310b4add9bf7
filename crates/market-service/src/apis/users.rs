//! User endpoints: registration, profiles and directory listings.

use super::extract::{Authenticated, Params, Payload};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use market_types::{
	APIError, ClientPage, Envelope, FreelancerBody, FreelancerPage, FreelancerQuery, PageQuery,
	PublicUser, RegisterRequest, RegisteredBody, UpdateProfileRequest, UserBody,
};

/// Handles POST /api/users/register.
///
/// The returned token is the caller's bearer credential from then on.
pub async fn register(
	State(state): State<AppState>,
	Payload(request): Payload<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<RegisteredBody>>), APIError> {
	let user = state.engine.users().register(request).await?;
	Ok((
		StatusCode::CREATED,
		Json(Envelope::with_message(
			"User registered successfully",
			RegisteredBody {
				user: PublicUser::from(&user),
				token: user.api_key,
			},
		)),
	))
}

/// Handles GET /api/users/profile.
pub async fn profile(
	State(state): State<AppState>,
	auth: Authenticated,
) -> Result<Json<Envelope<UserBody>>, APIError> {
	let user = state.engine.users().profile(&auth.actor()).await?;
	Ok(Json(Envelope::ok(UserBody {
		user: PublicUser::from(&user),
	})))
}

/// Handles PUT /api/users/profile.
pub async fn update_profile(
	State(state): State<AppState>,
	auth: Authenticated,
	Payload(request): Payload<UpdateProfileRequest>,
) -> Result<Json<Envelope<UserBody>>, APIError> {
	let user = state
		.engine
		.users()
		.update_profile(&auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Profile updated successfully",
		UserBody {
			user: PublicUser::from(&user),
		},
	)))
}

/// Handles GET /api/users/freelancers.
pub async fn list_freelancers(
	State(state): State<AppState>,
	Params(query): Params<FreelancerQuery>,
) -> Result<Json<Envelope<FreelancerPage>>, APIError> {
	let (freelancers, pagination) = state.engine.users().list_freelancers(query).await?;
	Ok(Json(Envelope::ok(FreelancerPage {
		freelancers,
		pagination,
	})))
}

/// Handles GET /api/users/freelancers/{id}.
pub async fn get_freelancer(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Envelope<FreelancerBody>>, APIError> {
	let freelancer = state.engine.users().get_freelancer(&id).await?;
	Ok(Json(Envelope::ok(FreelancerBody { freelancer })))
}

/// Handles GET /api/users/clients.
pub async fn list_clients(
	State(state): State<AppState>,
	auth: Authenticated,
	Params(query): Params<PageQuery>,
) -> Result<Json<Envelope<ClientPage>>, APIError> {
	let (clients, pagination) = state
		.engine
		.users()
		.list_clients(&auth.actor(), query)
		.await?;
	Ok(Json(Envelope::ok(ClientPage {
		clients,
		pagination,
	})))
}
