//! Request extractors shared by the API handlers.
//!
//! Rejections from these extractors render through [`APIError`], so clients
//! always get the JSON error envelope, including for malformed bodies and
//! query strings.

use crate::server::AppState;
use axum::{
	extract::{FromRequest, FromRequestParts, Query, Request},
	http::{header::AUTHORIZATION, request::Parts},
	Json,
};
use market_types::{APIError, Actor, User};
use serde::de::DeserializeOwned;

/// The user behind the request's `Authorization: Bearer <token>` header.
pub struct Authenticated(pub User);

impl Authenticated {
	pub fn actor(&self) -> Actor {
		self.0.actor()
	}
}

impl FromRequestParts<AppState> for Authenticated {
	type Rejection = APIError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let token = parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.ok_or_else(|| APIError::Unauthorized {
				message: "No token provided".into(),
			})?;

		let user = state.engine.users().authenticate(token).await?;
		Ok(Self(user))
	}
}

/// JSON body extractor reporting parse failures as `INVALID`.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		match Json::<T>::from_request(req, state).await {
			Ok(Json(value)) => Ok(Self(value)),
			Err(rejection) => Err(APIError::bad_request(rejection.body_text())),
		}
	}
}

/// Query string extractor reporting parse failures as `INVALID`.
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		match Query::<T>::from_request_parts(parts, state).await {
			Ok(Query(value)) => Ok(Self(value)),
			Err(rejection) => Err(APIError::bad_request(rejection.body_text())),
		}
	}
}
