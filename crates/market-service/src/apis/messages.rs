//! Direct message endpoints.

use super::extract::{Authenticated, Params, Payload};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use market_types::{
	APIError, ConversationList, Empty, Envelope, MarkedRead, MessageBody, MessagePage,
	MessageQuery, PageQuery, SendMessageRequest,
};

/// Handles GET /api/messages.
pub async fn list(
	State(state): State<AppState>,
	auth: Authenticated,
	Params(query): Params<MessageQuery>,
) -> Result<Json<Envelope<MessagePage>>, APIError> {
	let (messages, pagination) = state.engine.messages().list(&auth.actor(), query).await?;
	Ok(Json(Envelope::ok(MessagePage {
		messages,
		pagination,
	})))
}

/// Handles POST /api/messages.
pub async fn send(
	State(state): State<AppState>,
	auth: Authenticated,
	Payload(request): Payload<SendMessageRequest>,
) -> Result<(StatusCode, Json<Envelope<MessageBody>>), APIError> {
	let message = state.engine.messages().send(&auth.actor(), request).await?;
	Ok((
		StatusCode::CREATED,
		Json(Envelope::with_message(
			"Message sent successfully",
			MessageBody { data: message },
		)),
	))
}

/// Handles GET /api/messages/conversations.
pub async fn conversations(
	State(state): State<AppState>,
	auth: Authenticated,
) -> Result<Json<Envelope<ConversationList>>, APIError> {
	let conversations = state.engine.messages().conversations(&auth.actor()).await?;
	Ok(Json(Envelope::ok(ConversationList { conversations })))
}

/// Handles GET /api/messages/with/{user_id}.
pub async fn conversation(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(user_id): Path<String>,
	Params(query): Params<PageQuery>,
) -> Result<Json<Envelope<MessagePage>>, APIError> {
	let (messages, pagination) = state
		.engine
		.messages()
		.conversation(&auth.actor(), &user_id, query)
		.await?;
	Ok(Json(Envelope::ok(MessagePage {
		messages,
		pagination,
	})))
}

/// Handles PUT /api/messages/{id}/read.
pub async fn mark_read(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
) -> Result<Json<Envelope<MessageBody>>, APIError> {
	let message = state.engine.messages().mark_read(&id, &auth.actor()).await?;
	Ok(Json(Envelope::with_message(
		"Message marked as read",
		MessageBody { data: message },
	)))
}

/// Handles PUT /api/messages/read-all/{user_id}.
pub async fn mark_all_read(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(user_id): Path<String>,
) -> Result<Json<Envelope<MarkedRead>>, APIError> {
	let updated = state
		.engine
		.messages()
		.mark_all_read(&auth.actor(), &user_id)
		.await?;
	Ok(Json(Envelope::with_message(
		"Messages marked as read",
		MarkedRead { updated },
	)))
}

/// Handles DELETE /api/messages/{id}.
pub async fn delete(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
) -> Result<Json<Envelope<Empty>>, APIError> {
	state.engine.messages().delete(&id, &auth.actor()).await?;
	Ok(Json(Envelope::with_message(
		"Message deleted successfully",
		Empty {},
	)))
}
