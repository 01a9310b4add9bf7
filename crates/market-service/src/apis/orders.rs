//! Order endpoints. Every route requires a participant of the order.

use super::extract::{Authenticated, Params, Payload};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use market_types::{
	APIError, CreateOrderRequest, DeliverableRequest, Envelope, OrderBody, OrderMessageRequest,
	OrderPage, OrderQuery, OrderStatusRequest, ReviewRequest, SubmitDeliverableRequest,
};

type OrderResponse = Result<Json<Envelope<OrderBody>>, APIError>;

/// Handles GET /api/orders.
pub async fn list(
	State(state): State<AppState>,
	auth: Authenticated,
	Params(query): Params<OrderQuery>,
) -> Result<Json<Envelope<OrderPage>>, APIError> {
	let (orders, pagination) = state.engine.orders().list(&auth.actor(), query).await?;
	Ok(Json(Envelope::ok(OrderPage { orders, pagination })))
}

/// Handles POST /api/orders.
pub async fn create(
	State(state): State<AppState>,
	auth: Authenticated,
	Payload(request): Payload<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<OrderBody>>), APIError> {
	let order = state.engine.orders().create(&auth.actor(), request).await?;
	Ok((
		StatusCode::CREATED,
		Json(Envelope::with_message(
			"Order created successfully",
			OrderBody { order },
		)),
	))
}

/// Handles GET /api/orders/{id}.
pub async fn get(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
) -> OrderResponse {
	let order = state.engine.orders().get(&id, &auth.actor()).await?;
	Ok(Json(Envelope::ok(OrderBody { order })))
}

/// Handles PUT /api/orders/{id}/status.
pub async fn update_status(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<OrderStatusRequest>,
) -> OrderResponse {
	let order = state
		.engine
		.orders()
		.update_status(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Order status updated successfully",
		OrderBody { order },
	)))
}

/// Handles POST /api/orders/{id}/deliverables.
pub async fn add_deliverable(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<DeliverableRequest>,
) -> OrderResponse {
	let order = state
		.engine
		.orders()
		.add_deliverable(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Deliverable added successfully",
		OrderBody { order },
	)))
}

/// Handles POST /api/orders/{id}/deliverables/{deliverable_id}/submit.
pub async fn submit_deliverable(
	State(state): State<AppState>,
	auth: Authenticated,
	Path((id, deliverable_id)): Path<(String, String)>,
	Payload(request): Payload<SubmitDeliverableRequest>,
) -> OrderResponse {
	let order = state
		.engine
		.orders()
		.submit_deliverable(&id, &deliverable_id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Deliverable submitted successfully",
		OrderBody { order },
	)))
}

/// Handles POST /api/orders/{id}/messages.
pub async fn add_message(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<OrderMessageRequest>,
) -> OrderResponse {
	let order = state
		.engine
		.orders()
		.add_message(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Message added successfully",
		OrderBody { order },
	)))
}

/// Handles POST /api/orders/{id}/reviews.
pub async fn add_review(
	State(state): State<AppState>,
	auth: Authenticated,
	Path(id): Path<String>,
	Payload(request): Payload<ReviewRequest>,
) -> OrderResponse {
	let order = state
		.engine
		.orders()
		.add_review(&id, &auth.actor(), request)
		.await?;
	Ok(Json(Envelope::with_message(
		"Review added successfully",
		OrderBody { order },
	)))
}
