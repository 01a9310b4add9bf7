//! HTTP server for the marketplace API.
//!
//! Routes live under `/api` and delegate to the handlers in [`crate::apis`].
//! Browsing projects and freelancers is public; everything else requires a
//! bearer token issued at registration.

use crate::apis::{messages, orders, projects, users};
use axum::{
	extract::{DefaultBodyLimit, State},
	http::{HeaderName, HeaderValue, Method},
	response::Json,
	routing::{get, post, put},
	Router,
};
use market_config::{ApiConfig, CorsConfig};
use market_core::MarketEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the marketplace engine for processing requests.
	pub engine: Arc<MarketEngine>,
}

/// Builds the API routes without transport layers.
pub fn build_router(state: AppState) -> Router {
	let api = Router::new()
		.route("/users/register", post(users::register))
		.route(
			"/users/profile",
			get(users::profile).put(users::update_profile),
		)
		.route("/users/freelancers", get(users::list_freelancers))
		.route("/users/freelancers/{id}", get(users::get_freelancer))
		.route("/users/clients", get(users::list_clients))
		.route("/projects", get(projects::browse).post(projects::create))
		.route("/projects/my-projects", get(projects::my_projects))
		.route(
			"/projects/{id}",
			get(projects::get).delete(projects::delete),
		)
		.route("/projects/{id}/attachments", post(projects::add_attachments))
		.route("/projects/{id}/propose", post(projects::propose))
		.route(
			"/projects/{id}/proposals/{proposal_id}",
			put(projects::decide_proposal),
		)
		.route("/projects/{id}/status", put(projects::update_status))
		.route("/orders", get(orders::list).post(orders::create))
		.route("/orders/{id}", get(orders::get))
		.route("/orders/{id}/status", put(orders::update_status))
		.route("/orders/{id}/deliverables", post(orders::add_deliverable))
		.route(
			"/orders/{id}/deliverables/{deliverable_id}/submit",
			post(orders::submit_deliverable),
		)
		.route("/orders/{id}/messages", post(orders::add_message))
		.route("/orders/{id}/reviews", post(orders::add_review))
		.route("/messages", get(messages::list).post(messages::send))
		.route("/messages/conversations", get(messages::conversations))
		.route("/messages/with/{user_id}", get(messages::conversation))
		.route("/messages/read-all/{user_id}", put(messages::mark_all_read))
		.route("/messages/{id}/read", put(messages::mark_read))
		.route("/messages/{id}", axum::routing::delete(messages::delete));

	Router::new()
		.route("/health", get(health))
		.nest("/api", api)
		.with_state(state)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<MarketEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(AppState { engine }).layer(
		ServiceBuilder::new()
			.layer(
				TraceLayer::new_for_http()
					.make_span_with(DefaultMakeSpan::new().level(Level::INFO))
					.on_response(DefaultOnResponse::new().level(Level::INFO)),
			)
			.layer(cors_layer(api_config.cors.as_ref()))
			.layer(TimeoutLayer::new(Duration::from_secs(
				api_config.timeout_seconds,
			)))
			.layer(DefaultBodyLimit::max(api_config.max_request_size)),
	);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Marketplace API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /health requests.
async fn health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"success": true,
		"status": "ok",
		"market": state.engine.config().market.id,
	}))
}

/// Builds the CORS layer. Without a `[api.cors]` section any origin is
/// allowed.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origins = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::from(Any)
	} else {
		AllowOrigin::list(
			cors.allowed_origins
				.iter()
				.filter_map(|o| HeaderValue::from_str(o).ok()),
		)
	};

	let methods = if cors.allowed_methods.is_empty() {
		AllowMethods::from(Any)
	} else {
		AllowMethods::list(
			cors.allowed_methods
				.iter()
				.filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok()),
		)
	};

	let headers = if cors.allowed_headers.is_empty() {
		AllowHeaders::from(Any)
	} else {
		AllowHeaders::list(
			cors.allowed_headers
				.iter()
				.filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok()),
		)
	};

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods(methods)
		.allow_headers(headers)
}
