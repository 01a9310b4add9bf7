//! API types for the marketplace HTTP API.
//!
//! Every successful response is wrapped in an [`Envelope`]:
//! `{ "success": true, "message": "...", "<entity>": ... }`. Failures are
//! reported through [`APIError`], which renders as
//! `{ "success": false, "error": "<KIND>", "message": "..." }`.

use crate::{
	Conversation, FileRef, Message, MessageType, Order, OrderStatus, Project, ProjectCategory,
	ProjectPriority, ProjectStatus, ProjectTimeline, ProposalDecision, PublicUser, UserRole,
	Budget,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request body for `POST /api/users/register`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1, max = 100))]
	pub first_name: String,
	#[validate(length(min = 1, max = 100))]
	pub last_name: String,
	pub role: UserRole,
}

/// Request body for `PUT /api/users/profile`. Absent or empty fields are
/// left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
	#[validate(length(max = 100))]
	pub first_name: Option<String>,
	#[validate(length(max = 100))]
	pub last_name: Option<String>,
	pub phone: Option<String>,
	pub location: Option<String>,
	#[validate(length(max = 2000))]
	pub bio: Option<String>,
	pub skills: Option<Vec<String>>,
	pub experience: Option<String>,
	pub portfolio: Option<Vec<String>>,
}

/// Request body for `POST /api/projects`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
	#[validate(length(min = 1, max = 200))]
	pub title: String,
	#[validate(length(min = 1))]
	pub description: String,
	pub category: ProjectCategory,
	#[serde(default)]
	pub skills: Vec<String>,
	pub budget: Budget,
	pub timeline: ProjectTimeline,
	#[serde(default)]
	pub priority: ProjectPriority,
}

/// Request body for `POST /api/projects/{id}/propose`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRequest {
	pub message: Option<String>,
	pub proposed_budget: Decimal,
	#[validate(length(min = 1))]
	pub proposed_timeline: String,
}

/// Request body for `PUT /api/projects/{id}/proposals/{proposal_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDecisionRequest {
	pub status: ProposalDecision,
}

/// Request body for the project and order status endpoints.
///
/// `progress` is taken as a signed integer so that out-of-range values reach
/// the lifecycle gate, which clamps them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest<S> {
	pub status: Option<S>,
	pub progress: Option<i64>,
}

pub type ProjectStatusRequest = StatusUpdateRequest<ProjectStatus>;
pub type OrderStatusRequest = StatusUpdateRequest<OrderStatus>;

/// Request body for `POST /api/projects/{id}/attachments`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttachmentsRequest {
	#[validate(nested)]
	pub attachments: Vec<FileRef>,
}

/// Request body for `POST /api/orders`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
	#[validate(length(min = 1))]
	pub project_id: String,
	#[validate(length(min = 1))]
	pub freelancer_id: String,
	pub price: Decimal,
	#[validate(length(min = 1))]
	pub timeline: String,
	/// Unix timestamp in seconds.
	pub deadline: u64,
}

/// Request body for `POST /api/orders/{id}/deliverables`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeliverableRequest {
	#[validate(length(min = 1, max = 200))]
	pub title: String,
	pub description: Option<String>,
}

/// Request body for `POST /api/orders/{id}/deliverables/{deliverable_id}/submit`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitDeliverableRequest {
	#[serde(default)]
	#[validate(nested)]
	pub files: Vec<FileRef>,
}

/// Request body for `POST /api/orders/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderMessageRequest {
	#[validate(length(min = 1))]
	pub message: String,
	#[serde(default)]
	#[validate(nested)]
	pub attachments: Vec<FileRef>,
}

/// Request body for `POST /api/orders/{id}/reviews`.
///
/// The rating range is enforced by the lifecycle gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
	pub rating: i64,
	pub comment: Option<String>,
}

/// Request body for `POST /api/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
	#[validate(length(min = 1))]
	pub receiver: String,
	#[validate(length(min = 1))]
	pub message: String,
	pub project: Option<String>,
	pub order: Option<String>,
	#[serde(default)]
	#[validate(nested)]
	pub attachments: Vec<FileRef>,
	pub message_type: Option<MessageType>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Page selection shared by list endpoints. Pages start at 1.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
	pub page: Option<usize>,
	pub limit: Option<usize>,
}

/// Filters for `GET /api/projects`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
	pub page: Option<usize>,
	pub limit: Option<usize>,
	/// Defaults to `open`.
	pub status: Option<ProjectStatus>,
	pub category: Option<ProjectCategory>,
	/// Comma-separated; a project matches if it lists any of them.
	pub skills: Option<String>,
	pub budget_min: Option<Decimal>,
	pub budget_max: Option<Decimal>,
	pub timeline: Option<ProjectTimeline>,
}

/// Filters for `GET /api/projects/my-projects`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MyProjectsQuery {
	pub page: Option<usize>,
	pub limit: Option<usize>,
	pub status: Option<ProjectStatus>,
}

/// Filters for `GET /api/orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
	pub page: Option<usize>,
	pub limit: Option<usize>,
	pub status: Option<OrderStatus>,
}

/// Filters for `GET /api/messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
	pub page: Option<usize>,
	pub limit: Option<usize>,
	pub project_id: Option<String>,
	pub order_id: Option<String>,
}

/// Filters for `GET /api/users/freelancers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreelancerQuery {
	pub page: Option<usize>,
	pub limit: Option<usize>,
	/// Comma-separated; a freelancer matches if they list any of them.
	pub skills: Option<String>,
	/// Case-insensitive substring match.
	pub location: Option<String>,
}

/// Splits a comma-separated filter into trimmed, non-empty values.
pub fn split_csv(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Success wrapper shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(flatten)]
	pub body: T,
}

impl<T> Envelope<T> {
	pub fn ok(body: T) -> Self {
		Self {
			success: true,
			message: None,
			body,
		}
	}

	pub fn with_message(message: impl Into<String>, body: T) -> Self {
		Self {
			success: true,
			message: Some(message.into()),
			body,
		}
	}
}

/// Page metadata added to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
	pub total_pages: usize,
	pub current_page: usize,
	pub total: usize,
}

/// Cuts one page out of `items`.
///
/// `page` is 1-based; `limit` is clamped to `1..=max_limit`.
pub fn paginate<T>(
	items: Vec<T>,
	page: Option<usize>,
	limit: Option<usize>,
	default_limit: usize,
	max_limit: usize,
) -> (Vec<T>, Pagination) {
	let limit = limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
	let page = page.unwrap_or(1).max(1);
	let total = items.len();
	let total_pages = total.div_ceil(limit);
	let page_items = items
		.into_iter()
		.skip((page - 1).saturating_mul(limit))
		.take(limit)
		.collect();

	(
		page_items,
		Pagination {
			total_pages,
			current_page: page,
			total,
		},
	)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBody {
	pub user: PublicUser,
}

/// Returned once at registration; the token is the bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredBody {
	pub user: PublicUser,
	pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreelancerPage {
	pub freelancers: Vec<PublicUser>,
	#[serde(flatten)]
	pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPage {
	pub clients: Vec<PublicUser>,
	#[serde(flatten)]
	pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreelancerBody {
	pub freelancer: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBody {
	pub project: Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPage {
	pub projects: Vec<Project>,
	#[serde(flatten)]
	pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsBody {
	pub attachments: Vec<FileRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBody {
	pub order: Order,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
	pub orders: Vec<Order>,
	#[serde(flatten)]
	pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
	pub data: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
	pub messages: Vec<Message>,
	#[serde(flatten)]
	pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationList {
	pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
	pub updated: usize,
}

/// Body with no entity, for endpoints that only report a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Always `false`.
	pub success: bool,
	/// Error kind, e.g. `FORBIDDEN`.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Missing or malformed input (400).
	BadRequest { error_type: String, message: String },
	/// No or unknown bearer token (401).
	Unauthorized { message: String },
	/// Actor lacks the role or ownership required (403).
	Forbidden { message: String },
	/// Referenced document does not exist (404).
	NotFound { message: String },
	/// Operation illegal in the current state (409).
	Conflict { message: String },
	/// Storage or other internal failure (500).
	InternalServerError { message: String },
}

impl APIError {
	pub fn bad_request(message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: "INVALID".into(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::InternalServerError { .. } => 500,
		}
	}

	fn kind(&self) -> &str {
		match self {
			APIError::BadRequest { error_type, .. } => error_type,
			APIError::Unauthorized { .. } => "UNAUTHORIZED",
			APIError::Forbidden { .. } => "FORBIDDEN",
			APIError::NotFound { .. } => "NOT_FOUND",
			APIError::Conflict { .. } => "CONFLICT",
			APIError::InternalServerError { .. } => "INTERNAL_ERROR",
		}
	}

	fn message(&self) -> &str {
		match self {
			APIError::BadRequest { message, .. }
			| APIError::Unauthorized { message }
			| APIError::Forbidden { message }
			| APIError::NotFound { message }
			| APIError::Conflict { message }
			| APIError::InternalServerError { message } => message,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			success: false,
			error: self.kind().to_string(),
			message: self.message().to_string(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.kind(), self.message())
	}
}

impl std::error::Error for APIError {}

impl From<validator::ValidationErrors> for APIError {
	fn from(errors: validator::ValidationErrors) -> Self {
		let fields: Vec<String> = errors
			.field_errors()
			.keys()
			.map(|field| field.to_string())
			.collect();
		let message = if fields.is_empty() {
			"Request validation failed".to_string()
		} else {
			format!("Invalid or missing fields: {}", fields.join(", "))
		};
		APIError::bad_request(message)
	}
}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_paginate_splits_pages() {
		let items: Vec<u32> = (1..=25).collect();

		let (page, meta) = paginate(items.clone(), Some(3), Some(10), 10, 50);
		assert_eq!(page, vec![21, 22, 23, 24, 25]);
		assert_eq!(
			meta,
			Pagination {
				total_pages: 3,
				current_page: 3,
				total: 25
			}
		);

		let (page, meta) = paginate(items, None, Some(500), 10, 50);
		assert_eq!(page.len(), 25);
		assert_eq!(meta.total_pages, 1);
	}

	#[test]
	fn test_paginate_past_the_end_is_empty() {
		let (page, meta) = paginate(vec![1, 2, 3], Some(4), Some(2), 10, 50);
		assert!(page.is_empty());
		assert_eq!(meta.total_pages, 2);
	}

	#[test]
	fn test_envelope_flattens_body() {
		let value = serde_json::to_value(Envelope::with_message(
			"Marked",
			MarkedRead { updated: 2 },
		))
		.unwrap();
		assert_eq!(value["success"], true);
		assert_eq!(value["message"], "Marked");
		assert_eq!(value["updated"], 2);
	}

	#[test]
	fn test_error_response_shape() {
		let err = APIError::Conflict {
			message: "Client review already exists".into(),
		};
		assert_eq!(err.status_code(), 409);
		let body = err.to_error_response();
		assert!(!body.success);
		assert_eq!(body.error, "CONFLICT");
	}

	#[test]
	fn test_split_csv() {
		assert_eq!(split_csv("rust, go,,"), vec!["rust", "go"]);
	}
}
