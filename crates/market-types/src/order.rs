//! Order documents.
//!
//! An order is created once a client accepts a proposal and tracks the work
//! through to completion. Deliverables and order-scoped messages are kept
//! inside the order document in insertion order.

use crate::{FileRef, Participant};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution record for an accepted proposal. Orders are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	pub id: String,
	/// The project this order executes. At most one order exists per project.
	pub project: String,
	pub client: String,
	pub freelancer: String,
	pub status: OrderStatus,
	pub price: Decimal,
	pub timeline: String,
	pub start_date: u64,
	pub deadline: u64,
	/// Completion percentage, always within 0..=100.
	#[serde(default)]
	pub progress: u8,
	#[serde(default)]
	pub deliverables: Vec<Deliverable>,
	#[serde(default)]
	pub messages: Vec<OrderMessage>,
	#[serde(default)]
	pub reviews: Reviews,
	#[serde(default)]
	pub completed_at: Option<u64>,
	pub created_at: u64,
	pub updated_at: u64,
}

impl Order {
	/// Returns which side of the order `user_id` is on, if any.
	pub fn participant(&self, user_id: &str) -> Option<Participant> {
		if self.client == user_id {
			Some(Participant::Client)
		} else if self.freelancer == user_id {
			Some(Participant::Freelancer)
		} else {
			None
		}
	}

	pub fn deliverable_mut(&mut self, deliverable_id: &str) -> Option<&mut Deliverable> {
		self.deliverables.iter_mut().find(|d| d.id == deliverable_id)
	}
}

/// Status of an order in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
	/// Created from an accepted proposal, work not started.
	Pending,
	Active,
	InProgress,
	Completed,
	Cancelled,
	Disputed,
}

impl OrderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Active => "active",
			OrderStatus::InProgress => "in-progress",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::Disputed => "disputed",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A unit of work submitted by the freelancer within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
	pub id: String,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	pub status: DeliverableStatus,
	#[serde(default)]
	pub files: Vec<FileRef>,
	#[serde(default)]
	pub submitted_at: Option<u64>,
	#[serde(default)]
	pub approved_at: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliverableStatus {
	Pending,
	InProgress,
	Completed,
}

/// A message posted on an order's own thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
	pub id: String,
	pub sender: String,
	pub message: String,
	#[serde(default)]
	pub attachments: Vec<FileRef>,
	pub timestamp: u64,
}

/// Reviews left on a completed order, at most one per side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviews {
	#[serde(default)]
	pub client_review: Option<Review>,
	#[serde(default)]
	pub freelancer_review: Option<Review>,
}

impl Reviews {
	/// The review slot owned by `side`.
	pub fn slot_mut(&mut self, side: Participant) -> &mut Option<Review> {
		match side {
			Participant::Client => &mut self.client_review,
			Participant::Freelancer => &mut self.freelancer_review,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
	/// Rating from 1 to 5.
	pub rating: u8,
	#[serde(default)]
	pub comment: Option<String>,
	pub created_at: u64,
}
