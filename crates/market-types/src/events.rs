//! Domain events.
//!
//! Handlers publish an event after every persisted state change. Events are
//! informational: consumers log or react to them but nothing in the request
//! path waits on them.

use crate::{OrderStatus, ProjectStatus, ProposalStatus, UserRole};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all marketplace events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
	User(UserEvent),
	Project(ProjectEvent),
	Order(OrderEvent),
	Message(MessageEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserEvent {
	Registered { user_id: String, role: UserRole },
	ProfileUpdated { user_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProjectEvent {
	Created {
		project_id: String,
		client: String,
	},
	ProposalSubmitted {
		project_id: String,
		proposal_id: String,
		freelancer: String,
	},
	ProposalDecided {
		project_id: String,
		proposal_id: String,
		status: ProposalStatus,
	},
	StatusChanged {
		project_id: String,
		from: ProjectStatus,
		to: ProjectStatus,
	},
	Deleted {
		project_id: String,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	Created {
		order_id: String,
		project_id: String,
	},
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	DeliverableAdded {
		order_id: String,
		deliverable_id: String,
	},
	DeliverableSubmitted {
		order_id: String,
		deliverable_id: String,
	},
	ReviewAdded {
		order_id: String,
		reviewer: String,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageEvent {
	Sent {
		message_id: String,
		sender: String,
		receiver: String,
	},
	Read {
		message_id: String,
	},
	Deleted {
		message_id: String,
	},
}
