//! Project and proposal documents.
//!
//! A project is posted by a client and collects proposals from freelancers.
//! Proposals live inside the project document in submission order and have
//! no lifecycle of their own.

use crate::{FileRef, Participant};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of work posted by a client.
///
/// `freelancer` is set exactly when `status` is not [`ProjectStatus::Open`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
	pub id: String,
	pub title: String,
	pub description: String,
	/// The client who owns this project.
	pub client: String,
	/// The freelancer assigned through an accepted proposal.
	#[serde(default)]
	pub freelancer: Option<String>,
	pub category: ProjectCategory,
	#[serde(default)]
	pub skills: Vec<String>,
	pub budget: Budget,
	pub timeline: ProjectTimeline,
	pub status: ProjectStatus,
	#[serde(default)]
	pub priority: ProjectPriority,
	#[serde(default)]
	pub attachments: Vec<FileRef>,
	#[serde(default)]
	pub proposals: Vec<Proposal>,
	/// Completion percentage, always within 0..=100.
	#[serde(default)]
	pub progress: u8,
	/// Budget of the accepted proposal.
	#[serde(default)]
	pub final_price: Option<Decimal>,
	#[serde(default)]
	pub completed_at: Option<u64>,
	pub created_at: u64,
	pub updated_at: u64,
}

impl Project {
	/// Returns which side of the project `user_id` is on, if any.
	pub fn participant(&self, user_id: &str) -> Option<Participant> {
		if self.client == user_id {
			Some(Participant::Client)
		} else if self.freelancer.as_deref() == Some(user_id) {
			Some(Participant::Freelancer)
		} else {
			None
		}
	}

	pub fn proposal(&self, proposal_id: &str) -> Option<&Proposal> {
		self.proposals.iter().find(|p| p.id == proposal_id)
	}

	pub fn proposal_mut(&mut self, proposal_id: &str) -> Option<&mut Proposal> {
		self.proposals.iter_mut().find(|p| p.id == proposal_id)
	}

	/// The accepted proposal, if one exists.
	pub fn accepted_proposal(&self) -> Option<&Proposal> {
		self.proposals
			.iter()
			.find(|p| p.status == ProposalStatus::Accepted)
	}

	/// Whether `freelancer` already has a proposal that blocks another one.
	///
	/// Rejected proposals do not block a new submission.
	pub fn has_active_proposal_from(&self, freelancer: &str) -> bool {
		self.proposals
			.iter()
			.any(|p| p.freelancer == freelancer && p.status != ProposalStatus::Rejected)
	}
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
	Open,
	InProgress,
	Completed,
	Cancelled,
}

impl ProjectStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProjectStatus::Open => "open",
			ProjectStatus::InProgress => "in-progress",
			ProjectStatus::Completed => "completed",
			ProjectStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for ProjectStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectCategory {
	WebDevelopment,
	MobileDevelopment,
	UiUxDesign,
	GraphicDesign,
	ContentWriting,
	Marketing,
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectTimeline {
	#[serde(rename = "1-week")]
	OneWeek,
	#[serde(rename = "2-weeks")]
	TwoWeeks,
	#[serde(rename = "1-month")]
	OneMonth,
	#[serde(rename = "2-months")]
	TwoMonths,
	#[serde(rename = "3-months")]
	ThreeMonths,
	#[serde(rename = "6-months")]
	SixMonths,
	#[serde(rename = "flexible")]
	Flexible,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectPriority {
	Low,
	#[default]
	Normal,
	High,
	Urgent,
}

/// Budget range a client is willing to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
	pub min: Decimal,
	pub max: Decimal,
}

/// A freelancer's bid on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
	/// Stable id assigned when the proposal is appended.
	pub id: String,
	pub freelancer: String,
	#[serde(default)]
	pub message: Option<String>,
	pub proposed_budget: Decimal,
	pub proposed_timeline: String,
	pub status: ProposalStatus,
	pub submitted_at: u64,
}

/// Status of a single proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalStatus {
	Pending,
	Accepted,
	Rejected,
}

impl fmt::Display for ProposalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProposalStatus::Pending => write!(f, "pending"),
			ProposalStatus::Accepted => write!(f, "accepted"),
			ProposalStatus::Rejected => write!(f, "rejected"),
		}
	}
}

/// The client's decision on a pending proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalDecision {
	Accepted,
	Rejected,
}

impl From<ProposalDecision> for ProposalStatus {
	fn from(decision: ProposalDecision) -> Self {
		match decision {
			ProposalDecision::Accepted => ProposalStatus::Accepted,
			ProposalDecision::Rejected => ProposalStatus::Rejected,
		}
	}
}

/// Terms a freelancer proposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalTerms {
	pub message: Option<String>,
	pub proposed_budget: Decimal,
	pub proposed_timeline: String,
}
