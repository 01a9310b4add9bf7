//! User accounts and the authenticated actor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a user registers with. Fixed for the lifetime of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
	Client,
	Freelancer,
}

impl UserRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			UserRole::Client => "client",
			UserRole::Freelancer => "freelancer",
		}
	}
}

impl fmt::Display for UserRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A registered marketplace user as persisted in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: String,
	/// Lowercased, unique across users.
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub role: UserRole,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub bio: Option<String>,
	#[serde(default)]
	pub skills: Vec<String>,
	#[serde(default)]
	pub experience: Option<String>,
	#[serde(default)]
	pub portfolio: Vec<String>,
	#[serde(default = "default_active")]
	pub is_active: bool,
	/// Opaque bearer credential. Never part of a [`PublicUser`].
	pub api_key: String,
	pub created_at: u64,
	pub updated_at: u64,
}

fn default_active() -> bool {
	true
}

impl User {
	/// The identity used for authorization checks on behalf of this user.
	pub fn actor(&self) -> Actor {
		Actor {
			id: self.id.clone(),
			role: self.role,
		}
	}
}

/// User view returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
	pub id: String,
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub role: UserRole,
	pub phone: Option<String>,
	pub location: Option<String>,
	pub bio: Option<String>,
	pub skills: Vec<String>,
	pub experience: Option<String>,
	pub portfolio: Vec<String>,
	pub is_active: bool,
	/// Mean rating from clients of completed orders. 0 when unrated.
	#[serde(default)]
	pub rating: f64,
	/// Number of completed orders.
	#[serde(default)]
	pub total_projects: usize,
	pub created_at: u64,
}

impl From<&User> for PublicUser {
	fn from(user: &User) -> Self {
		Self {
			id: user.id.clone(),
			email: user.email.clone(),
			first_name: user.first_name.clone(),
			last_name: user.last_name.clone(),
			role: user.role,
			phone: user.phone.clone(),
			location: user.location.clone(),
			bio: user.bio.clone(),
			skills: user.skills.clone(),
			experience: user.experience.clone(),
			portfolio: user.portfolio.clone(),
			is_active: user.is_active,
			rating: 0.0,
			total_projects: 0,
			created_at: user.created_at,
		}
	}
}

/// The authenticated user performing a request.
///
/// Resolved once per request and passed explicitly into every gate and
/// handler call; nothing holds a process-wide "current user".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
	pub id: String,
	pub role: UserRole,
}

impl Actor {
	pub fn new(id: impl Into<String>, role: UserRole) -> Self {
		Self {
			id: id.into(),
			role,
		}
	}

	pub fn is(&self, user_id: &str) -> bool {
		self.id == user_id
	}
}

/// Which side of a project or order a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Participant {
	Client,
	Freelancer,
}
