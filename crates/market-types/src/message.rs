//! Direct messages between users.

use crate::FileRef;
use serde::{Deserialize, Serialize};

/// A message sent from one user to another, optionally about a project or
/// an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
	pub id: String,
	pub sender: String,
	pub receiver: String,
	#[serde(default)]
	pub project: Option<String>,
	#[serde(default)]
	pub order: Option<String>,
	pub message: String,
	#[serde(default)]
	pub attachments: Vec<FileRef>,
	#[serde(default)]
	pub message_type: MessageType,
	#[serde(default)]
	pub is_read: bool,
	#[serde(default)]
	pub read_at: Option<u64>,
	pub created_at: u64,
}

impl Message {
	/// Whether `user_id` sent or received this message.
	pub fn involves(&self, user_id: &str) -> bool {
		self.sender == user_id || self.receiver == user_id
	}

	/// The other party of the message from `user_id`'s point of view.
	pub fn counterpart(&self, user_id: &str) -> &str {
		if self.sender == user_id {
			&self.receiver
		} else {
			&self.sender
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
	#[default]
	Text,
	File,
	Image,
	System,
}

/// Per-counterpart summary of a user's messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
	/// The other user in the conversation.
	pub user: String,
	pub last_message: Message,
	/// Messages from `user` not yet read.
	pub unread_count: usize,
}
