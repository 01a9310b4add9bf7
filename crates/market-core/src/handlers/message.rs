//! Direct message handler.
//!
//! Messages are stored one document per message and are only ever visible
//! to their sender and receiver.

use super::{HandlerError, UserHandler};
use crate::engine::event_bus::EventBus;
use crate::lifecycle::{validate_request, LifecycleError};
use crate::state::{Document, StateError, StateMachine};
use market_config::MarketplaceConfig;
use market_types::{
	current_timestamp, new_id, paginate, truncate_id, Actor, Conversation, FileRef, MarketEvent,
	Message, MessageEvent, MessageQuery, PageQuery, Pagination, SendMessageRequest, StorageKey,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

impl Document for Message {
	const NAMESPACE: StorageKey = StorageKey::Messages;
	const KIND: &'static str = "Message";

	fn id(&self) -> &str {
		&self.id
	}

	// Messages carry no modification time.
	fn touch(&mut self, _now: u64) {}
}

pub type MessageStore = StateMachine<Message>;

/// Handler for direct messages.
pub struct MessageHandler {
	messages: Arc<MessageStore>,
	users: Arc<UserHandler>,
	event_bus: EventBus,
	limits: MarketplaceConfig,
}

impl MessageHandler {
	pub fn new(
		messages: Arc<MessageStore>,
		users: Arc<UserHandler>,
		event_bus: EventBus,
		limits: MarketplaceConfig,
	) -> Self {
		Self {
			messages,
			users,
			event_bus,
			limits,
		}
	}

	/// Sends a message to another user.
	#[instrument(skip_all, fields(sender = %truncate_id(&actor.id)))]
	pub async fn send(
		&self,
		actor: &Actor,
		request: SendMessageRequest,
	) -> Result<Message, HandlerError> {
		validate_request(&request)?;
		if request.message.trim().is_empty() {
			return Err(LifecycleError::Invalid("Message is required".into()).into());
		}
		if request.attachments.len() > self.limits.max_attachments {
			return Err(LifecycleError::Invalid(format!(
				"A message can have at most {} attachments",
				self.limits.max_attachments
			))
			.into());
		}

		let receiver = match self.users.get(&request.receiver).await {
			Ok(user) => user,
			Err(HandlerError::Lifecycle(LifecycleError::NotFound(_))) => {
				return Err(LifecycleError::NotFound("Receiver not found".into()).into());
			},
			Err(e) => return Err(e),
		};

		let now = current_timestamp();
		let message = Message {
			id: new_id(),
			sender: actor.id.clone(),
			receiver: receiver.id,
			project: request.project,
			order: request.order,
			message: request.message,
			attachments: request
				.attachments
				.into_iter()
				.map(|file| FileRef {
					uploaded_at: Some(now),
					..file
				})
				.collect(),
			message_type: request.message_type.unwrap_or_default(),
			is_read: false,
			read_at: None,
			created_at: now,
		};
		self.messages.store(&message).await?;

		tracing::info!(
			message_id = %truncate_id(&message.id),
			receiver = %truncate_id(&message.receiver),
			"Message sent"
		);
		self.event_bus
			.publish(MarketEvent::Message(MessageEvent::Sent {
				message_id: message.id.clone(),
				sender: message.sender.clone(),
				receiver: message.receiver.clone(),
			}))
			.ok();

		Ok(message)
	}

	async fn involving(&self, user_id: &str) -> Result<Vec<Message>, HandlerError> {
		let mut messages: Vec<Message> = self
			.messages
			.all()
			.await?
			.into_iter()
			.filter(|m| m.involves(user_id))
			.collect();
		messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
		Ok(messages)
	}

	/// The actor's messages, newest first, optionally about one project or
	/// order.
	pub async fn list(
		&self,
		actor: &Actor,
		query: MessageQuery,
	) -> Result<(Vec<Message>, Pagination), HandlerError> {
		let messages: Vec<Message> = self
			.involving(&actor.id)
			.await?
			.into_iter()
			.filter(|m| match &query.project_id {
				Some(project) => m.project.as_ref() == Some(project),
				None => true,
			})
			.filter(|m| match &query.order_id {
				Some(order) => m.order.as_ref() == Some(order),
				None => true,
			})
			.collect();

		Ok(paginate(
			messages,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		))
	}

	/// Messages exchanged with one other user, oldest first.
	///
	/// Viewing the thread marks everything the other user sent to the actor
	/// as read. The returned page shows the messages as they were fetched.
	#[instrument(skip_all, fields(other_user = %truncate_id(other_user)))]
	pub async fn conversation(
		&self,
		actor: &Actor,
		other_user: &str,
		query: PageQuery,
	) -> Result<(Vec<Message>, Pagination), HandlerError> {
		let mut messages: Vec<Message> = self
			.involving(&actor.id)
			.await?
			.into_iter()
			.filter(|m| m.counterpart(&actor.id) == other_user)
			.collect();
		messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

		let page = paginate(
			messages,
			query.page,
			query.limit,
			self.limits.default_page_size,
			self.limits.max_page_size,
		);

		let updated = self.mark_from(actor, other_user).await?;
		if updated > 0 {
			tracing::debug!(updated, "Conversation marked as read");
		}

		Ok(page)
	}

	/// One entry per counterpart, most recently active first.
	pub async fn conversations(&self, actor: &Actor) -> Result<Vec<Conversation>, HandlerError> {
		let mut by_user: HashMap<String, Conversation> = HashMap::new();

		// Newest first, so the first message seen per user is the latest.
		for message in self.involving(&actor.id).await? {
			let unread = message.receiver == actor.id && !message.is_read;
			let user = message.counterpart(&actor.id).to_string();
			match by_user.get_mut(&user) {
				Some(conversation) => {
					if unread {
						conversation.unread_count += 1;
					}
				},
				None => {
					by_user.insert(
						user.clone(),
						Conversation {
							user,
							last_message: message,
							unread_count: usize::from(unread),
						},
					);
				},
			}
		}

		let mut conversations: Vec<Conversation> = by_user.into_values().collect();
		conversations.sort_by(|a, b| {
			b.last_message
				.created_at
				.cmp(&a.last_message.created_at)
				.then_with(|| a.user.cmp(&b.user))
		});
		Ok(conversations)
	}

	/// Marks a received message as read.
	#[instrument(skip_all, fields(message_id = %truncate_id(message_id)))]
	pub async fn mark_read(&self, message_id: &str, actor: &Actor) -> Result<Message, HandlerError> {
		let (message, ()) = self
			.messages
			.update_with(message_id, |message| {
				if !actor.is(&message.receiver) {
					return Err(LifecycleError::Forbidden(
						"Not authorized to mark this message as read".into(),
					));
				}
				if !message.is_read {
					message.is_read = true;
					message.read_at = Some(current_timestamp());
				}
				Ok(())
			})
			.await?;

		self.event_bus
			.publish(MarketEvent::Message(MessageEvent::Read {
				message_id: message.id.clone(),
			}))
			.ok();

		Ok(message)
	}

	/// Marks every unread message from `sender` to the actor as read and
	/// returns how many changed.
	#[instrument(skip_all, fields(sender = %truncate_id(sender)))]
	pub async fn mark_all_read(&self, actor: &Actor, sender: &str) -> Result<usize, HandlerError> {
		let updated = self.mark_from(actor, sender).await?;
		tracing::info!(updated, "Messages marked as read");
		Ok(updated)
	}

	async fn mark_from(&self, actor: &Actor, sender: &str) -> Result<usize, HandlerError> {
		let unread: Vec<String> = self
			.messages
			.all()
			.await?
			.into_iter()
			.filter(|m| m.sender == sender && m.receiver == actor.id && !m.is_read)
			.map(|m| m.id)
			.collect();

		let mut updated = 0;
		for id in unread {
			let result = self
				.messages
				.update_with(&id, |message| {
					if message.is_read {
						return Ok(false);
					}
					message.is_read = true;
					message.read_at = Some(current_timestamp());
					Ok(true)
				})
				.await;
			match result {
				Ok((_, true)) => updated += 1,
				Ok((_, false)) => {},
				// Deleted by its sender since the listing.
				Err(StateError::Lifecycle(LifecycleError::NotFound(_))) => {},
				Err(e) => return Err(e.into()),
			}
		}
		Ok(updated)
	}

	/// Deletes a message sent by the actor.
	#[instrument(skip_all, fields(message_id = %truncate_id(message_id)))]
	pub async fn delete(&self, message_id: &str, actor: &Actor) -> Result<(), HandlerError> {
		self.messages
			.remove_with(message_id, |message| {
				if actor.is(&message.sender) {
					Ok(())
				} else {
					Err(LifecycleError::Forbidden(
						"Not authorized to delete this message".into(),
					))
				}
			})
			.await?;

		tracing::info!("Message deleted");
		self.event_bus
			.publish(MarketEvent::Message(MessageEvent::Deleted {
				message_id: message_id.to_string(),
			}))
			.ok();

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{register, TestMarket};
	use market_types::{MessageType, User, UserRole};

	async fn send(market: &TestMarket, from: &User, to: &User, text: &str) -> Message {
		market
			.messages()
			.send(
				&from.actor(),
				SendMessageRequest {
					receiver: to.id.clone(),
					message: text.into(),
					project: None,
					order: None,
					attachments: vec![],
					message_type: None,
				},
			)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_send_requires_known_receiver() {
		let market = TestMarket::new();
		let alice = register(&market, "a@example.com", UserRole::Client).await;

		let err = market
			.messages()
			.send(
				&alice.actor(),
				SendMessageRequest {
					receiver: "nobody".into(),
					message: "hello".into(),
					project: None,
					order: None,
					attachments: vec![],
					message_type: None,
				},
			)
			.await
			.unwrap_err();
		assert!(matches!(err, HandlerError::Lifecycle(LifecycleError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_conversations_and_read_state() {
		let market = TestMarket::new();
		let alice = register(&market, "a@example.com", UserRole::Client).await;
		let bob = register(&market, "b@example.com", UserRole::Freelancer).await;
		let carol = register(&market, "c@example.com", UserRole::Freelancer).await;

		let first = send(&market, &bob, &alice, "hi").await;
		send(&market, &bob, &alice, "are you there?").await;
		send(&market, &carol, &alice, "quote attached").await;
		assert_eq!(first.message_type, MessageType::Text);

		let conversations = market.messages().conversations(&alice.actor()).await.unwrap();
		assert_eq!(conversations.len(), 2);
		let with_bob = conversations.iter().find(|c| c.user == bob.id).unwrap();
		assert_eq!(with_bob.unread_count, 2);

		let (thread, _) = market
			.messages()
			.conversation(&alice.actor(), &bob.id, PageQuery::default())
			.await
			.unwrap();
		assert_eq!(thread.len(), 2);
		assert!(thread.iter().all(|m| m.sender == bob.id));

		assert!(matches!(
			market.messages().mark_read(&first.id, &bob.actor()).await,
			Err(HandlerError::Lifecycle(LifecycleError::Forbidden(_)))
		));

		let carol_message = send(&market, &carol, &alice, "follow-up").await;
		let read = market
			.messages()
			.mark_read(&carol_message.id, &alice.actor())
			.await
			.unwrap();
		assert!(read.is_read);
		assert!(read.read_at.is_some());

		let updated = market
			.messages()
			.mark_all_read(&alice.actor(), &carol.id)
			.await
			.unwrap();
		assert_eq!(updated, 1);

		let conversations = market.messages().conversations(&alice.actor()).await.unwrap();
		assert!(conversations.iter().all(|c| c.unread_count == 0));
	}

	#[tokio::test]
	async fn test_viewing_conversation_marks_it_read() {
		let market = TestMarket::new();
		let alice = register(&market, "a@example.com", UserRole::Client).await;
		let bob = register(&market, "b@example.com", UserRole::Freelancer).await;

		send(&market, &bob, &alice, "hi").await;
		send(&market, &alice, &bob, "hello").await;

		let (thread, _) = market
			.messages()
			.conversation(&alice.actor(), &bob.id, PageQuery::default())
			.await
			.unwrap();
		assert_eq!(thread.len(), 2);
		assert!(thread.iter().all(|m| !m.is_read));

		let unread = market.messages().conversations(&alice.actor()).await.unwrap()[0].unread_count;
		assert_eq!(unread, 0);
		let updated = market
			.messages()
			.mark_all_read(&alice.actor(), &bob.id)
			.await
			.unwrap();
		assert_eq!(updated, 0);

		// Alice's own reply is still unread on Bob's side.
		let bobs = market.messages().conversations(&bob.actor()).await.unwrap();
		assert_eq!(bobs[0].unread_count, 1);

		market
			.messages()
			.conversation(&bob.actor(), &alice.id, PageQuery::default())
			.await
			.unwrap();
		let bobs = market.messages().conversations(&bob.actor()).await.unwrap();
		assert_eq!(bobs[0].unread_count, 0);
	}

	#[tokio::test]
	async fn test_conversation_is_oldest_first_with_stable_ties() {
		let market = TestMarket::new();
		let alice = register(&market, "a@example.com", UserRole::Client).await;
		let bob = register(&market, "b@example.com", UserRole::Freelancer).await;

		for text in ["one", "two", "three", "four"] {
			send(&market, &bob, &alice, text).await;
		}

		let (thread, _) = market
			.messages()
			.conversation(&alice.actor(), &bob.id, PageQuery::default())
			.await
			.unwrap();
		assert_eq!(thread.len(), 4);
		for pair in thread.windows(2) {
			assert!(
				(pair[0].created_at, &pair[0].id) < (pair[1].created_at, &pair[1].id),
				"thread out of order"
			);
		}
	}

	#[tokio::test]
	async fn test_only_sender_deletes() {
		let market = TestMarket::new();
		let alice = register(&market, "a@example.com", UserRole::Client).await;
		let bob = register(&market, "b@example.com", UserRole::Freelancer).await;
		let message = send(&market, &alice, &bob, "draft").await;

		assert!(matches!(
			market.messages().delete(&message.id, &bob.actor()).await,
			Err(HandlerError::Lifecycle(LifecycleError::Forbidden(_)))
		));
		market.messages().delete(&message.id, &alice.actor()).await.unwrap();

		let (remaining, page) = market
			.messages()
			.list(&bob.actor(), MessageQuery::default())
			.await
			.unwrap();
		assert!(remaining.is_empty());
		assert_eq!(page.total, 0);
	}
}
