//! Event bus for publishing marketplace events.
//!
//! A thin wrapper around a tokio broadcast channel. Publishing never blocks;
//! subscribers that fall behind lose the oldest events.

use market_types::MarketEvent;
use tokio::sync::broadcast;

/// Broadcasts [`MarketEvent`]s to every subscriber.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Fails only when nobody is subscribed; callers usually ignore that.
	pub fn publish(
		&self,
		event: MarketEvent,
	) -> Result<usize, broadcast::error::SendError<MarketEvent>> {
		self.sender.send(event)
	}
}
