//! Order state machine.
//!
//! Manages order status transitions: `pending` and `active` lead into work,
//! `disputed` can be resolved back into work or closed, and `completed` and
//! `cancelled` are terminal.

use super::{Document, StateMachine};
use market_types::{Order, OrderStatus, StorageKey};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

pub type OrderStateMachine = StateMachine<Order>;

impl Document for Order {
	const NAMESPACE: StorageKey = StorageKey::Orders;
	const KIND: &'static str = "Order";

	fn id(&self) -> &str {
		&self.id
	}

	fn touch(&mut self, now: u64) {
		self.updated_at = now;
	}
}

// Static transition table - each state maps to allowed next states
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	let mut m = HashMap::new();
	m.insert(
		Pending,
		HashSet::from([Active, InProgress, Completed, Cancelled, Disputed]),
	);
	m.insert(
		Active,
		HashSet::from([InProgress, Completed, Cancelled, Disputed]),
	);
	m.insert(InProgress, HashSet::from([Completed, Cancelled, Disputed]));
	m.insert(Disputed, HashSet::from([InProgress, Completed, Cancelled]));
	m.insert(Completed, HashSet::new()); // terminal
	m.insert(Cancelled, HashSet::new()); // terminal
	m
});

/// Checks if a state transition is valid. Re-asserting the current status is.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
	from == to
		|| TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&to))
}
