use std::{collections::HashMap, fmt};
use tokio::sync::mpsc;

/// Identity of one accepted connection, assigned in accept order starting
/// at 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
	#[inline]
	pub const fn as_u64(self) -> u64 {
		let Self(inner) = self;
		inner
	}
}

impl fmt::Display for SubscriberId {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let Self(inner) = self;
		inner.fmt(f)
	}
}

/// Sender half of a connection's outbound line channel. Lines are queued
/// without their terminating newline; the owning session appends it when
/// writing to the socket.
pub type OutboundTx = mpsc::UnboundedSender<String>;
pub type OutboundRx = mpsc::UnboundedReceiver<String>;

/// The live connections, keyed by id.
///
/// The registry holds only the write side of each connection's outbound
/// channel; the session task owns the socket itself. This is what lets the
/// topic index reference subscribers weakly: resolving an id after its
/// session has gone simply yields nothing, and fan-out skips it.
#[derive(Debug, Default)]
pub struct Registry {
	next_id: u64,
	subscribers: HashMap<SubscriberId, OutboundTx>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Admits a new connection, allocating the next id and its outbound
	/// channel. The receiver half goes to the session task.
	pub fn add(&mut self) -> (SubscriberId, OutboundRx) {
		self.next_id += 1;
		let id = SubscriberId(self.next_id);

		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.insert(id, tx);
		(id, rx)
	}

	/// Resolves an id to its outbound channel, or `None` if the connection
	/// is gone.
	pub fn resolve(&self, id: SubscriberId) -> Option<&OutboundTx> {
		self.subscribers.get(&id)
	}

	/// Withdraws a connection. Returns whether it was present.
	pub fn remove(&mut self, id: SubscriberId) -> bool {
		self.subscribers.remove(&id).is_some()
	}

	pub fn len(&self) -> usize {
		self.subscribers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscribers.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::Registry;

	#[test]
	fn ids_are_sequential_and_never_reused() {
		let mut registry = Registry::new();
		let (first, _rx1) = registry.add();
		let (second, _rx2) = registry.add();
		assert_eq!(first.as_u64(), 1);
		assert_eq!(second.as_u64(), 2);

		assert!(registry.remove(first));
		assert!(!registry.remove(first));

		let (third, _rx3) = registry.add();
		assert_eq!(third.as_u64(), 3);
	}

	#[test]
	fn resolves_only_live_connections() {
		let mut registry = Registry::new();
		let (id, mut rx) = registry.add();

		registry.resolve(id).unwrap().send(String::from("hello")).unwrap();
		assert_eq!(rx.try_recv().unwrap(), "hello");

		registry.remove(id);
		assert!(registry.resolve(id).is_none());
	}
}
