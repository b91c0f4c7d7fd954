use crate::{
	registry::{OutboundRx, Registry, SubscriberId},
	stats::Stats,
	topic::Topic,
	topics::TopicIndex,
};
use std::sync::{Arc, Mutex};

/// The shared half of the server: the topic index, the live-connection
/// registry and the operation counters, each behind its own lock.
///
/// Locks are taken per operation and released before anything that could
/// block: fan-out snapshots the subscriber list under the index lock,
/// drops it, then enqueues. Sessions only ever enqueue here; the socket
/// writes happen in the task that owns each socket.
#[derive(Debug, Default)]
pub struct Broker {
	topics: Mutex<TopicIndex>,
	registry: Mutex<Registry>,
	stats: Arc<Stats>,
}

impl Broker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stats(&self) -> Arc<Stats> {
		Arc::clone(&self.stats)
	}

	/// Admits a new connection: allocates the next id and its outbound
	/// channel, and counts it as active.
	pub fn connect(&self) -> (SubscriberId, OutboundRx) {
		let (id, rx) = self.registry.lock().unwrap().add();
		self.stats.connected();
		(id, rx)
	}

	/// Applies an accepted `sub`. Returns whether the index changed.
	pub fn subscribe(&self, id: SubscriberId, topic: &Topic) -> bool {
		self.stats.subscribed();
		self.topics.lock().unwrap().subscribe(topic, id)
	}

	/// Applies an accepted `unsub`. Returns whether the index changed.
	pub fn unsubscribe(&self, id: SubscriberId, topic: &Topic) -> bool {
		self.stats.unsubscribed();
		self.topics.lock().unwrap().unsubscribe(topic, id)
	}

	/// Fans a published line out to every current subscriber of `topic`,
	/// the sender included if it is subscribed. Returns the number of
	/// recipients the line was queued for.
	///
	/// A recipient that has vanished between snapshot and enqueue is
	/// skipped; it never aborts delivery to the rest.
	pub fn publish(&self, sender: &str, topic: &Topic, payload: &str) -> usize {
		self.stats.published();

		let snapshot = self.topics.lock().unwrap().subscribers_of(topic);
		if snapshot.is_empty() {
			return 0;
		}

		let line = format!("{sender}:{topic}:{payload}");
		let mut delivered = 0;

		let registry = self.registry.lock().unwrap();
		for id in snapshot {
			let Some(tx) = registry.resolve(id) else {
				tracing::trace!(%id, "subscriber gone, skipped");
				continue;
			};
			// Enqueueing fails only when the session has already hung up;
			// its own handler performs the cleanup.
			if tx.send(line.clone()).is_ok() {
				delivered += 1;
			}
		}

		tracing::trace!(%topic, delivered, "fan-out complete");
		delivered
	}

	/// Withdraws a terminated connection from every topic and the
	/// registry, and moves it from the active to the completed count.
	/// Called exactly once, by the owning session.
	pub fn disconnect(&self, id: SubscriberId) {
		self.topics.lock().unwrap().forget_subscriber(id);
		self.registry.lock().unwrap().remove(id);
		self.stats.disconnected();
	}
}
