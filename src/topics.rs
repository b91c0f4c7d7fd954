use crate::{
	registry::SubscriberId,
	topic::{Topic, TopicBuf},
};
use std::collections::HashMap;

/// The topic → subscriber index.
///
/// Subscriber lists keep subscription order, and a subscriber appears at
/// most once per topic; duplicates are detected by id, never by name. The
/// index stores bare ids, so it never owns a connection: callers resolve
/// ids against the [`Registry`](crate::Registry) when they need a write
/// channel.
///
/// This is a plain data structure with `&mut self` methods; the mutual
/// exclusion around it belongs to [`Broker`](crate::Broker).
#[derive(Debug, Default)]
pub struct TopicIndex {
	topics: HashMap<TopicBuf, Vec<SubscriberId>>,
}

impl TopicIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `id` to the topic's subscriber list, creating the topic on
	/// first use. Returns whether a change occurred; subscribing twice is
	/// a no-op.
	pub fn subscribe(&mut self, topic: &Topic, id: SubscriberId) -> bool {
		let subscribers = self.topics.entry(topic.to_owned()).or_default();
		if subscribers.contains(&id) {
			return false;
		}
		subscribers.push(id);
		true
	}

	/// Removes `id` from the topic's subscriber list, preserving the
	/// relative order of the remainder. A topic whose list empties is
	/// dropped. Returns whether a change occurred.
	pub fn unsubscribe(&mut self, topic: &Topic, id: SubscriberId) -> bool {
		let Some(subscribers) = self.topics.get_mut(topic) else {
			return false;
		};
		let Some(position) = subscribers.iter().position(|s| *s == id) else {
			return false;
		};

		subscribers.remove(position);
		if subscribers.is_empty() {
			self.topics.remove(topic);
		}
		true
	}

	/// Returns an owned snapshot of the topic's current subscribers, empty
	/// if the topic is absent. Fan-out iterates the snapshot, never the
	/// live list.
	pub fn subscribers_of(&self, topic: &Topic) -> Vec<SubscriberId> {
		self.topics.get(topic).cloned().unwrap_or_default()
	}

	/// Removes `id` from every topic list. Called exactly once per
	/// subscriber, at disconnect.
	pub fn forget_subscriber(&mut self, id: SubscriberId) {
		self.topics.retain(|_, subscribers| {
			subscribers.retain(|s| *s != id);
			!subscribers.is_empty()
		});
	}

	pub fn topic_count(&self) -> usize {
		self.topics.len()
	}

	pub fn is_empty(&self) -> bool {
		self.topics.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::TopicIndex;
	use crate::{Registry, SubscriberId, Topic};

	fn ids(n: usize) -> Vec<SubscriberId> {
		let mut registry = Registry::new();
		(0..n).map(|_| registry.add().0).collect()
	}

	#[test]
	fn subscribe_is_idempotent() {
		let mut index = TopicIndex::new();
		let ids = ids(1);
		let topic = Topic::from_static("news");

		assert!(index.subscribe(topic, ids[0]));
		assert!(!index.subscribe(topic, ids[0]));
		assert_eq!(index.subscribers_of(topic), vec![ids[0]]);
	}

	#[test]
	fn snapshot_keeps_subscription_order() {
		let mut index = TopicIndex::new();
		let ids = ids(3);
		let topic = Topic::from_static("t");

		for id in &ids {
			index.subscribe(topic, *id);
		}
		assert_eq!(index.subscribers_of(topic), ids);

		// Removal preserves the order of the remainder.
		assert!(index.unsubscribe(topic, ids[1]));
		assert_eq!(index.subscribers_of(topic), vec![ids[0], ids[2]]);
	}

	#[test]
	fn absent_topic_yields_empty_snapshot() {
		let index = TopicIndex::new();
		assert!(index.subscribers_of(Topic::from_static("nope")).is_empty());
	}

	#[test]
	fn unsubscribe_without_subscription_is_a_noop() {
		let mut index = TopicIndex::new();
		let ids = ids(2);
		let topic = Topic::from_static("t");

		assert!(!index.unsubscribe(topic, ids[0]));
		index.subscribe(topic, ids[0]);
		assert!(!index.unsubscribe(topic, ids[1]));
		assert_eq!(index.subscribers_of(topic), vec![ids[0]]);
	}

	#[test]
	fn emptied_topics_are_dropped() {
		let mut index = TopicIndex::new();
		let ids = ids(1);
		let topic = Topic::from_static("t");

		index.subscribe(topic, ids[0]);
		assert_eq!(index.topic_count(), 1);
		index.unsubscribe(topic, ids[0]);
		assert!(index.is_empty());
	}

	#[test]
	fn forget_subscriber_clears_every_topic() {
		let mut index = TopicIndex::new();
		let ids = ids(2);

		for topic in ["a", "b", "c"] {
			index.subscribe(Topic::new(topic).unwrap(), ids[0]);
		}
		index.subscribe(Topic::from_static("b"), ids[1]);

		index.forget_subscriber(ids[0]);

		assert_eq!(index.topic_count(), 1);
		assert_eq!(index.subscribers_of(Topic::from_static("b")), vec![ids[1]]);
		assert!(index.subscribers_of(Topic::from_static("a")).is_empty());
	}
}
