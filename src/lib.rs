//! # psbus
//!
//! A line-oriented publish/subscribe message broker.
//!
//! Connected peers announce a display name, then subscribe to topics,
//! publish to them and unsubscribe; every published line fans out to the
//! topic's current subscribers. The broker itself lives in [`server`]; the
//! building blocks (topic index, subscriber registry, protocol decoder,
//! counters) are exposed for the binaries and for tests.
//!
pub mod server;

mod broker;
mod command;
mod registry;
mod stats;
mod topic;
mod topics;

pub use self::{
	broker::Broker,
	command::{Command, InvalidCommand},
	registry::{Registry, SubscriberId},
	stats::{reporter, Snapshot, Stats},
	topic::{is_valid_string, InvalidTopic, Topic, TopicBuf},
	topics::TopicIndex,
};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
