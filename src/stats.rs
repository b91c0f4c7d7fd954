use std::{
	fmt,
	io::{self, Write},
	sync::{Arc, Mutex},
};
use tokio::signal::unix::{signal, SignalKind};

/// A coherent copy of all five counters, taken at a single instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
	pub active: u64,
	pub completed: u64,
	pub publishes: u64,
	pub subscribes: u64,
	pub unsubscribes: u64,
}

/// Cumulative connection and operation counters.
///
/// One mutex guards all five counters so that [`snapshot`](Stats::snapshot)
/// never observes a torn update. Updates happen at operation acceptance,
/// not at parse.
#[derive(Debug, Default)]
pub struct Stats {
	inner: Mutex<Snapshot>,
}

impl Stats {
	pub fn new() -> Self {
		Self::default()
	}

	/// A connection was accepted.
	pub fn connected(&self) {
		self.inner.lock().unwrap().active += 1;
	}

	/// A connection terminated.
	pub fn disconnected(&self) {
		let mut inner = self.inner.lock().unwrap();
		inner.active -= 1;
		inner.completed += 1;
	}

	pub fn published(&self) {
		self.inner.lock().unwrap().publishes += 1;
	}

	pub fn subscribed(&self) {
		self.inner.lock().unwrap().subscribes += 1;
	}

	pub fn unsubscribed(&self) {
		self.inner.lock().unwrap().unsubscribes += 1;
	}

	pub fn snapshot(&self) -> Snapshot {
		*self.inner.lock().unwrap()
	}
}

impl fmt::Display for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Connected clients:{}", self.active)?;
		writeln!(f, "Completed clients:{}", self.completed)?;
		writeln!(f, "pub operations:{}", self.publishes)?;
		writeln!(f, "sub operations:{}", self.subscribes)?;
		write!(f, "unsub operations:{}", self.unsubscribes)
	}
}

/// Emits a counter snapshot to stdout on each SIGHUP.
///
/// This is the only task that listens for the signal, so each receipt
/// produces exactly one report.
pub async fn reporter(stats: Arc<Stats>) -> crate::Result<()> {
	let mut hangup = signal(SignalKind::hangup())?;
	while hangup.recv().await.is_some() {
		let snapshot = stats.snapshot();
		tracing::debug!(?snapshot, "emitting stats report");

		let mut stdout = io::stdout().lock();
		writeln!(stdout, "{snapshot}")?;
		stdout.flush()?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::{Snapshot, Stats};

	#[test]
	fn renders_five_labelled_lines() {
		let stats = Stats::new();
		for _ in 0..3 {
			stats.connected();
		}
		stats.disconnected();
		stats.published();
		stats.subscribed();
		stats.subscribed();
		stats.unsubscribed();

		assert_eq!(
			stats.snapshot().to_string(),
			"Connected clients:2\n\
			 Completed clients:1\n\
			 pub operations:1\n\
			 sub operations:2\n\
			 unsub operations:1"
		);
	}

	#[test]
	fn snapshots_are_identical_without_intervening_operations() {
		let stats = Stats::new();
		stats.connected();
		stats.published();

		assert_eq!(stats.snapshot(), stats.snapshot());
	}

	#[test]
	fn fresh_counters_are_zero() {
		assert_eq!(Stats::new().snapshot(), Snapshot::default());
	}
}
