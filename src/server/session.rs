use super::connection::Connection;
use crate::{
	broker::Broker,
	command::Command,
	registry::{OutboundRx, SubscriberId},
};
use std::sync::Arc;
use tokio::{
	net::TcpStream,
	sync::{OwnedSemaphorePermit, Semaphore},
};

const INVALID: &str = ":invalid";

/// One connection's protocol state: unnamed until the first accepted
/// `name`, named from then on.
struct Session {
	id: SubscriberId,
	name: Option<String>,
	broker: Arc<Broker>,
	limit: Option<Arc<Semaphore>>,
	permit: Option<OwnedSemaphorePermit>,
}

/// Drives one connection from accept to termination.
///
/// The loop races the peer's next line against the connection's outbound
/// queue, so every byte written to this socket is written here, in queue
/// order. Deliveries from other sessions only ever enqueue, which keeps a
/// slow reader's backlog on its own connection.
pub(super) async fn run(
	id: SubscriberId,
	socket: TcpStream,
	mut outbound: OutboundRx,
	broker: Arc<Broker>,
	limit: Option<Arc<Semaphore>>,
) {
	let mut connection = Connection::new(socket);
	let mut session = Session {
		id,
		name: None,
		broker: Arc::clone(&broker),
		limit,
		permit: None,
	};

	loop {
		tokio::select! {
			line = connection.read_line() => {
				match line {
					Ok(Some(line)) => {
						if let Some(reply) = session.handle(&line).await {
							if let Err(error) = connection.write_line(reply).await {
								tracing::debug!(%id, "write failed: {error}");
								break;
							}
						}
					}
					Ok(None) => {
						tracing::debug!(%id, "peer closed connection");
						break;
					}
					Err(error) => {
						tracing::debug!(%id, "read failed: {error}");
						break;
					}
				}
			}
			Some(line) = outbound.recv() => {
				if let Err(error) = connection.write_line(&line).await {
					tracing::debug!(%id, "write failed: {error}");
					break;
				}
			}
		}
	}

	broker.disconnect(id);
	tracing::info!(%id, name = session.name.as_deref().unwrap_or(""), "session ended");
	// The cap permit, if any, releases when the session drops.
}

impl Session {
	/// Applies one decoded line, returning the reply to send, if any.
	async fn handle(&mut self, line: &str) -> Option<&'static str> {
		let command = match Command::parse(line) {
			Ok(command) => command,
			Err(error) => {
				let verb = line.split(' ').next().unwrap_or_default();
				return match verb {
					// Commands out of state are dropped without a reply,
					// well-formed or not.
					"sub" | "unsub" | "pub" if self.name.is_none() => None,
					"name" if self.name.is_some() => None,
					_ => {
						tracing::debug!(id = %self.id, %error, "rejected command");
						Some(INVALID)
					}
				};
			}
		};

		match command {
			Command::Name(name) => {
				if self.name.is_some() {
					// Renaming is ignored.
					return None;
				}

				// The connection cap gates the handshake: an accepted but
				// unnamed connection parks here until a slot frees.
				if let Some(limit) = &self.limit {
					// The semaphore is never closed, so acquire cannot fail.
					let Ok(permit) = Arc::clone(limit).acquire_owned().await else {
						return None;
					};
					self.permit = Some(permit);
				}

				tracing::debug!(id = %self.id, %name, "named");
				self.name = Some(name);
				None
			}
			Command::Subscribe(topic) => {
				if self.name.is_none() {
					return None;
				}
				let changed = self.broker.subscribe(self.id, &topic);
				tracing::debug!(id = %self.id, %topic, changed, "subscribe");
				None
			}
			Command::Unsubscribe(topic) => {
				if self.name.is_none() {
					return None;
				}
				let changed = self.broker.unsubscribe(self.id, &topic);
				tracing::debug!(id = %self.id, %topic, changed, "unsubscribe");
				None
			}
			Command::Publish { topic, payload } => {
				let Some(sender) = self.name.as_deref() else {
					return None;
				};
				let delivered = self.broker.publish(sender, &topic, &payload);
				tracing::debug!(id = %self.id, %topic, delivered, "publish");
				None
			}
		}
	}
}
