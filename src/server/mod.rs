//! The broker server: acceptor, per-connection sessions and line framing.

mod connection;
mod session;

use crate::{broker::Broker, stats};
use std::{
	io::{self, Write},
	sync::Arc,
};
use tokio::{net::TcpListener, sync::Semaphore};

/// Acceptor configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
	/// Cap on simultaneously named connections; `0` means unlimited.
	pub connections: usize,
	/// Port to listen on; `0` selects an ephemeral port.
	pub port: u16,
}

/// A bound broker, ready to accept connections.
#[derive(Debug)]
pub struct Server {
	listener: TcpListener,
	broker: Arc<Broker>,
	limit: Option<Arc<Semaphore>>,
}

impl Server {
	/// Binds the listening socket and announces the chosen port as a
	/// decimal line on stderr, flushed, before any connection is accepted.
	pub async fn bind(options: Options) -> io::Result<Self> {
		let listener = TcpListener::bind(("0.0.0.0", options.port)).await?;
		let port = listener.local_addr()?.port();

		let mut stderr = io::stderr().lock();
		writeln!(stderr, "{port}")?;
		stderr.flush()?;

		tracing::info!(port, connections = options.connections, "listening");

		let limit =
			(options.connections > 0).then(|| Arc::new(Semaphore::new(options.connections)));

		Ok(Self {
			listener,
			broker: Arc::new(Broker::new()),
			limit,
		})
	}

	/// The port the listener actually bound.
	pub fn local_port(&self) -> io::Result<u16> {
		Ok(self.listener.local_addr()?.port())
	}

	pub fn broker(&self) -> Arc<Broker> {
		Arc::clone(&self.broker)
	}

	/// Accepts connections forever, spawning one session task per socket,
	/// plus the SIGHUP stats reporter.
	pub async fn serve(self) -> crate::Result<()> {
		let Self {
			listener,
			broker,
			limit,
		} = self;

		let stats = broker.stats();
		tokio::spawn(async move {
			if let Err(error) = stats::reporter(stats).await {
				tracing::warn!("stats reporter unavailable: {error}");
			}
		});

		loop {
			let (socket, peer) = match listener.accept().await {
				Ok(accepted) => accepted,
				Err(error) => {
					// Transient accept failures don't take the broker down.
					tracing::warn!("accept failed: {error}");
					continue;
				}
			};

			let (id, outbound) = broker.connect();
			tracing::info!(%id, %peer, "accepted connection");

			tokio::spawn(session::run(
				id,
				socket,
				outbound,
				Arc::clone(&broker),
				limit.clone(),
			));
		}
	}
}
