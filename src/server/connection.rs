use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// A line-framed view over one peer's socket.
#[derive(Debug)]
pub struct Connection<S> {
	stream: BufWriter<S>,
	buffer: BytesMut,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
	pub fn new(stream: S) -> Self {
		Self {
			stream: BufWriter::new(stream),
			buffer: BytesMut::with_capacity(4 * 1024),
		}
	}

	/// Reads a single LF-terminated line, without its terminator.
	///
	/// Returns `Ok(None)` once the peer has shut down cleanly. A final
	/// unterminated line is handed over as-is before end-of-stream.
	///
	/// Cancel-safe: a partial line stays in the buffer and the next call
	/// resumes where this one left off.
	pub async fn read_line(&mut self) -> crate::Result<Option<String>> {
		loop {
			// Attempt to frame a line from the buffered data.
			if let Some(line) = self.parse_line() {
				return Ok(Some(line));
			}

			// Not enough buffered data for a full line. Attempt to read
			// more.
			if 0 == self.stream.read_buf(&mut self.buffer).await? {
				if self.buffer.is_empty() {
					return Ok(None);
				}
				let line = String::from_utf8_lossy(&self.buffer).into_owned();
				self.buffer.clear();
				return Ok(Some(line));
			}
		}
	}

	fn parse_line(&mut self) -> Option<String> {
		let end = self.buffer.iter().position(|byte| *byte == b'\n')?;
		let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
		self.buffer.advance(end + 1);
		Some(line)
	}

	/// Writes one protocol line, appending the terminator, and flushes.
	pub async fn write_line(&mut self, line: &str) -> crate::Result<()> {
		self.stream.write_all(line.as_bytes()).await?;
		self.stream.write_all(b"\n").await?;
		self.stream.flush().await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::Connection;
	use tokio::io::AsyncWriteExt;

	#[tokio::test]
	async fn frames_lines_across_partial_reads() {
		let (mut client, server) = tokio::io::duplex(64);
		let mut connection = Connection::new(server);

		client.write_all(b"name al").await.unwrap();
		client.write_all(b"ice\nsub news\n").await.unwrap();

		assert_eq!(connection.read_line().await.unwrap().unwrap(), "name alice");
		assert_eq!(connection.read_line().await.unwrap().unwrap(), "sub news");
	}

	#[tokio::test]
	async fn delivers_final_unterminated_line() {
		let (mut client, server) = tokio::io::duplex(64);
		let mut connection = Connection::new(server);

		client.write_all(b"pub t x").await.unwrap();
		drop(client);

		assert_eq!(connection.read_line().await.unwrap().unwrap(), "pub t x");
		assert!(connection.read_line().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn empty_lines_are_framed() {
		let (mut client, server) = tokio::io::duplex(64);
		let mut connection = Connection::new(server);

		client.write_all(b"\nname a\n").await.unwrap();
		drop(client);

		assert_eq!(connection.read_line().await.unwrap().unwrap(), "");
		assert_eq!(connection.read_line().await.unwrap().unwrap(), "name a");
		assert!(connection.read_line().await.unwrap().is_none());
	}
}
