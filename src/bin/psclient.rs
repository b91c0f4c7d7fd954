use clap::Parser;
use psbus::is_valid_string;
use std::process;
use tokio::{
	io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
	net::TcpStream,
};
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const USAGE: &str = "Usage: psclient portnum name [topic] ...";

#[derive(Debug, Parser)]
struct Arguments {
	/// Port the broker is listening on.
	portnum: u16,

	/// Display name to announce.
	name: String,

	/// Topics to subscribe to on connect.
	topics: Vec<String>,
}

#[tokio::main]
async fn main() -> psbus::Result<()> {
	setup_tracing()?;

	let Ok(arguments) = Arguments::try_parse() else {
		eprintln!("{USAGE}");
		process::exit(1);
	};

	if !is_valid_string(&arguments.name) {
		eprintln!("psclient: invalid name");
		process::exit(2);
	}
	for topic in &arguments.topics {
		if !is_valid_string(topic) {
			eprintln!("psclient: invalid topic");
			process::exit(2);
		}
	}

	let Ok(stream) = TcpStream::connect(("localhost", arguments.portnum)).await else {
		eprintln!("psclient: unable to connect to port {}", arguments.portnum);
		process::exit(3);
	};
	let (from_server, mut to_server) = stream.into_split();

	let mut greeting = format!("name {}\n", arguments.name);
	for topic in &arguments.topics {
		greeting.push_str(&format!("sub {topic}\n"));
	}
	to_server.write_all(greeting.as_bytes()).await?;

	// Forward stdin to the server until local end-of-input.
	tokio::spawn(async move {
		let mut lines = BufReader::new(tokio::io::stdin()).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			if to_server.write_all(format!("{line}\n").as_bytes()).await.is_err() {
				break;
			}
		}
		process::exit(0);
	});

	// Print every server line until the broker hangs up.
	let mut lines = BufReader::new(from_server).lines();
	while let Ok(Some(line)) = lines.next_line().await {
		println!("{line}");
	}

	eprintln!("psclient: server connection terminated");
	process::exit(4);
}

fn setup_tracing() -> Result<(), SetGlobalDefaultError> {
	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::ERROR.into())
		.with_env_var("PSBUS_LOG")
		.try_from_env();

	let subscriber = tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_env_filter(filter.unwrap_or_default())
		.finish();

	tracing::subscriber::set_global_default(subscriber)
}
