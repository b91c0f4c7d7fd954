use clap::Parser;
use psbus::server::{Options, Server};
use std::process;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const USAGE: &str = "Usage: psserver connections [portnum]";

#[derive(Debug, Parser)]
struct Arguments {
	/// Cap on simultaneously named clients; 0 means unlimited.
	connections: usize,

	/// Port to listen on; 0 or absent selects an ephemeral port.
	#[arg(value_parser = parse_port)]
	portnum: Option<u16>,
}

fn parse_port(value: &str) -> Result<u16, String> {
	let port: u16 = value
		.parse()
		.map_err(|_| String::from("portnum must be a decimal integer"))?;
	if port != 0 && port < 1024 {
		return Err(String::from("portnum must be 0 or in 1024..=65535"));
	}
	Ok(port)
}

#[tokio::main]
async fn main() -> psbus::Result<()> {
	setup_tracing()?;

	let Ok(arguments) = Arguments::try_parse() else {
		eprintln!("{USAGE}");
		process::exit(1);
	};

	let options = Options {
		connections: arguments.connections,
		port: arguments.portnum.unwrap_or(0),
	};

	let server = match Server::bind(options).await {
		Ok(server) => server,
		Err(error) => {
			tracing::debug!("bind failed: {error}");
			eprintln!("psserver: unable to open socket for listening");
			process::exit(2);
		}
	};

	server.serve().await
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
