use std::io;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use clap::Parser;
use log::info;
use unnatural_core::config::{DEFAULT_MAX_SUGGESTIONS, DEFAULT_WINDOW_SIZE};
use unnatural_core::{CorpusRegistry, RegistryConfig};

mod error;
mod routes;

/// Command-line and environment settings of the server.
#[derive(Parser, Debug)]
#[command(version, about = "Naturalness scores and next-token suggestions over n-gram corpora")]
struct Args {
	/// Address to bind
	#[arg(long, env = "UNNATURAL_HOST", default_value = "127.0.0.1")]
	host: String,

	/// Port to bind
	#[arg(short, long, env = "UNNATURAL_PORT", default_value_t = 5000)]
	port: u16,

	/// Directory holding one statistics file per corpus
	#[arg(long, env = "UNNATURAL_DATA_DIR", default_value = "./data")]
	data_dir: PathBuf,

	/// Maximum number of suggestions per prediction
	#[arg(long, env = "UNNATURAL_SUGGESTIONS", default_value_t = DEFAULT_MAX_SUGGESTIONS)]
	suggestions: usize,

	/// Window length, in tokens, of the windowed cross-entropy
	#[arg(long, env = "UNNATURAL_WINDOW", default_value_t = DEFAULT_WINDOW_SIZE)]
	window: usize,

	/// Largest accepted request body, in bytes
	#[arg(long, env = "UNNATURAL_MAX_PAYLOAD", default_value_t = routes::DEFAULT_MAX_PAYLOAD)]
	max_payload: usize,
}

/// Main entry point for the server.
///
/// Builds the corpus registry, shares it with every worker and starts an
/// Actix-web HTTP server exposing the corpus endpoints.
///
/// # Notes
/// - Logging follows `RUST_LOG` and defaults to `info`.
/// - Live model handles are committed once the server stops.
#[actix_web::main]
async fn main() -> io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let config = RegistryConfig {
		data_dir: args.data_dir,
		max_suggestions: args.suggestions,
		window_size: args.window,
	};
	let registry = web::Data::new(CorpusRegistry::with_defaults(&config).map_err(io::Error::other)?);

	info!("listening on {}:{}", args.host, args.port);
	let shared_registry = registry.clone();
	let max_payload = args.max_payload;
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.wrap(middleware::Logger::default())
			.app_data(shared_registry.clone())
			.configure(|cfg| routes::configure(cfg, max_payload))
	})
		.bind((args.host.as_str(), args.port))?
		.run()
		.await?;

	info!("server stopped, committing corpora");
	registry.shutdown().map_err(io::Error::other)
}
