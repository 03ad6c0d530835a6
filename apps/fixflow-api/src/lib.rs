pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

/// Crate version plus the git commit it was built from.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")");

/// Serves the FixFlow troubleshooting knowledge base over HTTP.
#[derive(Debug, Parser)]
#[command(version = VERSION, rename_all = "kebab")]
pub struct Args {
	/// TOML config; see `fixflow.example.toml`.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = fixflow_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let state = AppState::new(config).await?;
	let app = routes::router(state.clone());
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	axum::serve(http_listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	tracing::info!("HTTP server stopped; closing store.");

	state.service.shutdown().await;

	Ok(())
}

fn init_tracing(config: &fixflow_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).try_init().map_err(|err| {
		color_eyre::eyre::eyre!("Failed to install tracing subscriber: {err}")
	})?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to listen for Ctrl-C.");
	}
}
