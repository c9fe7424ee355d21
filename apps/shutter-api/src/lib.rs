pub mod routes;
pub mod state;

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;

use shutter_cli::{ConfigArgs, LogTarget};

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = shutter_cli::VERSION,
	rename_all = "kebab",
	styles = shutter_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: ConfigArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = shutter_config::load(&args.config.config)?;

	shutter_cli::init_tracing(&config.service.log_level, LogTarget::Stdout)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let state = AppState::new(config)?;
	let app = routes::router(state);
	let listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, version = shutter_cli::VERSION, "HTTP server listening.");

	axum::serve(listener, app).await?;

	Ok(())
}
