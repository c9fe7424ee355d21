pub mod repl;

use std::{path::Path, sync::Arc, time::Duration};

use clap::Parser;
use color_eyre::Result;
use tokio::{
	io::{AsyncBufReadExt, BufReader},
	sync::watch,
};

use shutter_cli::{ConfigArgs, LogTarget};
use shutter_client::{ClientSearchState, HttpSearchBackend, SearchController};
use shutter_domain::ImagePayload;

use crate::repl::Command;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

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

pub async fn run(args: Args) -> Result<()> {
	let config = shutter_config::load(&args.config.config)?;

	shutter_cli::init_tracing(&config.service.log_level, LogTarget::Stderr)?;

	let api_base = shutter_config::client_api_base(&config);
	let backend = Arc::new(HttpSearchBackend::new(&api_base, REQUEST_TIMEOUT)?);
	let controller = SearchController::new(
		backend.clone(),
		Duration::from_millis(config.client.debounce_ms),
		config.search.default_certainty_threshold,
	);
	let renderer = tokio::spawn(render_changes(controller.subscribe()));

	tracing::info!(%api_base, version = shutter_cli::VERSION, "Search client ready.");
	println!("{}", repl::HELP);

	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	while let Some(line) = lines.next_line().await? {
		if line.trim().is_empty() {
			continue;
		}

		let command = match repl::parse(&line) {
			Ok(command) => command,
			Err(err) => {
				eprintln!("{err}");

				continue;
			},
		};

		match command {
			Command::Quit => break,
			Command::Help => println!("{}", repl::HELP),
			Command::Query(query) => controller.on_query_change(query),
			Command::Threshold(threshold) => controller.on_threshold_change(threshold),
			Command::Page(page) => controller.on_page_change(page),
			Command::Dates(date_range) => controller.on_date_range_change(date_range),
			Command::Submit => controller.submit(),
			Command::Image(path) => match read_image(&path).await {
				Ok(image) => controller.on_image_upload(image),
				Err(err) => eprintln!("Failed to read {}: {err}", path.display()),
			},
			Command::Suggest => print_suggestions(&backend, &controller.state()).await,
		}
	}

	renderer.abort();

	Ok(())
}

async fn render_changes(mut rx: watch::Receiver<ClientSearchState>) {
	while rx.changed().await.is_ok() {
		let state = rx.borrow_and_update().clone();

		print!("{}", repl::render(&state));
	}
}

async fn read_image(path: &Path) -> Result<ImagePayload> {
	let bytes = tokio::fs::read(path).await?;
	let file_name = path
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| "upload".to_string());

	Ok(ImagePayload::new(bytes, file_name).with_content_type(repl::content_type_for(path)))
}

async fn print_suggestions(backend: &HttpSearchBackend, state: &ClientSearchState) {
	let query = Some(state.query.as_str()).filter(|query| !query.is_empty());

	if query.is_none() && state.image.is_none() {
		eprintln!("Type a query or load an image first.");

		return;
	}

	match backend.suggest(query, state.image.as_ref()).await {
		Ok(suggestions) if suggestions.is_empty() => println!("No suggestions."),
		Ok(suggestions) =>
			for suggestion in suggestions {
				println!("  - {suggestion}");
			},
		Err(err) => {
			tracing::warn!(error = %err, "Suggestion request failed.");
			eprintln!("Suggestions unavailable: {err}");
		},
	}
}
