use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = shutter_search::Args::parse();

	shutter_search::run(args).await
}
