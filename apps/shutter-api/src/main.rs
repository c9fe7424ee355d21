use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = shutter_api::Args::parse();

	shutter_api::run(args).await
}
