//! Command-line plumbing shared by the shutter binaries.

use std::path::PathBuf;

use clap::{
	Args,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	" (",
	env!("VERGEN_GIT_SHA"),
	" ",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
	")",
);

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
	/// TOML configuration file.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
	Stdout,
	/// Keeps stdout free for interactive output.
	Stderr,
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// Installs the global subscriber. An unparsable `log_level` falls back to `info`.
pub fn init_tracing(log_level: &str, target: LogTarget) -> color_eyre::Result<()> {
	let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	let builder = tracing_subscriber::fmt().with_env_filter(filter);
	let result = match target {
		LogTarget::Stdout => builder.try_init(),
		LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
	};

	result.map_err(|err| eyre::eyre!("Failed to initialize tracing: {err}"))
}
