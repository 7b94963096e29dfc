//! The `quill` command-line tool.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let stdout = std::io::stdout();
	commands::run(cli, &mut stdout.lock())
}

/// Logs go to stderr so command output stays machine-readable.
fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("quill_editor=debug,quill_syntax=debug,quill_language=debug,quill_worker=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();
}
