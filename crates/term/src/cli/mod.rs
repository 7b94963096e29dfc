//! CLI schema and parsing helpers for the quill binary.

use std::ops::Range;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `path`, `path:line` or `path:line:col` as typed on the command line.
///
/// Positions are 1-indexed on input and stored 0-indexed. A suffix that is
/// not a positive number stays part of the path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLocation {
	pub path: PathBuf,
	pub line: Option<usize>,
	/// `None` puts the cursor at the end of the line.
	pub column: Option<usize>,
}

impl FileLocation {
	pub fn parse(s: &str) -> Self {
		let Some((head, last)) = split_position(s) else {
			return Self {
				path: PathBuf::from(s),
				..Self::default()
			};
		};
		match split_position(head) {
			Some((path, line)) => Self {
				path: PathBuf::from(path),
				line: Some(line),
				column: Some(last),
			},
			None => Self {
				path: PathBuf::from(head),
				line: Some(last),
				column: None,
			},
		}
	}
}

/// Splits a trailing `:N` off `s`, returning `N - 1`.
fn split_position(s: &str) -> Option<(&str, usize)> {
	let (head, tail) = s.rsplit_once(':')?;
	let n = tail.parse::<usize>().ok().filter(|&n| n > 0)?;
	(!head.is_empty()).then_some((head, n - 1))
}

/// Parses `A..B` (1-indexed, inclusive) into a 0-indexed line range.
pub fn parse_line_range(s: &str) -> Result<Range<usize>, String> {
	let (start, end) = s.split_once("..").ok_or_else(|| format!("expected A..B, got `{s}`"))?;
	let start: usize = start.trim().parse().map_err(|_| format!("invalid start line `{start}`"))?;
	let end: usize = end.trim().parse().map_err(|_| format!("invalid end line `{end}`"))?;
	if start == 0 || end < start {
		return Err(format!("line range `{s}` is empty or not 1-indexed"));
	}
	Ok(start - 1..end)
}

#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Syntax analysis and completion for source files")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (TOML).
	#[arg(long, global = true, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging (overridden by QUILL_LOG).
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// List registered languages and any grammar load errors
	Languages,
	/// Print highlight spans as `line:start-end style`
	Highlight {
		/// Source file.
		file: PathBuf,
		/// Language tag (detected from the path or contents if omitted).
		#[arg(long)]
		lang: Option<String>,
		/// Only these lines, `A..B` (1-indexed, inclusive).
		#[arg(long, value_parser = parse_line_range)]
		lines: Option<Range<usize>>,
	},
	/// Print ranked completion candidates at a position
	Complete {
		/// Source file; supports path:line and path:line:col.
		file: String,
		/// Line number (1-indexed); takes precedence over a `:line` suffix.
		#[arg(short, long)]
		line: Option<usize>,
		/// Column (1-indexed); defaults to the end of the line.
		#[arg(short, long)]
		column: Option<usize>,
		/// Prefix to complete (defaults to the word before the cursor).
		#[arg(short, long)]
		prefix: Option<String>,
		/// Language tag (detected from the path or contents if omitted).
		#[arg(long)]
		lang: Option<String>,
	},
	/// Print the assistant context for a file as JSON
	Context {
		/// Source file.
		file: PathBuf,
		/// Language tag (detected from the path or contents if omitted).
		#[arg(long)]
		lang: Option<String>,
		/// Leave out the symbol summary and diagnostics.
		#[arg(long)]
		no_summary: bool,
	},
}
