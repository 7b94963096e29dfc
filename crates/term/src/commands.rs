//! Subcommand implementations.
//!
//! Each command opens the file in a fresh [`AnalysisManager`] and reads from
//! its published analysis, the same path the interactive editor uses.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use quill_editor::{AnalysisManager, EditorConfig};
use quill_language::LanguageLoader;
use quill_primitives::{DocumentId, Position};

use crate::cli::{Cli, Command, FileLocation};

const DOC: DocumentId = DocumentId(1);

pub fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
	let config = match &cli.config {
		Some(path) => EditorConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))?,
		None => EditorConfig::default(),
	};
	let loader = Arc::new(config.language_loader()?);

	match cli.command {
		Command::Languages => languages(&loader, out),
		Command::Highlight { file, lang, lines } => {
			let mgr = open(&loader, &config, &file, lang.as_deref())?;
			let line_count = mgr.document(DOC).map_or(0, |d| d.line_count());
			for span in mgr.highlights(DOC, lines.unwrap_or(0..line_count))? {
				writeln!(out, "{}:{}-{} {}", span.line + 1, span.start, span.end, span.style.as_str())?;
			}
			Ok(())
		}
		Command::Complete {
			file,
			line,
			column,
			prefix,
			lang,
		} => {
			let location = FileLocation::parse(&file);
			let mgr = open(&loader, &config, &location.path, lang.as_deref())?;
			let line = line
				.map(|l| l.saturating_sub(1))
				.or(location.line)
				.ok_or_else(|| anyhow!("no line given; use --line or path:line"))?;
			let text = mgr
				.document(DOC)
				.and_then(|d| d.line(line))
				.ok_or_else(|| anyhow!("line {} is past the end of {}", line + 1, location.path.display()))?;
			let len = text.chars().count();
			let column = column.map(|c| c.saturating_sub(1)).or(location.column).unwrap_or(len).min(len);
			let prefix = prefix.unwrap_or_else(|| word_before(&text, column));

			for candidate in mgr.complete(DOC, Position::new(line, column), &prefix)? {
				writeln!(out, "{}\t{}\t{}", candidate.score, candidate.kind.as_str(), candidate.text)?;
			}
			Ok(())
		}
		Command::Context { file, lang, no_summary } => {
			let mgr = open(&loader, &config, &file, lang.as_deref())?;
			let context = mgr.assistant_context(DOC, None, !no_summary)?;
			serde_json::to_writer_pretty(&mut *out, &context)?;
			writeln!(out)?;
			Ok(())
		}
	}
}

fn languages(loader: &LanguageLoader, out: &mut impl Write) -> anyhow::Result<()> {
	for grammar in loader.languages() {
		writeln!(
			out,
			"{:<12} aliases: [{}] extensions: [{}]",
			grammar.name(),
			grammar.aliases().join(", "),
			grammar.extensions().join(", ")
		)?;
	}
	for error in loader.load_errors() {
		writeln!(out, "error: {error}")?;
	}
	Ok(())
}

/// Reads `path` and opens it, resolving the language from `lang`, then the
/// file extension, then the contents.
fn open(loader: &Arc<LanguageLoader>, config: &EditorConfig, path: &Path, lang: Option<&str>) -> anyhow::Result<AnalysisManager> {
	let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
	let tag = match lang {
		Some(tag) => {
			if let Err(error) = loader.grammar_for(tag) {
				tracing::warn!(%error, "falling back to plain text");
			}
			tag.to_string()
		}
		None => match loader.language_for_path(path).and_then(|id| loader.get(id)) {
			Some(grammar) => grammar.name().to_string(),
			None => loader.detect_or_plain(&text).name().to_string(),
		},
	};

	let mut mgr = AnalysisManager::new(Arc::clone(loader), config);
	mgr.open(DOC, &text, Some(&tag))?;
	Ok(mgr)
}

/// Identifier characters immediately before `column`.
fn word_before(line: &str, column: usize) -> String {
	let head: Vec<char> = line.chars().take(column).collect();
	let start = head
		.iter()
		.rposition(|c| !(c.is_alphanumeric() || *c == '_'))
		.map_or(0, |i| i + 1);
	head[start..].iter().collect()
}
