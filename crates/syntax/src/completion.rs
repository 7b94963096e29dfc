//! Completion ranking.
//!
//! Candidates come in three tiers: symbols of the innermost scope around the
//! cursor, symbols of the enclosing scopes, then grammar keywords. Within the
//! first tier closer declarations rank higher; in the second, nearer scopes
//! first. Remaining ties are broken by name. Results are deduplicated by text
//! with the best-ranked entry kept.

use quill_language::{Grammar, SymbolKind};
use quill_primitives::Position;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::index::SymbolIndex;

/// Default cap on returned candidates.
pub const DEFAULT_MAX_CANDIDATES: usize = 20;

/// What a candidate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
	Variable,
	Function,
	Type,
	Unknown,
	Keyword,
}

impl CompletionKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Variable => "variable",
			Self::Function => "function",
			Self::Type => "type",
			Self::Unknown => "unknown",
			Self::Keyword => "keyword",
		}
	}
}

impl From<SymbolKind> for CompletionKind {
	fn from(kind: SymbolKind) -> Self {
		match kind {
			SymbolKind::Variable => Self::Variable,
			SymbolKind::Function => Self::Function,
			SymbolKind::Type => Self::Type,
			SymbolKind::Unknown => Self::Unknown,
		}
	}
}

/// A ranked completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
	pub text: String,
	pub kind: CompletionKind,
	/// Higher is better; strictly decreasing along the returned list.
	pub score: u32,
}

/// Ranks completions for `prefix` at `cursor`.
///
/// Pure over the given index: it never lexes, so a stale index yields stale
/// (but consistent) candidates. An empty prefix yields nothing.
pub fn complete(
	index: &SymbolIndex,
	grammar: &Grammar,
	cursor: Position,
	prefix: &str,
	max: usize,
) -> Vec<CompletionCandidate> {
	if prefix.is_empty() || max == 0 {
		return Vec::new();
	}

	let chain = index.scope_chain(cursor);
	let mut ranked: Vec<(usize, usize, usize, &str, CompletionKind)> = index
		.declarations()
		.filter(|(_, d)| d.name.starts_with(prefix))
		.filter(|(line, d)| !is_word_under_cursor(*line, d.column as usize, d.name.chars().count(), cursor))
		.filter_map(|(line, d)| {
			let depth = chain.iter().position(|&s| s == d.scope)?;
			let tier = usize::from(depth > 0);
			Some((tier, depth, line.abs_diff(cursor.line), d.name.as_str(), d.kind.into()))
		})
		.collect();
	ranked.sort_by(|a, b| (a.0, a.1, a.2, a.3).cmp(&(b.0, b.1, b.2, b.3)));

	let symbols = ranked.into_iter().map(|(_, _, _, name, kind)| (name, kind));
	let keywords = grammar.keywords_with_prefix(prefix).map(|k| (k, CompletionKind::Keyword));

	let mut seen = FxHashSet::default();
	let mut out: Vec<CompletionCandidate> = symbols
		.chain(keywords)
		.filter(|(text, _)| seen.insert(*text))
		.take(max)
		.map(|(text, kind)| CompletionCandidate {
			text: text.to_string(),
			kind,
			score: 0,
		})
		.collect();

	let total = out.len() as u32;
	for (rank, candidate) in out.iter_mut().enumerate() {
		candidate.score = total - rank as u32;
	}
	out
}

/// Whether a declaration is the very word the cursor is typing.
fn is_word_under_cursor(line: usize, column: usize, len: usize, cursor: Position) -> bool {
	line == cursor.line && column <= cursor.column && cursor.column <= column + len
}
