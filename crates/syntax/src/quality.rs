//! Coarse complexity and maintainability ratings.
//!
//! Counts branching constructs from the token stream; no parsing involved.
//! The score is capped, so it ranks documents roughly rather than measuring
//! them.

use quill_language::TokenCategory;
use quill_primitives::Document;
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::lexer::LineCache;

/// Keywords and operators that each add one branch or unit of nesting.
const BRANCHING: &[&str] = &[
	"if", "elif", "for", "while", "switch", "match", "try", "catch", "except", "finally", "class", "def", "function", "fn",
	"func", "async", "await", "=>",
];
/// Callback-taking calls, counted when followed by `(`.
const HIGHER_ORDER: &[&str] = &["map", "filter", "reduce", "forEach"];

const MAX_CONSTRUCTS: u32 = 20;
/// Lines beyond this add one point per ten lines.
const LONG_DOCUMENT: usize = 50;
pub const MAX_COMPLEXITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Maintainability {
	Excellent,
	Good,
	Fair,
	Poor,
}

impl Maintainability {
	pub fn assess(issues: usize, complexity: u32) -> Self {
		if issues > 10 || complexity > 80 {
			Self::Poor
		} else if issues > 5 || complexity > 50 {
			Self::Fair
		} else if issues > 2 || complexity > 30 {
			Self::Good
		} else {
			Self::Excellent
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualitySummary {
	/// 0 to [`MAX_COMPLEXITY`].
	pub complexity: u32,
	pub maintainability: Maintainability,
}

impl QualitySummary {
	/// Rates `doc` from its lexed lines and the diagnostics already found in it.
	pub fn assess(doc: &Document, cache: &LineCache, diagnostics: &[Diagnostic]) -> Self {
		let complexity = complexity_score(doc, cache);
		Self {
			complexity,
			maintainability: Maintainability::assess(diagnostics.len(), complexity),
		}
	}
}

/// Branching constructs (capped) plus a penalty for long documents.
pub fn complexity_score(doc: &Document, cache: &LineCache) -> u32 {
	let mut constructs = 0u32;
	for (line, lexed) in cache.lines().enumerate() {
		let text = doc.line(line).unwrap_or_default();
		let code: Vec<(TokenCategory, &str)> = lexed
			.tokens
			.iter()
			.filter(|t| !matches!(t.category, TokenCategory::Comment | TokenCategory::String))
			.map(|t| (t.category, t.text(&text)))
			.collect();

		for (i, &(category, word)) in code.iter().enumerate() {
			let branching = matches!(category, TokenCategory::Keyword | TokenCategory::Operator) && BRANCHING.contains(&word);
			let call = category == TokenCategory::Identifier
				&& HIGHER_ORDER.contains(&word)
				&& code.get(i + 1).is_some_and(|&(_, next)| next == "(");
			if branching || call {
				constructs += 1;
			}
		}
	}

	let length_penalty = (cache.len().saturating_sub(LONG_DOCUMENT) / 10) as u32;
	(constructs.min(MAX_CONSTRUCTS) + length_penalty).min(MAX_COMPLEXITY)
}
