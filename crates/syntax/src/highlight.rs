//! Rendering-facing projection of tokens.
//!
//! Style tags are a closed set; mapping them to colours is the renderer's
//! business, so nothing here stores presentation state.

use std::ops::Range;

use quill_language::TokenCategory;
use serde::Serialize;

use crate::lexer::{LineCache, Termination};

/// Style tag attached to a highlight span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTag {
	Keyword,
	Identifier,
	String,
	Comment,
	Number,
	Operator,
	Punctuation,
	Text,
	Unknown,
	/// A string or comment that never closes.
	Unterminated,
}

impl StyleTag {
	pub fn for_category(category: TokenCategory) -> Self {
		match category {
			TokenCategory::Keyword => Self::Keyword,
			TokenCategory::Identifier => Self::Identifier,
			TokenCategory::String => Self::String,
			TokenCategory::Comment => Self::Comment,
			TokenCategory::Number => Self::Number,
			TokenCategory::Operator => Self::Operator,
			TokenCategory::Punctuation => Self::Punctuation,
			TokenCategory::Text => Self::Text,
			TokenCategory::Unknown => Self::Unknown,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Keyword => "keyword",
			Self::Identifier => "identifier",
			Self::String => "string",
			Self::Comment => "comment",
			Self::Number => "number",
			Self::Operator => "operator",
			Self::Punctuation => "punctuation",
			Self::Text => "text",
			Self::Unknown => "unknown",
			Self::Unterminated => "unterminated",
		}
	}
}

/// A styled byte range within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
	pub line: usize,
	/// Start byte offset (inclusive).
	pub start: u32,
	/// End byte offset (exclusive).
	pub end: u32,
	pub style: StyleTag,
}

impl HighlightSpan {
	pub fn range(&self) -> Range<u32> {
		self.start..self.end
	}

	pub fn len(&self) -> u32 {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.start >= self.end
	}
}

impl LineCache {
	/// Highlight spans for `lines`, clamped to the document.
	///
	/// A multi-line construct still open on the last line is styled
	/// [`StyleTag::Unterminated`], as is any single-line construct cut off by
	/// the end of its line.
	pub fn highlights(&self, lines: Range<usize>) -> Vec<HighlightSpan> {
		let last = self.len().saturating_sub(1);
		let lines = lines.start.min(self.len())..lines.end.min(self.len());
		lines
			.flat_map(|idx| self.tokens(idx))
			.map(|token| {
				let unterminated = match token.termination {
					Termination::Closed => false,
					Termination::Unterminated => true,
					Termination::Continues => token.line == last,
				};
				HighlightSpan {
					line: token.line,
					start: token.start,
					end: token.end,
					style: if unterminated {
						StyleTag::Unterminated
					} else {
						StyleTag::for_category(token.category)
					},
				}
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use quill_language::LanguageLoader;
	use quill_primitives::Document;

	use super::*;
	use crate::lexer::lex_document;

	fn styles(spans: &[HighlightSpan]) -> Vec<(usize, &'static str)> {
		spans.iter().map(|s| (s.line, s.style.as_str())).collect()
	}

	#[test]
	fn open_comment_at_end_of_document_is_unterminated() {
		let loader = LanguageLoader::from_embedded();
		let c = loader.grammar_for("c").unwrap();
		let doc = Document::new("x;\n/* never\nclosed");
		let cache = lex_document(&c, &doc);
		assert_eq!(
			styles(&cache.highlights(0..3)),
			[
				(0, "identifier"),
				(0, "punctuation"),
				(1, "comment"),
				(2, "unterminated"),
			]
		);
	}

	#[test]
	fn range_is_clamped_to_document() {
		let loader = LanguageLoader::from_embedded();
		let py = loader.grammar_for("python").unwrap();
		let doc = Document::new("pass\n'oops");
		let cache = lex_document(&py, &doc);
		let spans = cache.highlights(1..40);
		assert_eq!(styles(&spans), [(1, "unterminated")]);
		assert_eq!(spans[0].range(), 0..5);
		assert!(cache.highlights(7..9).is_empty());
	}
}
