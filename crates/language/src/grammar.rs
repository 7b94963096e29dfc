//! Compiled lexical grammars.
//!
//! A grammar is pure data: an ordered list of [`Rule`]s drawn from a closed
//! set of rule kinds, a keyword list, and the declaration/scope hints used by
//! the symbol indexer. There is no per-language code; adding a language means
//! adding a definition entry.

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Lexical token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
	Keyword,
	Identifier,
	String,
	Comment,
	Number,
	Operator,
	Punctuation,
	/// Plain-text fallback category.
	Text,
	/// A character no rule matched.
	Unknown,
}

impl TokenCategory {
	/// Parses a category name as written in grammar definitions.
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"keyword" => Self::Keyword,
			"identifier" => Self::Identifier,
			"string" => Self::String,
			"comment" => Self::Comment,
			"number" => Self::Number,
			"operator" => Self::Operator,
			"punctuation" => Self::Punctuation,
			"text" => Self::Text,
			"unknown" => Self::Unknown,
			_ => return None,
		})
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
		}
	}
}

/// Declaration kind attached to indexed symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
	Variable,
	Function,
	Type,
	Unknown,
}

impl SymbolKind {
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"variable" => Self::Variable,
			"function" => Self::Function,
			"type" => Self::Type,
			"unknown" => Self::Unknown,
			_ => return None,
		})
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Variable => "variable",
			Self::Function => "function",
			Self::Type => "type",
			Self::Unknown => "unknown",
		}
	}
}

/// How serious a diagnostic is, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	Error,
	Security,
	Warning,
	Performance,
	Info,
}

impl Severity {
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"error" => Self::Error,
			"security" => Self::Security,
			"warning" => Self::Warning,
			"performance" => Self::Performance,
			"info" => Self::Info,
			_ => return None,
		})
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Error => "error",
			Self::Security => "security",
			Self::Warning => "warning",
			Self::Performance => "performance",
			Self::Info => "info",
		}
	}
}

/// One element of a [`Lint`] token pattern.
#[derive(Debug, Clone)]
pub enum LintStep {
	/// Token text equal to the literal.
	Text(String),
	/// Token text fully matched by the regex.
	Pattern(Regex),
	/// Any token of the category.
	Category(TokenCategory),
	/// Any run of tokens, possibly empty, on the line of the previous token.
	Gap,
}

/// A check over consecutive non-comment tokens.
///
/// Matching works on whole tokens, so text inside string literals and
/// comments never triggers a step that expects code.
#[derive(Debug, Clone)]
pub struct Lint {
	pub severity: Severity,
	pub message: String,
	/// Never empty; never starts or ends with [`LintStep::Gap`].
	pub steps: Vec<LintStep>,
}

/// How nested scopes are delimited in a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeStyle {
	/// `{` opens a scope and `}` closes it.
	#[default]
	Braces,
	/// Deeper indentation opens a scope; dedenting closes it.
	Indent,
}

/// A delimiter pair such as a string literal or block comment.
#[derive(Debug, Clone)]
pub struct Delimiter {
	pub category: TokenCategory,
	pub open: String,
	pub close: String,
	/// Character that makes the following character literal.
	pub escape: Option<char>,
	/// Whether the construct may continue onto the next line.
	pub multiline: bool,
}

/// One lexical matching rule.
///
/// Rules are tried in order at each position; the longest match wins and
/// ties go to the earlier rule.
#[derive(Debug, Clone)]
pub enum Rule {
	/// Matches a whole word from the grammar's keyword list.
	Keywords,
	/// Matches an anchored regular expression.
	Pattern { category: TokenCategory, regex: Regex },
	/// Matches a delimiter pair, possibly spanning lines.
	Delimited(Delimiter),
}

/// A compiled, immutable lexical grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
	pub(crate) name: String,
	pub(crate) aliases: Vec<String>,
	pub(crate) extensions: Vec<String>,
	pub(crate) shebangs: Vec<String>,
	pub(crate) scope: ScopeStyle,
	/// Sorted and deduplicated.
	pub(crate) keywords: Vec<String>,
	pub(crate) declarations: FxHashMap<String, SymbolKind>,
	pub(crate) assignment_declares: bool,
	pub(crate) indent_after: Vec<String>,
	pub(crate) rules: Vec<Rule>,
	pub(crate) lints: Vec<Lint>,
	pub(crate) detect: Vec<Regex>,
}

impl Grammar {
	/// Name of the built-in fallback grammar.
	pub const PLAIN_TEXT: &'static str = "text";

	/// The plain-text grammar: every non-empty line is a single `text` token.
	pub fn plain_text() -> Self {
		Self {
			name: Self::PLAIN_TEXT.to_string(),
			aliases: vec!["plain".to_string(), "plaintext".to_string()],
			extensions: vec!["txt".to_string()],
			shebangs: Vec::new(),
			scope: ScopeStyle::Braces,
			keywords: Vec::new(),
			declarations: FxHashMap::default(),
			assignment_declares: false,
			indent_after: Vec::new(),
			rules: vec![Rule::Pattern {
				category: TokenCategory::Text,
				regex: Regex::new(r"^.+").expect("plain-text pattern is valid"),
			}],
			lints: Vec::new(),
			detect: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn aliases(&self) -> &[String] {
		&self.aliases
	}

	pub fn extensions(&self) -> &[String] {
		&self.extensions
	}

	pub fn shebangs(&self) -> &[String] {
		&self.shebangs
	}

	/// Extension used when the document has to be written out, e.g. for execution.
	pub fn primary_extension(&self) -> &str {
		self.extensions.first().map(String::as_str).unwrap_or("txt")
	}

	pub fn is_plain_text(&self) -> bool {
		self.name == Self::PLAIN_TEXT
	}

	pub fn scope_style(&self) -> ScopeStyle {
		self.scope
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	/// Token-sequence checks run by the diagnostics scan.
	pub fn lints(&self) -> &[Lint] {
		&self.lints
	}

	/// Keywords in lexicographic order.
	pub fn keywords(&self) -> &[String] {
		&self.keywords
	}

	pub fn is_keyword(&self, word: &str) -> bool {
		self.keywords.binary_search_by(|k| k.as_str().cmp(word)).is_ok()
	}

	/// Keywords starting with `prefix`, in lexicographic order.
	pub fn keywords_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		let start = self.keywords.partition_point(|k| k.as_str() < prefix);
		self.keywords[start..]
			.iter()
			.map(String::as_str)
			.take_while(move |k| k.starts_with(prefix))
	}

	/// Symbol kind declared by a keyword such as `def` or `struct`.
	pub fn declaration_kind(&self, keyword: &str) -> Option<SymbolKind> {
		self.declarations.get(keyword).copied()
	}

	/// Whether `name = value` at the start of a statement declares `name`.
	pub fn assignment_declares(&self) -> bool {
		self.assignment_declares
	}

	/// Line suffixes after which the next line is indented one level deeper.
	pub fn indent_after(&self) -> &[String] {
		&self.indent_after
	}

	/// Number of detection patterns matching `text`.
	pub fn detection_score(&self, text: &str) -> usize {
		self.detect.iter().filter(|re| re.is_match(text)).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn plain_text_has_single_text_rule() {
		let grammar = Grammar::plain_text();
		assert!(grammar.is_plain_text());
		assert_eq!(grammar.rules().len(), 1);
		assert!(matches!(
			grammar.rules()[0],
			Rule::Pattern {
				category: TokenCategory::Text,
				..
			}
		));
		assert_eq!(grammar.primary_extension(), "txt");
	}

	#[test]
	fn category_names_round_trip() {
		for category in [
			TokenCategory::Keyword,
			TokenCategory::Identifier,
			TokenCategory::String,
			TokenCategory::Comment,
			TokenCategory::Number,
			TokenCategory::Operator,
			TokenCategory::Punctuation,
			TokenCategory::Text,
			TokenCategory::Unknown,
		] {
			assert_eq!(TokenCategory::from_name(category.as_str()), Some(category));
		}
		assert_eq!(TokenCategory::from_name("keywords"), None);
	}

	#[test]
	fn severities_order_from_most_serious() {
		let mut all = [Severity::Info, Severity::Error, Severity::Performance, Severity::Warning, Severity::Security];
		all.sort();
		assert_eq!(all.map(Severity::as_str), ["error", "security", "warning", "performance", "info"]);
		assert!(all.iter().all(|s| Severity::from_name(s.as_str()) == Some(*s)));
	}
}
