//! Token-level findings for the assistant summary.
//!
//! A pure scan over already-lexed lines: work markers in comments, string
//! literals assigned to credential-like names, constructs that never close,
//! and the grammar's own [`Lint`]s.

use std::sync::LazyLock;

use quill_language::{Grammar, Lint, LintStep, TokenCategory};
use quill_primitives::Document;
use regex::Regex;
use serde::Serialize;

pub use quill_language::Severity;

use crate::lexer::{LineCache, Termination};

static MARKER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\b(TODO|FIXME|XXX|HACK)\b:?\s*(.*)").expect("marker pattern is valid"));
static CREDENTIAL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)(password|passwd|secret|api_?key|token)$").expect("credential pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
	pub severity: Severity,
	pub message: String,
	pub line: usize,
	/// Character column.
	pub column: usize,
}

/// A non-comment token with its text resolved.
#[derive(Debug, Clone, Copy)]
struct Lexeme<'a> {
	category: TokenCategory,
	text: &'a str,
	line: usize,
	column: usize,
}

/// Scans every lexed line of `doc`, ordered by position.
///
/// Never lexes; `cache` must match `doc` and come from `grammar`.
pub fn scan(grammar: &Grammar, doc: &Document, cache: &LineCache) -> Vec<Diagnostic> {
	let last = cache.len().saturating_sub(1);
	let texts: Vec<String> = (0..cache.len()).map(|line| doc.line(line).unwrap_or_default()).collect();
	let mut out = Vec::new();
	let mut lexemes = Vec::new();

	for ((line, lexed), text) in cache.lines().enumerate().zip(&texts) {
		for token in &lexed.tokens {
			let column = text.get(..token.start as usize).map_or(0, |head| head.chars().count());
			let token_text = token.text(text);

			if token.category == TokenCategory::Comment {
				if let Some(caps) = MARKER.captures(token_text) {
					let detail = caps.get(2).map_or("", |m| m.as_str()).trim();
					let marker = &caps[1];
					out.push(Diagnostic {
						severity: Severity::Warning,
						message: if detail.is_empty() {
							format!("{marker} marker")
						} else {
							format!("{marker}: {detail}")
						},
						line,
						column,
					});
				}
			} else {
				lexemes.push(Lexeme {
					category: token.category,
					text: token_text,
					line,
					column,
				});
			}

			let open_at_end = token.termination == Termination::Continues && line == last;
			if token.termination == Termination::Unterminated || open_at_end {
				out.push(Diagnostic {
					severity: Severity::Error,
					message: format!("unterminated {}", token.category.as_str()),
					line,
					column,
				});
			}
		}
	}

	credentials(&lexemes, &mut out);
	for lint in grammar.lints() {
		for start in 0..lexemes.len() {
			if matches_at(&lint.steps, &lexemes, start) {
				out.push(lint_hit(lint, &lexemes[start]));
			}
		}
	}

	out.sort_by_key(|d| (d.line, d.column));
	out
}

/// `name = "literal"` on one line, where the name looks like a credential and
/// the literal is long enough to be a real one.
fn credentials(lexemes: &[Lexeme<'_>], out: &mut Vec<Diagnostic>) {
	for window in lexemes.windows(3) {
		let [name, op, value] = window else { continue };
		if name.category != TokenCategory::Identifier
			|| value.category != TokenCategory::String
			|| name.line != value.line
			|| !matches!(op.text, "=" | ":=" | ":")
		{
			continue;
		}
		let Some(caps) = CREDENTIAL.captures(name.text) else { continue };
		if literal_len(value.text) < min_credential_len(&caps[1]) {
			continue;
		}
		out.push(Diagnostic {
			severity: Severity::Security,
			message: format!("possible hardcoded credential in `{}`", name.text),
			line: name.line,
			column: name.column,
		});
	}
}

fn min_credential_len(kind: &str) -> usize {
	match kind.to_ascii_lowercase().as_str() {
		"secret" => 8,
		"token" => 20,
		"apikey" | "api_key" => 10,
		_ => 3,
	}
}

/// Characters between the quotes of a string token.
fn literal_len(text: &str) -> usize {
	text.trim_matches(|c| matches!(c, '"' | '\'' | '`')).chars().count()
}

fn matches_at(steps: &[LintStep], lexemes: &[Lexeme<'_>], at: usize) -> bool {
	let Some((step, rest)) = steps.split_first() else {
		return true;
	};
	match step {
		LintStep::Gap => {
			let Some(line) = at.checked_sub(1).map(|prev| lexemes[prev].line) else {
				return false;
			};
			lexemes[at..]
				.iter()
				.take_while(|l| l.line == line)
				.enumerate()
				.any(|(skipped, _)| matches_at(rest, lexemes, at + skipped))
		}
		_ => lexemes.get(at).is_some_and(|l| step_matches(step, l)) && matches_at(rest, lexemes, at + 1),
	}
}

fn step_matches(step: &LintStep, lexeme: &Lexeme<'_>) -> bool {
	match step {
		LintStep::Text(text) => lexeme.text == text.as_str(),
		LintStep::Pattern(re) => re.is_match(lexeme.text),
		LintStep::Category(category) => lexeme.category == *category,
		LintStep::Gap => true,
	}
}

fn lint_hit(lint: &Lint, first: &Lexeme<'_>) -> Diagnostic {
	Diagnostic {
		severity: lint.severity,
		message: lint.message.clone(),
		line: first.line,
		column: first.column,
	}
}
