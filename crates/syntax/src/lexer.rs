//! Incremental line lexer.
//!
//! Each line is lexed from the [`LexState`] left by the line above. The state
//! is the only thing a line inherits, so after an edit only the touched lines
//! are relexed, plus any following lines whose incoming state changed. The
//! pass stops at the first line whose recorded incoming state matches again.

use std::ops::Range;
use std::sync::Arc;

use quill_language::{Delimiter, Grammar, Rule, TokenCategory};
use quill_primitives::{Document, LineSplice};
use tracing::trace;

use crate::{Cancelled, Checkpoint};

/// Carry-over state between lines.
///
/// Holds the index of the multi-line delimited rule that is still open at the
/// end of a line, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LexState(Option<u32>);

impl LexState {
	pub const INITIAL: Self = Self(None);

	pub fn is_initial(self) -> bool {
		self.0.is_none()
	}

	/// Index of the open delimited rule in [`Grammar::rules`].
	pub fn open_rule(self) -> Option<usize> {
		self.0.map(|idx| idx as usize)
	}

	fn inside(rule: usize) -> Self {
		Self(Some(rule as u32))
	}
}

/// How a token ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
	Closed,
	/// Multi-line construct still open at the end of its line.
	Continues,
	/// Single-line construct cut off by the end of its line.
	Unterminated,
}

/// A token within a single line. Offsets are byte offsets into the line text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
	pub category: TokenCategory,
	pub start: u32,
	pub end: u32,
	pub termination: Termination,
}

impl TokenSpan {
	pub fn range(&self) -> Range<usize> {
		self.start as usize..self.end as usize
	}

	/// Slices the token's text out of its line.
	pub fn text<'a>(&self, line: &'a str) -> &'a str {
		line.get(self.range()).unwrap_or_default()
	}
}

/// A token positioned in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
	pub category: TokenCategory,
	pub start: u32,
	pub end: u32,
	pub line: usize,
	pub termination: Termination,
}

/// Lexing result for one line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexedLine {
	pub tokens: Vec<TokenSpan>,
	/// State inherited from the line above.
	pub start_state: LexState,
	/// State handed to the line below.
	pub end_state: LexState,
}

/// Lexed lines of a document, shared per line so passes can reuse them.
#[derive(Debug, Clone, Default)]
pub struct LineCache {
	lines: Vec<Arc<LexedLine>>,
}

/// Result of [`relex`].
#[derive(Debug, Clone)]
pub struct RelexOutcome {
	pub cache: LineCache,
	/// Lines (new numbering) whose tokens were re-derived.
	pub dirty: Range<usize>,
	pub lines_lexed: usize,
}

impl LineCache {
	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn line(&self, idx: usize) -> Option<&LexedLine> {
		self.lines.get(idx).map(Arc::as_ref)
	}

	pub fn lines(&self) -> impl Iterator<Item = &LexedLine> {
		self.lines.iter().map(Arc::as_ref)
	}

	/// Tokens of line `idx` with their line number attached.
	pub fn tokens(&self, idx: usize) -> impl Iterator<Item = Token> + '_ {
		self.line(idx).into_iter().flat_map(move |lexed| {
			lexed.tokens.iter().map(move |t| Token {
				category: t.category,
				start: t.start,
				end: t.end,
				line: idx,
				termination: t.termination,
			})
		})
	}

	/// Whether two caches hold the same tokens and states on every line.
	pub fn same_tokens(&self, other: &LineCache) -> bool {
		self.len() == other.len() && self.lines().zip(other.lines()).all(|(a, b)| a == b)
	}

	/// Whether `self` shares line `idx` with `other` without having relexed it.
	pub fn shares_line(&self, other: &LineCache, idx: usize) -> bool {
		match (self.lines.get(idx), other.lines.get(idx)) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

/// Lexes one line of text starting in `state`.
///
/// Never fails: characters no rule matches become single-character
/// [`TokenCategory::Unknown`] tokens.
pub fn lex_line(grammar: &Grammar, text: &str, state: LexState) -> LexedLine {
	let mut tokens = Vec::new();
	let mut pos = 0;
	let mut end_state = LexState::INITIAL;

	if let Some(rule_idx) = state.open_rule()
		&& let Some(Rule::Delimited(delim)) = grammar.rules().get(rule_idx)
	{
		match find_close(text, 0, delim) {
			Some(end) => {
				push(&mut tokens, delim.category, 0, end, Termination::Closed);
				pos = end;
			}
			None => {
				push(&mut tokens, delim.category, 0, text.len(), Termination::Continues);
				return LexedLine {
					tokens,
					start_state: state,
					end_state: state,
				};
			}
		}
	}

	while pos < text.len() {
		let rest = &text[pos..];
		let Some(ch) = rest.chars().next() else { break };
		if ch.is_whitespace() {
			pos += ch.len_utf8();
			continue;
		}

		match longest_match(grammar, text, pos) {
			Some(m) => {
				push(&mut tokens, m.category, pos, pos + m.len, m.termination);
				pos += m.len;
				if let Some(rule) = m.opens {
					end_state = LexState::inside(rule);
				}
			}
			None => {
				push(&mut tokens, TokenCategory::Unknown, pos, pos + ch.len_utf8(), Termination::Closed);
				pos += ch.len_utf8();
			}
		}
	}

	LexedLine {
		tokens,
		start_state: state,
		end_state,
	}
}

fn push(tokens: &mut Vec<TokenSpan>, category: TokenCategory, start: usize, end: usize, termination: Termination) {
	if end > start {
		tokens.push(TokenSpan {
			category,
			start: start as u32,
			end: end as u32,
			termination,
		});
	}
}

struct RuleMatch {
	category: TokenCategory,
	len: usize,
	termination: Termination,
	opens: Option<usize>,
}

/// Tries every rule at `pos`; the longest match wins, ties go to the earlier rule.
fn longest_match(grammar: &Grammar, text: &str, pos: usize) -> Option<RuleMatch> {
	let rest = &text[pos..];
	let mut best: Option<RuleMatch> = None;

	for (idx, rule) in grammar.rules().iter().enumerate() {
		let candidate = match rule {
			Rule::Keywords => {
				let word_len = rest
					.char_indices()
					.find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
					.map_or(rest.len(), |(i, _)| i);
				(word_len > 0 && grammar.is_keyword(&rest[..word_len])).then_some(RuleMatch {
					category: TokenCategory::Keyword,
					len: word_len,
					termination: Termination::Closed,
					opens: None,
				})
			}
			Rule::Pattern { category, regex } => regex.find(rest).filter(|m| m.start() == 0 && m.end() > 0).map(|m| RuleMatch {
				category: *category,
				len: m.end(),
				termination: Termination::Closed,
				opens: None,
			}),
			Rule::Delimited(delim) => rest.starts_with(delim.open.as_str()).then(|| {
				let body = pos + delim.open.len();
				match find_close(text, body, delim) {
					Some(end) => RuleMatch {
						category: delim.category,
						len: end - pos,
						termination: Termination::Closed,
						opens: None,
					},
					None if delim.multiline => RuleMatch {
						category: delim.category,
						len: rest.len(),
						termination: Termination::Continues,
						opens: Some(idx),
					},
					None => RuleMatch {
						category: delim.category,
						len: rest.len(),
						termination: Termination::Unterminated,
						opens: None,
					},
				}
			}),
		};

		if let Some(candidate) = candidate
			&& best.as_ref().is_none_or(|b| candidate.len > b.len)
		{
			best = Some(candidate);
		}
	}

	best
}

/// Finds the end offset (exclusive) of `delim.close` at or after `from`,
/// honouring the escape character.
fn find_close(text: &str, from: usize, delim: &Delimiter) -> Option<usize> {
	let mut chars = text.get(from..)?.char_indices();
	while let Some((off, c)) = chars.next() {
		if delim.escape == Some(c) {
			chars.next();
			continue;
		}
		let at = from + off;
		if text[at..].starts_with(delim.close.as_str()) {
			return Some(at + delim.close.len());
		}
	}
	None
}

/// Lexes a whole document from scratch.
pub fn lex_document(grammar: &Grammar, doc: &Document) -> LineCache {
	let mut lines = Vec::with_capacity(doc.line_count());
	let mut state = LexState::INITIAL;
	for idx in 0..doc.line_count() {
		let lexed = lex_line(grammar, &doc.line(idx).unwrap_or_default(), state);
		state = lexed.end_state;
		lines.push(Arc::new(lexed));
	}
	LineCache { lines }
}

/// Relexes `doc` after the edits summarised by `splice`.
///
/// `prev` must be the cache for the document before the splice. Lines
/// `splice.start..splice.new_end` are always relexed; following lines are
/// relexed while their recorded incoming state differs from the state the
/// line above now hands down. Everything else is shared with `prev`.
///
/// When `prev` does not line up with the splice (e.g. first analysis of a
/// document) the whole document is lexed.
pub fn relex(
	grammar: &Grammar,
	doc: &Document,
	prev: &LineCache,
	splice: LineSplice,
	checkpoint: &impl Checkpoint,
) -> Result<RelexOutcome, Cancelled> {
	let line_count = doc.line_count();
	let aligned = splice.old_end <= prev.len()
		&& splice.new_end <= line_count
		&& prev.len() as isize + splice.line_delta() == line_count as isize;

	if !aligned {
		trace!(prev_lines = prev.len(), line_count, ?splice, "lexer.relex.full");
		return relex_range(grammar, doc, &LineCache::default(), LineSplice::new(0, 0, line_count), checkpoint);
	}
	relex_range(grammar, doc, prev, splice, checkpoint)
}

fn relex_range(
	grammar: &Grammar,
	doc: &Document,
	prev: &LineCache,
	splice: LineSplice,
	checkpoint: &impl Checkpoint,
) -> Result<RelexOutcome, Cancelled> {
	let line_count = doc.line_count();
	let mut lines: Vec<Arc<LexedLine>> = Vec::with_capacity(line_count);
	lines.extend(prev.lines[..splice.start].iter().cloned());

	let mut state = lines.last().map_or(LexState::INITIAL, |l| l.end_state);
	let mut lines_lexed = 0;
	let mut idx = splice.start;

	let mut lex_next = |idx: usize, state: LexState, lines: &mut Vec<Arc<LexedLine>>| -> Result<LexState, Cancelled> {
		checkpoint.check()?;
		let lexed = lex_line(grammar, &doc.line(idx).unwrap_or_default(), state);
		let end = lexed.end_state;
		lines.push(Arc::new(lexed));
		lines_lexed += 1;
		Ok(end)
	};

	while idx < splice.new_end {
		state = lex_next(idx, state, &mut lines)?;
		idx += 1;
	}

	let mut old_idx = splice.old_end;
	while idx < line_count {
		match prev.lines.get(old_idx) {
			Some(cached) if cached.start_state == state => break,
			_ => {}
		}
		state = lex_next(idx, state, &mut lines)?;
		idx += 1;
		old_idx += 1;
	}
	let dirty = splice.start..idx;

	if idx < line_count {
		lines.extend(prev.lines[old_idx..].iter().cloned());
	}
	debug_assert_eq!(lines.len(), line_count);

	trace!(dirty = ?dirty, lines_lexed, "lexer.relex");
	Ok(RelexOutcome {
		cache: LineCache { lines },
		dirty,
		lines_lexed,
	})
}
