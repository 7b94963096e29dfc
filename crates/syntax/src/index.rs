//! Best-effort local symbol index.
//!
//! Identifiers are classified with positional heuristics over each line's
//! tokens; there is no parser. Scopes are tracked with a per-line stack of
//! frames (brace depth or indentation). Each line keeps the stack it starts
//! and ends with, the scopes it opened and the symbols it declares, so an
//! update rescans dirty lines and then only the lines whose incoming stack
//! changed, replacing each line's record wholesale.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use quill_language::{Grammar, ScopeStyle, SymbolKind, TokenCategory};
use quill_primitives::{Document, LineSplice, Position};
use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use tracing::trace;

use crate::lexer::{LexedLine, LineCache, TokenSpan};
use crate::{Cancelled, Checkpoint, NeverCancel};

/// Identifier of a lexical scope. Assigned monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
	/// The document's outermost scope.
	pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
	id: ScopeId,
	/// Indentation width of the scope body; zero for brace scopes.
	indent: u32,
}

type ScopeStack = SmallVec<[Frame; 8]>;

fn root_stack() -> ScopeStack {
	smallvec![Frame {
		id: ScopeId::ROOT,
		indent: 0,
	}]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeEvent {
	Push(ScopeId),
	Pop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
	pub(crate) name: String,
	pub(crate) kind: SymbolKind,
	/// Character column.
	pub(crate) column: u32,
	pub(crate) scope: ScopeId,
}

#[derive(Debug, Clone, Default)]
struct LineRecord {
	entry: ScopeStack,
	exit: ScopeStack,
	/// Scopes opened on this line, in order.
	opened: SmallVec<[ScopeId; 2]>,
	/// Brace events keyed by character column, for mid-line scope queries.
	events: SmallVec<[(u32, ScopeEvent); 2]>,
	declarations: Vec<Declaration>,
}

/// An indexed declaration site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
	pub name: String,
	pub kind: SymbolKind,
	pub line: usize,
	/// Character column of the name.
	pub column: usize,
	pub scope: ScopeId,
}

/// Outcome of [`SymbolIndex::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	Symbol(Symbol),
	Keyword,
}

/// Declared names grouped by kind, for the assistant context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolSummary {
	pub functions: Vec<String>,
	pub types: Vec<String>,
	pub variables: Vec<String>,
}

/// Symbols of one document, one record per line.
#[derive(Debug, Clone)]
pub struct SymbolIndex {
	lines: Vec<Arc<LineRecord>>,
	style: ScopeStyle,
	next_scope: u32,
}

impl Default for SymbolIndex {
	fn default() -> Self {
		Self {
			lines: Vec::new(),
			style: ScopeStyle::default(),
			next_scope: 1,
		}
	}
}

impl SymbolIndex {
	/// Indexes a whole document.
	pub fn build(grammar: &Grammar, doc: &Document, cache: &LineCache) -> Self {
		let lines = cache.len();
		match Self::default().update(grammar, doc, cache, LineSplice::new(0, 0, lines), 0..lines, &NeverCancel) {
			Ok(index) => index,
			Err(Cancelled) => unreachable!("NeverCancel never cancels"),
		}
	}

	/// Rescans the lines affected by a relex and returns the new index.
	///
	/// `splice` is the line splice the lexer was given and `dirty` the range it
	/// relexed. Lines after both are rescanned only while their recorded
	/// incoming scope stack differs from the one the line above now produces.
	/// `self` is left untouched, so a cancelled update has no effect.
	pub fn update(
		&self,
		grammar: &Grammar,
		doc: &Document,
		cache: &LineCache,
		splice: LineSplice,
		dirty: Range<usize>,
		checkpoint: &impl Checkpoint,
	) -> Result<Self, Cancelled> {
		let line_count = cache.len();
		let aligned = self.style == grammar.scope_style()
			&& splice.old_end <= self.lines.len()
			&& splice.new_end <= line_count
			&& self.lines.len() as isize + splice.line_delta() == line_count as isize;
		let (splice, dirty) = if aligned {
			(splice, dirty)
		} else {
			(LineSplice::new(0, 0, line_count), 0..line_count)
		};
		let old: &[Arc<LineRecord>] = if aligned { &self.lines } else { &[] };
		let rescan_end = splice.new_end.max(dirty.end).min(line_count);

		let old_for = |idx: usize| {
			if idx < splice.new_end {
				if idx < splice.old_end { old.get(idx) } else { None }
			} else {
				old.get(idx - splice.new_end + splice.old_end)
			}
		};

		let mut lines: Vec<Arc<LineRecord>> = Vec::with_capacity(line_count);
		lines.extend(old[..splice.start].iter().cloned());
		let mut stack = lines.last().map_or_else(root_stack, |r| r.exit.clone());
		let mut next_scope = self.next_scope;
		let mut scanned = 0usize;

		let mut idx = splice.start;
		while idx < line_count {
			let previous = old_for(idx);
			if idx >= rescan_end
				&& let Some(previous) = previous
				&& previous.entry == stack
			{
				break;
			}
			checkpoint.check()?;

			let Some(lexed) = cache.line(idx) else { break };
			let text = doc.line(idx).unwrap_or_default();
			let reuse = previous.map_or(&[][..], |p| p.opened.as_slice());
			let record = scan_line(grammar, &text, lexed, &stack, reuse, &mut next_scope);
			stack = record.exit.clone();
			lines.push(Arc::new(record));
			scanned += 1;
			idx += 1;
		}
		if idx < line_count {
			let old_idx = idx - splice.new_end + splice.old_end;
			lines.extend(old[old_idx..].iter().cloned());
		}
		debug_assert_eq!(lines.len(), line_count);

		trace!(start = splice.start, scanned, next_scope, "index.update");
		Ok(Self {
			lines,
			style: grammar.scope_style(),
			next_scope,
		})
	}

	pub fn line_count(&self) -> usize {
		self.lines.len()
	}

	/// All declaration sites in document order.
	pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
		self.declarations().map(|(line, decl)| symbol(line, decl))
	}

	pub(crate) fn declarations(&self) -> impl Iterator<Item = (usize, &Declaration)> + '_ {
		self.lines
			.iter()
			.enumerate()
			.flat_map(|(line, record)| record.declarations.iter().map(move |d| (line, d)))
	}

	/// Every declaration site of `name`.
	pub fn symbols_named(&self, name: &str) -> Vec<Symbol> {
		self.declarations()
			.filter(|(_, d)| d.name == name)
			.map(|(line, d)| symbol(line, d))
			.collect()
	}

	/// Scopes enclosing `at`, innermost first and ending with [`ScopeId::ROOT`].
	pub fn scope_chain(&self, at: Position) -> SmallVec<[ScopeId; 8]> {
		let Some(record) = self.lines.get(at.line).or(self.lines.last()) else {
			return smallvec![ScopeId::ROOT];
		};
		let stack = if self.style == ScopeStyle::Indent || at.line >= self.lines.len() {
			record.exit.clone()
		} else {
			let mut stack = record.entry.clone();
			for &(column, event) in &record.events {
				if column as usize >= at.column {
					break;
				}
				match event {
					ScopeEvent::Push(id) => stack.push(Frame { id, indent: 0 }),
					ScopeEvent::Pop if stack.len() > 1 => {
						stack.pop();
					}
					ScopeEvent::Pop => {}
				}
			}
			stack
		};
		stack.iter().rev().map(|f| f.id).collect()
	}

	/// Looks `name` up from `at`: innermost enclosing scope first, then
	/// outwards to the document scope, then the grammar's keywords.
	///
	/// Within one scope the declaration closest to `at.line` wins.
	pub fn resolve(&self, grammar: &Grammar, name: &str, at: Position) -> Option<Resolution> {
		for scope in self.scope_chain(at) {
			let nearest = self
				.declarations()
				.filter(|(_, d)| d.scope == scope && d.name == name)
				.min_by_key(|(line, _)| line.abs_diff(at.line));
			if let Some((line, decl)) = nearest {
				return Some(Resolution::Symbol(symbol(line, decl)));
			}
		}
		grammar.is_keyword(name).then_some(Resolution::Keyword)
	}

	/// Declared names grouped by kind, sorted and deduplicated.
	pub fn summary(&self) -> SymbolSummary {
		let mut functions = BTreeSet::new();
		let mut types = BTreeSet::new();
		let mut variables = BTreeSet::new();
		for (_, decl) in self.declarations() {
			let bucket = match decl.kind {
				SymbolKind::Function => &mut functions,
				SymbolKind::Type => &mut types,
				SymbolKind::Variable => &mut variables,
				SymbolKind::Unknown => continue,
			};
			bucket.insert(decl.name.clone());
		}
		SymbolSummary {
			functions: functions.into_iter().collect(),
			types: types.into_iter().collect(),
			variables: variables.into_iter().collect(),
		}
	}
}

fn symbol(line: usize, decl: &Declaration) -> Symbol {
	Symbol {
		name: decl.name.clone(),
		kind: decl.kind,
		line,
		column: decl.column as usize,
		scope: decl.scope,
	}
}

fn open_scope(reuse: &[ScopeId], opened: &mut SmallVec<[ScopeId; 2]>, next_scope: &mut u32) -> ScopeId {
	let id = reuse.get(opened.len()).copied().unwrap_or_else(|| {
		let id = ScopeId(*next_scope);
		*next_scope += 1;
		id
	});
	opened.push(id);
	id
}

/// Indentation width with tabs advancing to the next multiple of four.
fn indent_width(text: &str) -> u32 {
	let mut width = 0;
	for c in text.chars() {
		match c {
			' ' => width += 1,
			'\t' => width = (width / 4 + 1) * 4,
			_ => break,
		}
	}
	width
}

fn char_column(text: &str, byte: u32) -> u32 {
	text.get(..byte as usize).map_or(0, |s| s.chars().count() as u32)
}

fn scan_line(
	grammar: &Grammar,
	text: &str,
	lexed: &LexedLine,
	entry: &ScopeStack,
	reuse: &[ScopeId],
	next_scope: &mut u32,
) -> LineRecord {
	let mut stack = entry.clone();
	let mut opened = SmallVec::new();
	let mut events = SmallVec::new();
	let mut declarations = Vec::new();

	let significant: SmallVec<[&TokenSpan; 16]> = lexed
		.tokens
		.iter()
		.filter(|t| t.category != TokenCategory::Comment)
		.collect();

	let style = grammar.scope_style();
	if style == ScopeStyle::Indent && lexed.start_state.is_initial() && !significant.is_empty() {
		let width = indent_width(text);
		while stack.len() > 1 && stack.last().is_some_and(|f| f.indent > width) {
			stack.pop();
		}
		if stack.last().is_some_and(|f| width > f.indent) {
			let id = open_scope(reuse, &mut opened, next_scope);
			stack.push(Frame { id, indent: width });
		}
	}

	let punct = |t: &TokenSpan, s: &str| t.category == TokenCategory::Punctuation && t.text(text) == s;

	for (i, token) in significant.iter().enumerate() {
		match token.category {
			TokenCategory::Punctuation if style == ScopeStyle::Braces => match token.text(text) {
				"{" => {
					let id = open_scope(reuse, &mut opened, next_scope);
					stack.push(Frame { id, indent: 0 });
					events.push((char_column(text, token.start), ScopeEvent::Push(id)));
				}
				"}" if stack.len() > 1 => {
					stack.pop();
					events.push((char_column(text, token.start), ScopeEvent::Pop));
				}
				_ => {}
			},
			TokenCategory::Identifier => {
				let prev = i.checked_sub(1).map(|p| significant[p]);
				let next = significant.get(i + 1).copied();
				if prev.is_some_and(|p| punct(p, ".")) {
					continue;
				}
				let calls = next.is_some_and(|n| punct(n, "("));
				let kind = match declared_by_keyword(grammar, text, &significant[..i]) {
					Some(SymbolKind::Variable) if calls => Some(SymbolKind::Function),
					Some(kind) => Some(kind),
					None if calls => Some(SymbolKind::Unknown),
					None => {
						let statement_start = prev.is_none_or(|p| punct(p, ";") || punct(p, "{") || punct(p, "}"));
						let assigns = next.is_some_and(|n| {
							n.category == TokenCategory::Operator && matches!(n.text(text), "=" | ":=")
						});
						(grammar.assignment_declares() && statement_start && assigns).then_some(SymbolKind::Variable)
					}
				};
				if let Some(kind) = kind {
					let scope = stack.last().map_or(ScopeId::ROOT, |f| f.id);
					declarations.push(Declaration {
						name: token.text(text).to_string(),
						kind,
						column: char_column(text, token.start),
						scope,
					});
				}
			}
			_ => {}
		}
	}

	LineRecord {
		entry: entry.clone(),
		exit: stack,
		opened,
		events,
		declarations,
	}
}

/// Kind declared by the nearest declaration keyword directly before an
/// identifier, looking through up to three keywords (`pub static mut x`).
fn declared_by_keyword(grammar: &Grammar, text: &str, before: &[&TokenSpan]) -> Option<SymbolKind> {
	before
		.iter()
		.rev()
		.take(3)
		.take_while(|t| t.category == TokenCategory::Keyword)
		.find_map(|t| grammar.declaration_kind(t.text(text)))
}
