use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::Generation;

/// A position in a document: zero-based line and character column.
///
/// Columns count characters, not bytes, and never include the line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
	pub line: usize,
	pub column: usize,
}

impl Position {
	pub const fn new(line: usize, column: usize) -> Self {
		Self { line, column }
	}
}

/// A single text mutation produced by the UI.
///
/// Replaces the text between `start` and `end` (both pre-edit positions,
/// `end` exclusive) with `text`. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
	pub start: Position,
	pub end: Position,
	pub text: String,
	pub generation: Generation,
}

impl EditEvent {
	/// Creates a replacement of `start..end` with `text`.
	pub fn replace(start: Position, end: Position, text: impl Into<String>, generation: Generation) -> Self {
		Self {
			start,
			end,
			text: text.into(),
			generation,
		}
	}

	/// Creates a pure insertion at `at`.
	pub fn insert(at: Position, text: impl Into<String>, generation: Generation) -> Self {
		Self::replace(at, at, text, generation)
	}

	/// Creates a pure deletion of `start..end`.
	pub fn delete(start: Position, end: Position, generation: Generation) -> Self {
		Self::replace(start, end, String::new(), generation)
	}
}

/// Errors raised when an edit cannot be applied to a document.
///
/// A rejected edit leaves the document untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	#[error("position {line}:{column} is outside the document")]
	PositionOutOfBounds { line: usize, column: usize },

	#[error("edit range is inverted: {start:?} > {end:?}")]
	InvertedRange { start: Position, end: Position },

	#[error("edit generation {got} is not newer than the document's {current}")]
	StaleGeneration { got: Generation, current: Generation },
}
