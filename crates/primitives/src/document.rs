use ropey::Rope;

use crate::edit::{EditError, EditEvent, Position};
use crate::ids::Generation;
use crate::rope::{line_len_chars, line_text};
use crate::splice::LineSplice;

/// An open document: text plus the generation of the last applied edit.
///
/// Mutated only through [`Document::apply`], so line counts and offsets are
/// always consistent with the latest edit. Cloning is cheap (the rope is
/// shared until written).
#[derive(Debug, Clone, Default)]
pub struct Document {
	text: Rope,
	generation: Generation,
}

impl Document {
	pub fn new(text: &str) -> Self {
		Self {
			text: Rope::from_str(text),
			generation: Generation::INITIAL,
		}
	}

	pub fn rope(&self) -> &Rope {
		&self.text
	}

	pub fn generation(&self) -> Generation {
		self.generation
	}

	pub fn line_count(&self) -> usize {
		self.text.len_lines()
	}

	/// Returns line `idx` without its terminator, or `None` past the end.
	pub fn line(&self, idx: usize) -> Option<String> {
		(idx < self.line_count()).then(|| line_text(self.text.slice(..), idx))
	}

	pub fn len_chars(&self) -> usize {
		self.text.len_chars()
	}

	/// Returns the full document text.
	pub fn text(&self) -> String {
		self.text.to_string()
	}

	/// Returns the text between two positions.
	pub fn slice(&self, start: Position, end: Position) -> Result<String, EditError> {
		let (start_char, end_char) = self.char_range(start, end)?;
		Ok(self.text.slice(start_char..end_char).to_string())
	}

	/// Converts a position to a character index, validating it.
	pub fn char_index(&self, pos: Position) -> Result<usize, EditError> {
		let out_of_bounds = EditError::PositionOutOfBounds {
			line: pos.line,
			column: pos.column,
		};
		if pos.line >= self.line_count() {
			return Err(out_of_bounds);
		}
		if pos.column > line_len_chars(self.text.slice(..), pos.line) {
			return Err(out_of_bounds);
		}
		Ok(self.text.line_to_char(pos.line) + pos.column)
	}

	fn char_range(&self, start: Position, end: Position) -> Result<(usize, usize), EditError> {
		if start > end {
			return Err(EditError::InvertedRange { start, end });
		}
		Ok((self.char_index(start)?, self.char_index(end)?))
	}

	/// Applies an edit and returns the line splice it caused.
	///
	/// The edit is validated before anything changes; a rejected edit leaves
	/// the document untouched.
	pub fn apply(&mut self, edit: &EditEvent) -> Result<LineSplice, EditError> {
		if edit.generation <= self.generation {
			return Err(EditError::StaleGeneration {
				got: edit.generation,
				current: self.generation,
			});
		}
		let (start_char, end_char) = self.char_range(edit.start, edit.end)?;

		self.text.remove(start_char..end_char);
		self.text.insert(start_char, &edit.text);
		self.generation = edit.generation;

		let inserted = edit.text.chars().count();
		let new_last_line = self.text.char_to_line(start_char + inserted);
		Ok(LineSplice::new(edit.start.line, edit.end.line + 1, new_last_line + 1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn edit(start: (usize, usize), end: (usize, usize), text: &str, generation: u64) -> EditEvent {
		EditEvent::replace(
			Position::new(start.0, start.1),
			Position::new(end.0, end.1),
			text,
			Generation(generation),
		)
	}

	#[test]
	fn insert_within_line_touches_one_line() {
		let mut doc = Document::new("fn main() {\n    foo\n}");
		let splice = doc.apply(&edit((1, 7), (1, 7), "bar", 1)).unwrap();
		assert_eq!(splice, LineSplice::new(1, 2, 2));
		assert_eq!(doc.line(1).as_deref(), Some("    foobar"));
		assert_eq!(doc.generation(), Generation(1));
	}

	#[test]
	fn inserting_newlines_grows_the_splice() {
		let mut doc = Document::new("a\nb");
		let splice = doc.apply(&edit((0, 1), (0, 1), "\nx\ny", 1)).unwrap();
		assert_eq!(splice, LineSplice::new(0, 1, 3));
		assert_eq!(doc.line_count(), 4);
		assert_eq!(doc.text(), "a\nx\ny\nb");
	}

	#[test]
	fn deleting_across_lines_shrinks_the_splice() {
		let mut doc = Document::new("one\ntwo\nthree\nfour");
		let splice = doc.apply(&edit((0, 3), (2, 5), "", 1)).unwrap();
		assert_eq!(splice, LineSplice::new(0, 3, 1));
		assert_eq!(doc.text(), "one\nfour");
	}

	#[test]
	fn out_of_bounds_edit_is_rejected_without_mutation() {
		let mut doc = Document::new("short");
		let err = doc.apply(&edit((0, 9), (0, 9), "x", 1)).unwrap_err();
		assert_eq!(err, EditError::PositionOutOfBounds { line: 0, column: 9 });
		assert_eq!(doc.text(), "short");
		assert_eq!(doc.generation(), Generation::INITIAL);
	}

	#[test]
	fn stale_generation_is_rejected() {
		let mut doc = Document::new("x");
		doc.apply(&edit((0, 0), (0, 0), "a", 3)).unwrap();
		let err = doc.apply(&edit((0, 0), (0, 0), "b", 2)).unwrap_err();
		assert!(matches!(err, EditError::StaleGeneration { .. }));
		assert_eq!(doc.text(), "ax");
	}

	#[test]
	fn inverted_range_is_rejected() {
		let mut doc = Document::new("abc");
		let err = doc.apply(&edit((0, 2), (0, 1), "", 1)).unwrap_err();
		assert!(matches!(err, EditError::InvertedRange { .. }));
	}
}
