//! Rope utilities and extensions.

use ropey::RopeSlice;

/// Returns the contents of line `idx` without its line terminator.
///
/// Every terminator ropey recognises (LF, CRLF, CR and the Unicode line
/// separators) is stripped so column arithmetic never counts it.
pub fn line_text(text: RopeSlice, idx: usize) -> String {
	let mut line = String::from(text.line(idx));
	let trimmed = line.trim_end_matches(is_line_break).len();
	line.truncate(trimmed);
	line
}

/// Returns the number of characters on line `idx`, excluding the terminator.
pub fn line_len_chars(text: RopeSlice, idx: usize) -> usize {
	let line = text.line(idx);
	let mut len = line.len_chars();
	while len > 0 && is_line_break(line.char(len - 1)) {
		len -= 1;
	}
	len
}

fn is_line_break(c: char) -> bool {
	matches!(c, '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}
