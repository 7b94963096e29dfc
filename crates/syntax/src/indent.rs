use quill_language::Grammar;

/// Default indentation unit.
pub const DEFAULT_INDENT_UNIT: &str = "    ";

/// Indentation to insert after breaking `line` with Enter.
///
/// Keeps the line's leading whitespace and adds one `unit` when the trimmed
/// line ends with one of the grammar's block openers (`:` in Python, `{` in
/// brace languages).
pub fn indent_for_newline(line: &str, grammar: &Grammar, unit: &str) -> String {
	let leading: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
	let trimmed = line.trim_end();
	let opens = grammar.indent_after().iter().any(|suffix| trimmed.ends_with(suffix.as_str()));
	if opens { leading + unit } else { leading }
}
