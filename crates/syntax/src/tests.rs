//! End-to-end checks across lexer, index and completion.

use std::path::Path;

use pretty_assertions::assert_eq;
use quill_language::LanguageLoader;
use quill_primitives::{Document, EditEvent, Generation, Position};

use crate::lexer::{lex_document, relex};
use crate::{NeverCancel, StyleTag, SymbolIndex, complete};

#[test]
fn unknown_extension_lexes_as_plain_text() {
	let loader = LanguageLoader::from_embedded();
	let grammar = loader.grammar_for_path(Path::new("README.weird"));
	assert!(grammar.is_plain_text());
	assert!(loader.load_errors().is_empty());

	let doc = Document::new("fn looks_like_code() {\n  \"but is not\"\n}");
	let cache = lex_document(&grammar, &doc);
	let spans = cache.highlights(0..doc.line_count());
	assert_eq!(spans.len(), 3);
	assert!(spans.iter().all(|s| s.style == StyleTag::Text));
	assert_eq!(spans.iter().map(|s| s.line).collect::<Vec<_>>(), [0, 1, 2]);
}

#[test]
fn edit_flows_through_relex_index_and_completion() {
	let loader = LanguageLoader::from_embedded();
	let grammar = loader.grammar_for("python").unwrap();
	let mut doc = Document::new("def foo():\n    pass");
	let cache = lex_document(&grammar, &doc);
	let index = SymbolIndex::build(&grammar, &doc, &cache);

	let edit = EditEvent::insert(Position::new(1, 8), "\n    counter = 1\n    co", Generation(1));
	let splice = doc.apply(&edit).unwrap();
	let relexed = relex(&grammar, &doc, &cache, splice, &NeverCancel).unwrap();
	let index = index
		.update(&grammar, &doc, &relexed.cache, splice, relexed.dirty.clone(), &NeverCancel)
		.unwrap();

	let got = complete(&index, &grammar, Position::new(3, 6), "co", 20);
	let texts: Vec<_> = got.iter().map(|c| c.text.as_str()).collect();
	assert_eq!(texts, ["counter", "continue"]);

	let stale = complete(&SymbolIndex::default(), &grammar, Position::new(3, 6), "co", 20);
	assert_eq!(stale.len(), 1);
}
