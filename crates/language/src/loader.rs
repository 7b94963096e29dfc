//! Language registry.
//!
//! Built once from grammar definitions and read-only afterwards, so lookups
//! need no locking and grammars can be shared across documents via `Arc`.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::definition::{DefinitionFile, LanguageDef};
use crate::grammar::Grammar;

/// Embedded definitions for the built-in languages.
const BUILTIN_DEFINITIONS: &str = include_str!("../languages.toml");

/// Errors raised by grammar loading and lookup.
#[derive(Debug, Error)]
pub enum LanguageError {
	#[error("unknown language: {0}")]
	UnknownLanguage(String),

	#[error("malformed grammar rule in `{language}` ({rule}): {reason}")]
	MalformedGrammarRule { language: String, rule: String, reason: String },

	#[error("invalid grammar definitions: {0}")]
	Definition(#[from] toml::de::Error),
}

/// Index of a registered grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageId(pub u32);

impl LanguageId {
	#[inline]
	pub fn idx(self) -> usize {
		self.0 as usize
	}
}

/// Registry of grammars keyed by language tag, extension and shebang.
#[derive(Debug)]
pub struct LanguageLoader {
	grammars: Vec<Arc<Grammar>>,
	by_tag: FxHashMap<String, LanguageId>,
	by_extension: FxHashMap<String, LanguageId>,
	by_shebang: FxHashMap<String, LanguageId>,
	plain: LanguageId,
	load_errors: Vec<LanguageError>,
}

impl Default for LanguageLoader {
	fn default() -> Self {
		Self::empty()
	}
}

impl LanguageLoader {
	/// A registry holding only the plain-text grammar.
	pub fn empty() -> Self {
		let mut loader = Self {
			grammars: Vec::new(),
			by_tag: FxHashMap::default(),
			by_extension: FxHashMap::default(),
			by_shebang: FxHashMap::default(),
			plain: LanguageId(0),
			load_errors: Vec::new(),
		};
		loader.plain = loader.register(Grammar::plain_text());
		loader
	}

	/// Loads the built-in language definitions.
	pub fn from_embedded() -> Self {
		let mut loader = Self::empty();
		match DefinitionFile::from_toml_str(BUILTIN_DEFINITIONS) {
			Ok(file) => loader.extend(file.languages),
			Err(e) => {
				warn!(error = %e, "Embedded grammar definitions failed to parse");
				loader.load_errors.push(e);
			}
		}
		loader
	}

	/// Loads the built-in definitions plus extra definitions from TOML text.
	///
	/// Entries in `src` replace built-in languages with the same name.
	pub fn from_embedded_with(src: &str) -> Result<Self, LanguageError> {
		let extra = DefinitionFile::from_toml_str(src)?;
		let mut loader = Self::from_embedded();
		loader.extend(extra.languages);
		Ok(loader)
	}

	/// Loads only the definitions in `src` (plus plain text).
	pub fn from_toml_str(src: &str) -> Result<Self, LanguageError> {
		let file = DefinitionFile::from_toml_str(src)?;
		let mut loader = Self::empty();
		loader.extend(file.languages);
		Ok(loader)
	}

	fn extend(&mut self, defs: Vec<LanguageDef>) {
		for def in defs {
			match def.compile() {
				Ok(grammar) => {
					debug!(language = grammar.name(), rules = grammar.rules().len(), "Registered grammar");
					self.register(grammar);
				}
				Err(error) => {
					warn!(language = %def.name, %error, "Dropping malformed grammar; using plain text");
					self.alias_to_plain(&def);
					self.load_errors.push(error);
				}
			}
		}
	}

	fn register(&mut self, grammar: Grammar) -> LanguageId {
		let id = match self.by_tag.get(grammar.name()).copied() {
			Some(existing) if existing != self.plain || grammar.is_plain_text() => {
				self.grammars[existing.idx()] = Arc::new(grammar);
				existing
			}
			_ => {
				self.grammars.push(Arc::new(grammar));
				LanguageId((self.grammars.len() - 1) as u32)
			}
		};
		let grammar = Arc::clone(&self.grammars[id.idx()]);
		self.by_tag.insert(grammar.name().to_string(), id);
		for alias in grammar.aliases() {
			self.by_tag.insert(alias.clone(), id);
		}
		for ext in grammar.extensions() {
			self.by_extension.insert(ext.clone(), id);
		}
		for interpreter in grammar.shebangs() {
			self.by_shebang.insert(interpreter.clone(), id);
		}
		id
	}

	fn alias_to_plain(&mut self, def: &LanguageDef) {
		let plain = self.plain;
		let name = def.name.to_lowercase();
		if !name.is_empty() {
			self.by_tag.insert(name, plain);
		}
		for alias in &def.aliases {
			self.by_tag.insert(alias.to_lowercase(), plain);
		}
		for ext in &def.extensions {
			self.by_extension.insert(ext.trim_start_matches('.').to_lowercase(), plain);
		}
	}

	/// Returns the grammar registered for `tag` (name or alias, case-insensitive).
	pub fn grammar_for(&self, tag: &str) -> Result<Arc<Grammar>, LanguageError> {
		self.language_for_name(tag)
			.map(|id| Arc::clone(&self.grammars[id.idx()]))
			.ok_or_else(|| LanguageError::UnknownLanguage(tag.to_string()))
	}

	/// Like [`Self::grammar_for`], degrading to plain text for unknown tags.
	pub fn grammar_or_plain(&self, tag: &str) -> Arc<Grammar> {
		self.grammar_for(tag).unwrap_or_else(|_| self.plain_text())
	}

	/// Grammar for a file path, by shebang-free extension lookup.
	pub fn grammar_for_path(&self, path: &Path) -> Arc<Grammar> {
		self.language_for_path(path)
			.map(|id| Arc::clone(&self.grammars[id.idx()]))
			.unwrap_or_else(|| self.plain_text())
	}

	/// Grammar for a file extension (with or without the leading dot).
	pub fn grammar_for_extension(&self, ext: &str) -> Arc<Grammar> {
		self.by_extension
			.get(&ext.trim_start_matches('.').to_lowercase())
			.map(|id| Arc::clone(&self.grammars[id.idx()]))
			.unwrap_or_else(|| self.plain_text())
	}

	pub fn plain_text(&self) -> Arc<Grammar> {
		Arc::clone(&self.grammars[self.plain.idx()])
	}

	pub fn language_for_name(&self, tag: &str) -> Option<LanguageId> {
		self.by_tag.get(&tag.trim().to_lowercase()).copied()
	}

	pub fn language_for_path(&self, path: &Path) -> Option<LanguageId> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(|ext| self.by_extension.get(&ext.to_lowercase()).copied())
	}

	/// Finds a language from a `#!` line, e.g. `#!/usr/bin/env python3`.
	pub fn language_for_shebang(&self, first_line: &str) -> Option<LanguageId> {
		let rest = first_line.strip_prefix("#!")?;
		let mut parts = rest.split_whitespace();
		let mut program = parts.next()?.rsplit('/').next()?;
		if program == "env" {
			program = parts.find(|p| !p.starts_with('-'))?;
		}
		let program = program.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
		self.by_shebang.get(program).copied()
	}

	pub fn get(&self, id: LanguageId) -> Option<&Arc<Grammar>> {
		self.grammars.get(id.idx())
	}

	/// Registered grammars in registration order, plain text first.
	pub fn languages(&self) -> impl Iterator<Item = &Arc<Grammar>> {
		self.grammars.iter()
	}

	/// Errors collected while building the registry.
	pub fn load_errors(&self) -> &[LanguageError] {
		&self.load_errors
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn builtin_definitions_load_cleanly() {
		let loader = LanguageLoader::from_embedded();
		assert!(loader.load_errors().is_empty(), "{:?}", loader.load_errors());
		let names: Vec<_> = loader.languages().map(|g| g.name().to_string()).collect();
		assert_eq!(names, ["text", "python", "javascript", "java", "c", "cpp", "go", "rust"]);
	}

	#[test]
	fn lookup_by_alias_is_case_insensitive() {
		let loader = LanguageLoader::from_embedded();
		assert_eq!(loader.grammar_for("Python-Like").unwrap().name(), "python");
		assert_eq!(loader.grammar_for("JS").unwrap().name(), "javascript");
	}

	#[test]
	fn unknown_language_is_an_error_and_degrades_to_plain_text() {
		let loader = LanguageLoader::from_embedded();
		let err = loader.grammar_for("cobol").unwrap_err();
		assert!(matches!(err, LanguageError::UnknownLanguage(ref tag) if tag == "cobol"));
		assert!(loader.grammar_or_plain("cobol").is_plain_text());
	}

	#[test]
	fn unknown_extension_resolves_to_plain_text() {
		let loader = LanguageLoader::from_embedded();
		assert!(loader.grammar_for_path(Path::new("notes.xyz")).is_plain_text());
		assert_eq!(loader.grammar_for_path(Path::new("src/main.RS")).name(), "rust");
		assert_eq!(loader.grammar_for_extension(".py").name(), "python");
	}

	#[test]
	fn shebang_lookup_strips_env_and_version() {
		let loader = LanguageLoader::from_embedded();
		let id = loader.language_for_shebang("#!/usr/bin/env python3").unwrap();
		assert_eq!(loader.get(id).unwrap().name(), "python");
		assert!(loader.language_for_shebang("#!/bin/sh").is_none());
		assert!(loader.language_for_shebang("print('hi')").is_none());
	}

	#[test]
	fn malformed_grammar_is_dropped_and_reported_once() {
		let src = r#"
[[language]]
name = "good"
extensions = ["gd"]
[[language.rule]]
kind = "keywords"

[[language]]
name = "bad"
aliases = ["worse"]
extensions = ["bd"]
[[language.rule]]
kind = "pattern"
category = "string"
pattern = "(unclosed"
"#;
		let loader = LanguageLoader::from_toml_str(src).unwrap();
		assert_eq!(loader.load_errors().len(), 1);
		assert!(loader.grammar_for("bad").unwrap().is_plain_text());
		assert!(loader.grammar_for("worse").unwrap().is_plain_text());
		assert!(loader.grammar_for_extension("bd").is_plain_text());
		assert_eq!(loader.grammar_for("good").unwrap().name(), "good");
	}

	#[test]
	fn user_definitions_replace_builtins() {
		let src = r#"
[[language]]
name = "go"
extensions = ["go"]
keywords = ["func"]
"#;
		let loader = LanguageLoader::from_embedded_with(src).unwrap();
		let go = loader.grammar_for("go").unwrap();
		assert_eq!(go.keywords(), ["func"]);
		assert_eq!(loader.languages().filter(|g| g.name() == "go").count(), 1);
	}

	#[test]
	fn unparseable_definitions_are_rejected() {
		let err = LanguageLoader::from_toml_str("[[language]\nname=").unwrap_err();
		assert!(matches!(err, LanguageError::Definition(_)));
	}
}
