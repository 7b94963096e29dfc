//! Lexical grammar registry.
//!
//! This crate holds one immutable [`Grammar`] per supported language and the
//! [`LanguageLoader`] that resolves language tags, file extensions, shebangs
//! and file contents to grammars.
//!
//! # Architecture
//!
//! * [`grammar`]: The compiled grammar model (token categories, rule kinds, lints)
//! * [`definition`]: The TOML definition format and its compilation
//! * [`loader`]: Language registry and lookups
//! * [`detect`]: Content-based language detection
//!
//! Grammars are loaded once (embedded definitions plus optional user
//! definitions) and never mutated afterwards. A language whose definition is
//! malformed is reported once at load time and falls back to plain text.

pub mod definition;
pub mod detect;
pub mod grammar;
pub mod loader;

pub use definition::{DefinitionFile, LanguageDef, LintDef, RuleDef};
pub use grammar::{Delimiter, Grammar, Lint, LintStep, Rule, ScopeStyle, Severity, SymbolKind, TokenCategory};
pub use loader::{LanguageError, LanguageId, LanguageLoader};
