//! Grammar definition format.
//!
//! Definitions are TOML tables, one `[[language]]` entry per language:
//!
//! ```toml
//! [[language]]
//! name = "python"
//! aliases = ["py"]
//! extensions = ["py"]
//! scope = "indent"
//! keywords = ["def", "return"]
//! declarations = { def = "function" }
//!
//! [[language.rule]]
//! kind = "pattern"
//! category = "comment"
//! pattern = "#.*"
//!
//! [[language.lint]]
//! severity = "error"
//! message = "dangerous eval() usage"
//! tokens = ["eval", "("]
//! ```
//!
//! Lint tokens are matched against consecutive non-comment tokens: a plain
//! string must equal the token text, `re:<regex>` must match all of it,
//! `@<category>` matches any token of that category, and `...` skips tokens
//! on the current line.
//!
//! Field values that only make sense for one language (categories, kinds,
//! regexes) are kept as strings here and validated in [`LanguageDef::compile`],
//! so one bad entry drops only its own language.

use std::collections::BTreeMap;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::grammar::{Delimiter, Grammar, Lint, LintStep, Rule, ScopeStyle, Severity, SymbolKind, TokenCategory};
use crate::loader::LanguageError;

/// Top-level definition file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionFile {
	#[serde(default, rename = "language")]
	pub languages: Vec<LanguageDef>,
}

impl DefinitionFile {
	pub fn from_toml_str(src: &str) -> Result<Self, LanguageError> {
		Ok(toml::from_str(src)?)
	}
}

/// Uncompiled definition of one language.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LanguageDef {
	pub name: String,
	pub aliases: Vec<String>,
	pub extensions: Vec<String>,
	pub shebangs: Vec<String>,
	pub scope: ScopeStyle,
	pub keywords: Vec<String>,
	pub declarations: BTreeMap<String, String>,
	pub assignment_declares: bool,
	pub indent_after: Vec<String>,
	pub detect: Vec<String>,
	#[serde(rename = "rule")]
	pub rules: Vec<RuleDef>,
	#[serde(rename = "lint")]
	pub lints: Vec<LintDef>,
}

/// Uncompiled lint; mirrors [`Lint`].
#[derive(Debug, Clone, Deserialize)]
pub struct LintDef {
	pub severity: String,
	pub message: String,
	pub tokens: Vec<String>,
}

/// Uncompiled rule; mirrors [`Rule`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleDef {
	Keywords,
	Pattern {
		category: String,
		pattern: String,
	},
	Delimited {
		category: String,
		open: String,
		close: String,
		#[serde(default)]
		escape: Option<String>,
		#[serde(default)]
		multiline: bool,
	},
}

impl LanguageDef {
	/// Validates the definition and compiles it into a [`Grammar`].
	pub fn compile(&self) -> Result<Grammar, LanguageError> {
		if self.name.trim().is_empty() {
			return Err(self.malformed("name", "language name is empty"));
		}

		let rules = self
			.rules
			.iter()
			.enumerate()
			.map(|(idx, rule)| self.compile_rule(idx, rule))
			.collect::<Result<Vec<_>, _>>()?;

		let lints = self
			.lints
			.iter()
			.enumerate()
			.map(|(idx, lint)| self.compile_lint(idx, lint))
			.collect::<Result<Vec<_>, _>>()?;

		let mut declarations = FxHashMap::default();
		for (keyword, kind) in &self.declarations {
			let kind = SymbolKind::from_name(kind)
				.ok_or_else(|| self.malformed(&format!("declarations.{keyword}"), &format!("unknown symbol kind `{kind}`")))?;
			declarations.insert(keyword.clone(), kind);
		}

		let detect = self
			.detect
			.iter()
			.map(|src| {
				Regex::new(src).map_err(|e| self.malformed("detect", &e.to_string()))
			})
			.collect::<Result<Vec<_>, _>>()?;

		let mut keywords = self.keywords.clone();
		keywords.sort();
		keywords.dedup();

		Ok(Grammar {
			name: self.name.to_lowercase(),
			aliases: self.aliases.iter().map(|a| a.to_lowercase()).collect(),
			extensions: self.extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
			shebangs: self.shebangs.clone(),
			scope: self.scope,
			keywords,
			declarations,
			assignment_declares: self.assignment_declares,
			indent_after: self.indent_after.clone(),
			rules,
			lints,
			detect,
		})
	}

	fn compile_rule(&self, idx: usize, rule: &RuleDef) -> Result<Rule, LanguageError> {
		let label = format!("rule[{idx}]");
		match rule {
			RuleDef::Keywords => Ok(Rule::Keywords),
			RuleDef::Pattern { category, pattern } => {
				let category = self.category(&label, category)?;
				if pattern.is_empty() {
					return Err(self.malformed(&label, "pattern is empty"));
				}
				let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|e| self.malformed(&label, &e.to_string()))?;
				Ok(Rule::Pattern { category, regex })
			}
			RuleDef::Delimited {
				category,
				open,
				close,
				escape,
				multiline,
			} => {
				let category = self.category(&label, category)?;
				if open.is_empty() || close.is_empty() {
					return Err(self.malformed(&label, "delimiters must not be empty"));
				}
				let escape = match escape.as_deref() {
					None => None,
					Some(esc) => {
						let mut chars = esc.chars();
						match (chars.next(), chars.next()) {
							(Some(c), None) => Some(c),
							_ => return Err(self.malformed(&label, "escape must be a single character")),
						}
					}
				};
				Ok(Rule::Delimited(Delimiter {
					category,
					open: open.clone(),
					close: close.clone(),
					escape,
					multiline: *multiline,
				}))
			}
		}
	}

	fn compile_lint(&self, idx: usize, lint: &LintDef) -> Result<Lint, LanguageError> {
		let label = format!("lint[{idx}]");
		let severity = Severity::from_name(&lint.severity)
			.ok_or_else(|| self.malformed(&label, &format!("unknown severity `{}`", lint.severity)))?;
		let steps = lint
			.tokens
			.iter()
			.map(|token| self.lint_step(&label, token))
			.collect::<Result<Vec<_>, _>>()?;

		let open_ended = matches!(steps.first(), None | Some(LintStep::Gap)) || matches!(steps.last(), Some(LintStep::Gap));
		if open_ended || steps.windows(2).any(|w| matches!(w, [LintStep::Gap, LintStep::Gap])) {
			return Err(self.malformed(&label, "tokens must start and end with a token, with single `...` gaps between"));
		}
		Ok(Lint {
			severity,
			message: lint.message.clone(),
			steps,
		})
	}

	fn lint_step(&self, label: &str, token: &str) -> Result<LintStep, LanguageError> {
		if token == "..." {
			return Ok(LintStep::Gap);
		}
		if let Some(name) = token.strip_prefix('@').filter(|n| !n.is_empty()) {
			return self.category(label, name).map(LintStep::Category);
		}
		if let Some(pattern) = token.strip_prefix("re:") {
			return Regex::new(&format!("^(?:{pattern})$"))
				.map(LintStep::Pattern)
				.map_err(|e| self.malformed(label, &e.to_string()));
		}
		if token.is_empty() {
			return Err(self.malformed(label, "empty token"));
		}
		Ok(LintStep::Text(token.to_string()))
	}

	fn category(&self, label: &str, name: &str) -> Result<TokenCategory, LanguageError> {
		TokenCategory::from_name(name).ok_or_else(|| self.malformed(label, &format!("unknown category `{name}`")))
	}

	fn malformed(&self, rule: &str, reason: &str) -> LanguageError {
		LanguageError::MalformedGrammarRule {
			language: self.name.clone(),
			rule: rule.to_string(),
			reason: reason.to_string(),
		}
	}
}
