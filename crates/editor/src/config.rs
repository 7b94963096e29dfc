//! Editor configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quill_language::{LanguageError, LanguageLoader};
use quill_syntax::completion::DEFAULT_MAX_CANDIDATES;
use serde::Deserialize;
use thiserror::Error;

/// Default debounce window between the last edit and the analysis it triggers.
pub const DEFAULT_DEBOUNCE_MS: u64 = 80;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration or grammar definition file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or structure.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value parsed but is not usable.
	#[error("invalid configuration: {0}")]
	Invalid(String),

	/// User grammar definitions failed to load.
	#[error(transparent)]
	Languages(#[from] LanguageError),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
	pub analysis: AnalysisConfig,
	pub completion: CompletionConfig,
	pub languages: LanguagesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
	/// Quiet period after the last edit before analysis starts.
	pub debounce_ms: u64,
}

impl Default for AnalysisConfig {
	fn default() -> Self {
		Self {
			debounce_ms: DEFAULT_DEBOUNCE_MS,
		}
	}
}

impl AnalysisConfig {
	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
	/// Maximum number of candidates returned per query.
	pub max_candidates: usize,
}

impl Default for CompletionConfig {
	fn default() -> Self {
		Self {
			max_candidates: DEFAULT_MAX_CANDIDATES,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguagesConfig {
	/// Extra grammar definitions, merged over the built-in ones.
	///
	/// Relative paths resolve against the configuration file's directory.
	pub definitions: Option<PathBuf>,
}

impl EditorConfig {
	/// Loads and validates a configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = read(path)?;
		let mut config = Self::from_toml_str(&content)?;
		if let Some(defs) = config.languages.definitions.as_mut()
			&& defs.is_relative()
			&& let Some(dir) = path.parent()
		{
			*defs = dir.join(&*defs);
		}
		tracing::debug!(path = %path.display(), "config.loaded");
		Ok(config)
	}

	/// Parses and validates configuration text.
	pub fn from_toml_str(src: &str) -> Result<Self> {
		let config: Self = toml::from_str(src)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.completion.max_candidates == 0 {
			return Err(ConfigError::Invalid("completion.max_candidates must be at least 1".into()));
		}
		Ok(())
	}

	/// Builds the grammar registry: built-in languages plus any configured
	/// definitions file.
	pub fn language_loader(&self) -> Result<LanguageLoader> {
		let loader = match &self.languages.definitions {
			Some(path) => LanguageLoader::from_embedded_with(&read(path)?)?,
			None => LanguageLoader::from_embedded(),
		};
		for error in loader.load_errors() {
			tracing::warn!(%error, "config.grammar_dropped");
		}
		Ok(loader)
	}
}

fn read(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
		path: path.to_path_buf(),
		error,
	})
}
