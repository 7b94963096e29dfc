//! Content-based language detection.
//!
//! Each grammar carries a handful of detection patterns; a grammar matches a
//! text when at least [`MIN_DETECTION_SCORE`] of them do. Ties go to the
//! grammar registered first.

use std::sync::Arc;

use tracing::trace;

use crate::grammar::Grammar;
use crate::loader::LanguageLoader;

/// Minimum number of matching detection patterns for a positive result.
pub const MIN_DETECTION_SCORE: usize = 2;

impl LanguageLoader {
	/// Guesses the language of `text`, first by shebang and then by content.
	pub fn detect_language(&self, text: &str) -> Option<Arc<Grammar>> {
		if let Some(first) = text.lines().next()
			&& let Some(id) = self.language_for_shebang(first)
		{
			return self.get(id).cloned();
		}

		let found = self
			.languages()
			.filter(|g| !g.is_plain_text())
			.find(|g| g.detection_score(text) >= MIN_DETECTION_SCORE)
			.cloned();
		trace!(language = found.as_ref().map(|g| g.name()), "Content detection");
		found
	}

	/// Like [`Self::detect_language`], degrading to plain text.
	pub fn detect_or_plain(&self, text: &str) -> Arc<Grammar> {
		self.detect_language(text).unwrap_or_else(|| self.plain_text())
	}
}
