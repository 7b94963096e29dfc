//! Syntax analysis for open documents.
//!
//! Everything here is a pure function of a document snapshot and the
//! previously published analysis. Nothing in this crate owns mutable state;
//! the editor layer decides when to run a pass and whether to keep its result.
//!
//! # Architecture
//!
//! * [`lexer`]: Per-line lexing with carried [`LexState`] and fixed-point relexing
//! * [`highlight`]: Projection of tokens onto rendering-facing [`HighlightSpan`]s
//! * [`index`]: Scope-aware symbol index maintained from the token stream
//! * [`completion`]: Tiered completion ranking over the symbol index
//! * [`diagnostics`]: Token-level findings (markers, credentials, unterminated constructs, grammar lints)
//! * [`quality`]: Complexity score and maintainability rating
//! * [`indent`]: Newline indentation helper
//!
//! Passes check a [`Checkpoint`] between lines and stop with [`Cancelled`]
//! when a newer edit has superseded them.

pub mod completion;
pub mod diagnostics;
pub mod highlight;
pub mod indent;
pub mod index;
pub mod lexer;
pub mod quality;

#[cfg(test)]
mod tests;

pub use completion::{CompletionCandidate, CompletionKind, complete};
pub use diagnostics::{Diagnostic, Severity};
pub use highlight::{HighlightSpan, StyleTag};
pub use indent::indent_for_newline;
pub use index::{Resolution, ScopeId, Symbol, SymbolIndex, SymbolSummary};
pub use lexer::{LexState, LexedLine, LineCache, RelexOutcome, Termination, Token, TokenSpan};
pub use quality::{Maintainability, QualitySummary};
use thiserror::Error;

/// A pass was abandoned because a newer edit superseded it.
///
/// Internal control signal; never surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("analysis cancelled")]
pub struct Cancelled;

/// Cooperative cancellation check, polled between lines.
pub trait Checkpoint {
	fn is_cancelled(&self) -> bool;

	#[inline]
	fn check(&self) -> Result<(), Cancelled> {
		if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
	}
}

/// Checkpoint for passes that cannot be superseded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl Checkpoint for NeverCancel {
	#[inline]
	fn is_cancelled(&self) -> bool {
		false
	}
}

impl<F: Fn() -> bool> Checkpoint for F {
	#[inline]
	fn is_cancelled(&self) -> bool {
		self()
	}
}
