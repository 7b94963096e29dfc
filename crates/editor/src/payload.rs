//! Payloads handed to the execution and assistant collaborators.

use quill_primitives::Position;
use quill_syntax::{Diagnostic, QualitySummary, SymbolSummary};
use serde::Serialize;

/// Everything the execution collaborator needs to run the active document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRequest {
	pub language: String,
	/// File extension (without the dot) for the temporary source file.
	pub extension: String,
	pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
	pub start: Position,
	pub end: Position,
}

/// Opaque context forwarded to the AI assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantContext {
	pub language: String,
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub selection: Option<Selection>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub selected_text: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub symbols: Option<SymbolSummary>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub diagnostics: Option<Vec<Diagnostic>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub quality: Option<QualitySummary>,
}
