//! Core types for text editing: documents, positions, edit events and line splices.

/// Rope-backed document with line-oriented reads.
pub mod document;
/// Edit events and positions produced by the UI.
pub mod edit;
/// Non-blocking future helpers.
pub mod future;
/// Identifier and version types.
pub mod ids;
/// Rope utilities and extensions.
pub mod rope;
/// Line-range replacement bookkeeping for incremental consumers.
pub mod splice;

pub use document::Document;
pub use edit::{EditError, EditEvent, Position};
pub use ids::{DocumentId, Generation};
pub use ropey::{Rope, RopeSlice};
pub use splice::LineSplice;
