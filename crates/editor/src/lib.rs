//! Editing sessions for the quill editor core.
//!
//! # Architecture
//!
//! * [`config`]: TOML configuration (debounce, completion cap, extra grammars)
//! * [`scheduler`]: Per-document debounce and cancellation state machine
//! * [`manager`]: Open documents, background analysis and published results
//! * [`payload`]: Data handed to the execution and assistant collaborators
//!
//! The UI feeds [`EditEvent`](quill_primitives::EditEvent)s into an
//! [`AnalysisManager`] and calls [`AnalysisManager::tick`] from its event loop.
//! Highlights and completions are pulled on demand and always come from the
//! latest published generation.

pub mod config;
pub mod manager;
pub mod payload;
pub mod scheduler;

pub use config::{ConfigError, EditorConfig};
pub use manager::{AnalysisManager, Published, SessionError, TickReport};
pub use payload::{AssistantContext, RunRequest, Selection};
pub use scheduler::{AnalysisScheduler, AnalysisState, Disposition, Poll};
