//! Worker plumbing for background analysis.
//!
//! Blocking jobs are spawned with a [`TaskClass`] for logging and owned by a
//! [`TaskCollector`] until reaped. A job superseded by a newer edit is
//! cancelled through its [`GenerationToken`].

mod class;
mod collector;
pub mod spawn;
mod token;

pub use class::TaskClass;
pub use collector::{TaskCollector, TaskId};
pub use token::GenerationToken;
