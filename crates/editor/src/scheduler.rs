use std::time::{Duration, Instant};

use quill_primitives::Generation;

/// Analysis lifecycle of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
	/// Published analysis matches the document.
	Idle,
	/// Edits are waiting out the debounce window.
	PendingEdit { last_edit_at: Instant },
	/// A pass for `generation` is in flight.
	Analyzing { generation: Generation },
}

/// What the owner should do on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
	/// Nothing to do.
	Idle,
	/// Debounce still running; check again at `deadline`.
	Wait { deadline: Instant },
	/// Debounce elapsed; start a pass.
	Ready,
	/// A pass is already in flight.
	Busy,
}

/// Fate of a finished pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
	/// The pass is for the newest generation; install its result.
	Publish,
	/// The pass was superseded or cancelled; drop its result.
	Discard,
}

/// Per-document debounce and cancellation state machine.
///
/// `Idle -> PendingEdit -> Analyzing -> Idle`, and back from `Analyzing` to
/// `PendingEdit` when an edit lands mid-pass. Time is always passed in, so the
/// machine itself never reads a clock.
#[derive(Debug, Clone)]
pub struct AnalysisScheduler {
	state: AnalysisState,
	debounce: Duration,
	/// If true, bypasses the debounce gate for the next pass.
	force_no_debounce: bool,
}

impl AnalysisScheduler {
	pub fn new(debounce: Duration) -> Self {
		Self {
			state: AnalysisState::Idle,
			debounce,
			force_no_debounce: false,
		}
	}

	pub fn state(&self) -> AnalysisState {
		self.state
	}

	pub fn is_analyzing(&self) -> bool {
		matches!(self.state, AnalysisState::Analyzing { .. })
	}

	/// Records an edit and re-arms the debounce window.
	///
	/// Returns the generation of the in-flight pass this edit cancels, if any.
	pub fn note_edit(&mut self, now: Instant) -> Option<Generation> {
		let cancelled = match self.state {
			AnalysisState::Analyzing { generation } => Some(generation),
			_ => None,
		};
		self.state = AnalysisState::PendingEdit { last_edit_at: now };
		cancelled
	}

	/// Lets the pending edit skip the rest of its debounce window.
	pub fn force(&mut self) {
		if matches!(self.state, AnalysisState::PendingEdit { .. }) {
			self.force_no_debounce = true;
		}
	}

	pub fn poll(&self, now: Instant) -> Poll {
		match self.state {
			AnalysisState::Idle => Poll::Idle,
			AnalysisState::Analyzing { .. } => Poll::Busy,
			AnalysisState::PendingEdit { last_edit_at } => {
				let deadline = last_edit_at + self.debounce;
				if self.force_no_debounce || now >= deadline {
					Poll::Ready
				} else {
					Poll::Wait { deadline }
				}
			}
		}
	}

	/// Moves a pending document into `Analyzing` for `generation`.
	///
	/// Returns false (and changes nothing) unless an edit is pending.
	pub fn begin(&mut self, generation: Generation) -> bool {
		if !matches!(self.state, AnalysisState::PendingEdit { .. }) {
			return false;
		}
		self.state = AnalysisState::Analyzing { generation };
		self.force_no_debounce = false;
		true
	}

	/// Settles a finished pass.
	///
	/// Only the pass the machine is currently waiting for may publish; any
	/// other generation was superseded by a later edit.
	pub fn finish(&mut self, generation: Generation) -> Disposition {
		match self.state {
			AnalysisState::Analyzing { generation: current } if current == generation => {
				self.state = AnalysisState::Idle;
				Disposition::Publish
			}
			_ => Disposition::Discard,
		}
	}

	/// Returns an in-flight pass that failed without a result to pending, so
	/// it is retried after the debounce window.
	pub fn retry(&mut self, generation: Generation, now: Instant) {
		if self.state == (AnalysisState::Analyzing { generation }) {
			self.state = AnalysisState::PendingEdit { last_edit_at: now };
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DEBOUNCE: Duration = Duration::from_millis(80);

	#[test]
	fn edit_waits_out_debounce_then_analyzes_and_publishes() {
		let t0 = Instant::now();
		let mut sched = AnalysisScheduler::new(DEBOUNCE);
		assert_eq!(sched.poll(t0), Poll::Idle);

		assert_eq!(sched.note_edit(t0), None);
		assert_eq!(sched.poll(t0 + Duration::from_millis(79)), Poll::Wait { deadline: t0 + DEBOUNCE });
		assert_eq!(sched.poll(t0 + DEBOUNCE), Poll::Ready);

		assert!(sched.begin(Generation(1)));
		assert!(sched.is_analyzing());
		assert_eq!(sched.poll(t0 + DEBOUNCE), Poll::Busy);
		assert_eq!(sched.finish(Generation(1)), Disposition::Publish);
		assert_eq!(sched.state(), AnalysisState::Idle);
	}

	#[test]
	fn every_edit_rearms_the_window() {
		let t0 = Instant::now();
		let mut sched = AnalysisScheduler::new(DEBOUNCE);
		for ms in [0, 50, 100, 150] {
			sched.note_edit(t0 + Duration::from_millis(ms));
		}
		assert!(matches!(sched.poll(t0 + Duration::from_millis(200)), Poll::Wait { .. }));
		assert_eq!(sched.poll(t0 + Duration::from_millis(230)), Poll::Ready);
	}

	#[test]
	fn edit_during_analysis_cancels_and_discards_that_pass() {
		let t0 = Instant::now();
		let mut sched = AnalysisScheduler::new(DEBOUNCE);
		sched.note_edit(t0);
		sched.begin(Generation(1));

		let t1 = t0 + Duration::from_millis(100);
		assert_eq!(sched.note_edit(t1), Some(Generation(1)));
		assert_eq!(sched.state(), AnalysisState::PendingEdit { last_edit_at: t1 });
		assert_eq!(sched.finish(Generation(1)), Disposition::Discard);
		assert!(matches!(sched.state(), AnalysisState::PendingEdit { .. }));

		assert_eq!(sched.poll(t1 + DEBOUNCE), Poll::Ready);
		sched.begin(Generation(2));
		assert_eq!(sched.finish(Generation(2)), Disposition::Publish);
	}

	#[test]
	fn begin_requires_a_pending_edit() {
		let mut sched = AnalysisScheduler::new(DEBOUNCE);
		assert!(!sched.begin(Generation(1)));
		assert_eq!(sched.finish(Generation(1)), Disposition::Discard);
		assert_eq!(sched.state(), AnalysisState::Idle);
	}

	#[test]
	fn force_skips_the_remaining_window_once() {
		let t0 = Instant::now();
		let mut sched = AnalysisScheduler::new(DEBOUNCE);
		sched.force();
		assert_eq!(sched.poll(t0), Poll::Idle);

		sched.note_edit(t0);
		sched.force();
		assert_eq!(sched.poll(t0), Poll::Ready);
		sched.begin(Generation(1));
		sched.finish(Generation(1));

		sched.note_edit(t0);
		assert!(matches!(sched.poll(t0), Poll::Wait { .. }));
	}

	#[test]
	fn failed_pass_goes_back_to_pending() {
		let t0 = Instant::now();
		let mut sched = AnalysisScheduler::new(DEBOUNCE);
		sched.note_edit(t0);
		sched.begin(Generation(3));
		sched.retry(Generation(3), t0);
		assert_eq!(sched.state(), AnalysisState::PendingEdit { last_edit_at: t0 });
	}
}
