use quill_primitives::Generation;
use tokio_util::sync::CancellationToken;

/// Cancellation token tagged with the document generation it serves.
///
/// A job holding a token for generation `g` is superseded as soon as any
/// newer generation exists; the owner cancels the token and the job notices
/// at its next checkpoint.
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: Generation,
	cancel: CancellationToken,
}

impl GenerationToken {
	pub fn new(generation: Generation) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
		}
	}

	pub const fn generation(&self) -> Generation {
		self.generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cancel_is_seen_by_every_clone() {
		let token = GenerationToken::new(Generation(4));
		let job_side = token.clone();
		assert!(!job_side.is_cancelled());
		token.cancel();
		assert!(job_side.is_cancelled());
		assert_eq!(job_side.generation(), Generation(4));
	}
}
