use serde::Serialize;

/// Identifier of an open document, assigned by the editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Monotonic edit generation of a document.
///
/// Every applied edit carries a strictly larger generation than the one
/// before it. Analysis results are tagged with the generation they were
/// computed for so stale results can be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize)]
pub struct Generation(pub u64);

impl Generation {
	/// Generation of a freshly opened document.
	pub const INITIAL: Self = Self(0);

	/// Returns the generation following this one.
	#[must_use]
	pub fn next(self) -> Self {
		Self(self.0.wrapping_add(1))
	}
}

impl std::fmt::Display for Generation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "g{}", self.0)
	}
}
