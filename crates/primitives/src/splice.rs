/// Replacement of a contiguous line range.
///
/// Old lines `start..old_end` were replaced by new lines `start..new_end`.
/// Lines before `start` are untouched; lines at or after `old_end` in the old
/// numbering shift to `line - old_end + new_end` in the new numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSplice {
	pub start: usize,
	pub old_end: usize,
	pub new_end: usize,
}

impl LineSplice {
	pub const fn new(start: usize, old_end: usize, new_end: usize) -> Self {
		debug_assert!(start <= old_end && start <= new_end);
		Self { start, old_end, new_end }
	}

	/// Number of lines the document grew (positive) or shrank (negative) by.
	pub fn line_delta(&self) -> isize {
		self.new_end as isize - self.old_end as isize
	}

	/// Number of lines in the new numbering that were replaced.
	pub fn new_len(&self) -> usize {
		self.new_end - self.start
	}

	/// Maps an old line number that lies outside the replaced range.
	///
	/// Returns `None` for lines inside `start..old_end`.
	pub fn map_old_line(&self, line: usize) -> Option<usize> {
		if line < self.start {
			Some(line)
		} else if line >= self.old_end {
			Some(line - self.old_end + self.new_end)
		} else {
			None
		}
	}

	/// Composes `self` (old → mid) with `next` (mid → new) into one splice (old → new).
	#[must_use]
	pub fn compose(self, next: LineSplice) -> LineSplice {
		let start = self.start.min(next.start);
		let mid_end = self.new_end.max(next.old_end);
		let old_end = mid_end - self.new_end + self.old_end;
		let new_end = mid_end - next.old_end + next.new_end;
		LineSplice { start, old_end, new_end }
	}
}
