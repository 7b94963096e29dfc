/// Execution classes used for worker scheduling and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work the user is waiting on, e.g. a flush before an
	/// explicit completion request.
	Interactive,
	/// CPU-bound blocking work such as a debounced relex/index pass.
	CpuBlocking,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::CpuBlocking => "cpu_blocking",
		}
	}
}
