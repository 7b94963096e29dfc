use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

/// Handle of the ambient runtime, or of a small shared fallback runtime when
/// called from outside any runtime (e.g. the CLI).
pub(crate) fn runtime_handle() -> std::io::Result<tokio::runtime::Handle> {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return Ok(handle);
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	if let Some(runtime) = GLOBAL_RT.get() {
		return Ok(runtime.handle().clone());
	}
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.worker_threads(2)
		.thread_name("quill-worker-global")
		.build()?;
	Ok(GLOBAL_RT.get_or_init(|| runtime).handle().clone())
}

/// Spawns blocking work on the runtime's blocking pool.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> std::io::Result<JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	Ok(runtime_handle()?.spawn_blocking(f))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn falls_back_to_the_global_runtime_outside_tokio() {
		assert!(tokio::runtime::Handle::try_current().is_err());
		let handle = spawn_blocking(TaskClass::Interactive, || 6 * 7).unwrap();
		let out = runtime_handle().unwrap().block_on(handle).unwrap();
		assert_eq!(out, 42);
	}
}
