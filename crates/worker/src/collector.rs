use rustc_hash::FxHashMap;
use tokio::task::JoinHandle;

use crate::{TaskClass, spawn};

/// Identifier of a task owned by a [`TaskCollector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Owns blocking jobs and reaps their results without awaiting.
///
/// Callers drive it from a synchronous tick: [`TaskCollector::drain_finished`]
/// polls each handle once and returns whatever has completed. Jobs that
/// panicked are logged and dropped.
#[derive(Debug)]
pub struct TaskCollector<T> {
	next_id: u64,
	tasks: FxHashMap<u64, JoinHandle<T>>,
}

impl<T> Default for TaskCollector<T> {
	fn default() -> Self {
		Self {
			next_id: 0,
			tasks: FxHashMap::default(),
		}
	}
}

impl<T: Send + 'static> TaskCollector<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Spawns `job` on the blocking pool and tracks its handle.
	pub fn spawn_blocking<F>(&mut self, class: TaskClass, job: F) -> std::io::Result<TaskId>
	where
		F: FnOnce() -> T + Send + 'static,
	{
		let handle = spawn::spawn_blocking(class, job)?;
		let id = self.next_id;
		self.next_id = self.next_id.wrapping_add(1);
		self.tasks.insert(id, handle);
		Ok(TaskId(id))
	}

	/// Removes and returns the output of every finished task.
	pub fn drain_finished(&mut self) -> Vec<T> {
		let mut done = Vec::new();
		self.tasks.retain(|id, handle| match quill_primitives::future::poll_once(handle) {
			None => true,
			Some(Ok(output)) => {
				done.push(output);
				false
			}
			Some(Err(error)) => {
				tracing::error!(task_id = id, %error, "worker.task_failed");
				false
			}
		});
		done
	}

	/// Waits for every tracked task and returns their outputs in spawn order.
	pub async fn join_all(&mut self) -> Vec<T> {
		let mut pending: Vec<_> = self.tasks.drain().collect();
		pending.sort_unstable_by_key(|(id, _)| *id);
		let mut done = Vec::with_capacity(pending.len());
		for (id, handle) in pending {
			match handle.await {
				Ok(output) => done.push(output),
				Err(error) => tracing::error!(task_id = id, %error, "worker.task_failed"),
			}
		}
		done
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}
}
