use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One input file waiting to be transcribed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    path: PathBuf,
}

impl Task {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Drain-only queue shared by the workers of one batch.
///
/// The queue is filled before any worker starts and only shrinks afterwards,
/// so [`TaskQueue::try_take`] never waits: `None` means the batch is drained.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the queue. Only meant for the single-threaded setup phase.
    pub fn put(&self, task: Task) {
        self.lock().push_back(task);
    }

    pub fn try_take(&self) -> Option<Task> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A worker that panicked mid-batch cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FromIterator<Task> for TaskQueue {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self {
            pending: Mutex::new(iter.into_iter().collect()),
        }
    }
}
