use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Count of finished tasks in one batch.
///
/// The progress line is printed while the lock is held, so printed counts
/// are strictly increasing even when several workers finish at once.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: Mutex<usize>,
    total: usize,
    quiet: bool,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            completed: Mutex::new(0),
            total,
            quiet: false,
        }
    }

    pub fn quiet(total: usize) -> Self {
        Self {
            quiet: true,
            ..Self::new(total)
        }
    }

    /// Record one finished task and return the new count.
    ///
    /// `written` is the output file of a successful task, `None` for a failure.
    pub fn increment(&self, written: Option<&Path>) -> usize {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        let count = *completed;

        if !self.quiet {
            match written {
                Some(path) => println!("[{}/{}] {}", count, self.total, path.display()),
                None => println!("[{}/{}] failed", count, self.total),
            }
        }
        count
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
