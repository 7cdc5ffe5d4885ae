use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

use super::worker::{TaskOutcome, TranscriptRecord};
use crate::{BatchError, TranscriptionEngine};

/// Exclusive ownership of one engine instance.
///
/// A handle is moved into exactly one worker and never shared, which is what
/// keeps a non-thread-safe engine from being called concurrently. The model is
/// unloaded when the handle is dropped.
pub struct EngineHandle<E: TranscriptionEngine> {
    index: usize,
    engine: E,
}

impl<E: TranscriptionEngine> EngineHandle<E> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Run the engine on one file, timing the call.
    ///
    /// Engine errors and engine panics both come back as
    /// [`TaskOutcome::Failed`], so one bad file cannot take the worker down.
    pub fn transcribe(&mut self, path: &Path) -> TaskOutcome {
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.engine.transcribe_file(path)));
        let runtime = started.elapsed().as_secs_f64();

        match result {
            Ok(Ok(result)) => TranscriptRecord::from_result(result, runtime)
                .map(TaskOutcome::Transcribed)
                .unwrap_or_else(|reason| TaskOutcome::Failed { reason }),
            Ok(Err(err)) => TaskOutcome::Failed {
                reason: err.to_string(),
            },
            Err(payload) => TaskOutcome::Failed {
                reason: format!("engine panicked: {}", panic_message(payload.as_ref())),
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

impl<E: TranscriptionEngine> Drop for EngineHandle<E> {
    fn drop(&mut self) {
        self.engine.unload_model();
        log::debug!("Released engine {}", self.index);
    }
}

/// Fixed set of engines built up front, one per worker.
pub struct EnginePool<E: TranscriptionEngine> {
    handles: Vec<EngineHandle<E>>,
}

impl<E: TranscriptionEngine> EnginePool<E> {
    /// Build exactly `size` engines with `factory`, called once per slot index.
    ///
    /// The first factory failure aborts initialization; engines built so far
    /// are released before the error is returned.
    pub fn initialize<F>(size: usize, mut factory: F) -> Result<Self, BatchError>
    where
        F: FnMut(usize) -> Result<E, Box<dyn std::error::Error>>,
    {
        if size == 0 {
            return Err(BatchError::InvalidConfig(
                "engine pool needs at least one engine".to_string(),
            ));
        }

        let mut handles = Vec::with_capacity(size);
        for index in 0..size {
            let started = Instant::now();
            let engine = factory(index).map_err(|err| BatchError::EngineInitialization {
                index,
                message: err.to_string(),
            })?;
            log::info!(
                "Engine {}/{} ready in {:.2?}",
                index + 1,
                size,
                started.elapsed()
            );
            handles.push(EngineHandle { index, engine });
        }

        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Hand the engines out, one per worker.
    pub fn into_handles(self) -> Vec<EngineHandle<E>> {
        self.handles
    }
}
