//! Batch transcription of a directory tree.
//!
//! A batch runs in four steps:
//!
//! 1. Enumerate the audio files under the source root.
//! 2. Build a fixed pool of engines, one per worker.
//! 3. Start one worker thread per engine. Workers pull from a shared
//!    drain-only queue until it is empty, write one JSON result per
//!    transcribed file and bump the shared progress counter.
//! 4. Join the workers and summarize.
//!
//! A file that fails to transcribe gets no result file and is reported in
//! [`BatchSummary::failures`] (and in the optional failure log). It never
//! stops the batch.
//!
//! # Example
//!
//! ```rust,no_run
//! use transcribe_batch::{engines::whisper::WhisperEngine, run_batch, BatchConfig};
//!
//! let config = BatchConfig::new("wavs", "transcripts").with_pool_size(2);
//! let summary = run_batch(&config, |_| WhisperEngine::from_config(&config.engine))?;
//! println!("{} of {} transcribed", summary.succeeded, summary.total);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod enumerate;
mod failures;
mod output;
mod pool;
mod progress;
mod queue;
mod worker;

pub use enumerate::enumerate_inputs;
pub use failures::{write_failure_log, TaskFailure};
pub use output::{OutputPathMapper, RESULT_EXTENSION};
pub use pool::{EngineHandle, EnginePool};
pub use progress::ProgressTracker;
pub use queue::{Task, TaskQueue};
pub use worker::{TaskOutcome, TranscriptRecord, Worker, WorkerReport};

use std::thread;
use std::time::{Duration, Instant};

use crate::{BatchConfig, BatchError, TranscriptionEngine};

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Number of enumerated inputs.
    pub total: usize,
    /// Final value of the progress counter.
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<TaskFailure>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Transcribe every input under `config.source` into `config.destination`.
///
/// `factory` builds the engine for each pool slot. It is only called when
/// there is at least one input, and any error from it aborts the batch before
/// a worker starts.
pub fn run_batch<E, F>(config: &BatchConfig, factory: F) -> Result<BatchSummary, BatchError>
where
    E: TranscriptionEngine + Send,
    F: FnMut(usize) -> Result<E, Box<dyn std::error::Error>>,
{
    config.validate()?;
    let started = Instant::now();

    let inputs = enumerate_inputs(&config.source, &config.audio_extension)?;
    let total = inputs.len();
    if total == 0 {
        log::info!("No .{} files under {}", config.audio_extension, config.source.display());
        if let Some(path) = &config.failure_log {
            write_failure_log(path, &[])?;
        }
        return Ok(BatchSummary {
            elapsed: started.elapsed(),
            ..Default::default()
        });
    }

    let mapper = OutputPathMapper::new(&config.source, &config.destination);
    output::create_dir_all_retry(mapper.destination_root())?;

    let queue: TaskQueue = inputs.into_iter().map(Task::new).collect();
    let progress = if config.quiet {
        ProgressTracker::quiet(total)
    } else {
        ProgressTracker::new(total)
    };

    log::info!(
        "Initializing {} engine(s) for {} file(s)",
        config.pool_size,
        total
    );
    let pool = EnginePool::initialize(config.pool_size, factory)?;

    let joined: Vec<Result<WorkerReport, BatchError>> = thread::scope(|scope| {
        let running: Vec<_> = pool
            .into_handles()
            .into_iter()
            .map(|engine| {
                let index = engine.index();
                let worker = Worker::new(engine, &queue, &progress, &mapper);
                (index, scope.spawn(move || worker.run()))
            })
            .collect();

        running
            .into_iter()
            .map(|(index, handle)| handle.join().map_err(|_| BatchError::WorkerPanicked(index)))
            .collect()
    });

    let mut summary = BatchSummary {
        total,
        processed: progress.completed(),
        ..Default::default()
    };
    for report in joined {
        let report = report?;
        summary.succeeded += report.succeeded;
        summary.failures.extend(report.failures);
    }
    summary.failures.sort_by(|a, b| a.path.cmp(&b.path));
    summary.elapsed = started.elapsed();

    log::info!(
        "Batch finished: {} succeeded, {} failed in {:.2?}",
        summary.succeeded,
        summary.failed(),
        summary.elapsed
    );

    if let Some(path) = &config.failure_log {
        write_failure_log(path, &summary.failures)?;
    }

    Ok(summary)
}
