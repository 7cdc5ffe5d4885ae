use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::failures::TaskFailure;
use super::output::OutputPathMapper;
use super::pool::EngineHandle;
use super::progress::ProgressTracker;
use super::queue::{Task, TaskQueue};
use crate::{BatchError, TranscriptionEngine, TranscriptionResult};

/// Contents of one result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub text: String,
    pub language: String,
    pub language_probability: f32,
    /// Audio length in seconds.
    pub sample_duration: f64,
    /// Seconds spent in the engine call. Engines that load their own audio
    /// (the WAV reader behind `transcribe_file`) include that time.
    pub runtime: f64,
}

impl TranscriptRecord {
    /// Build a record from an engine result, rejecting non-finite numbers.
    pub fn from_result(result: TranscriptionResult, runtime: f64) -> Result<Self, String> {
        if !result.language_probability.is_finite() {
            return Err(format!(
                "engine reported language probability {}",
                result.language_probability
            ));
        }
        if !result.duration.is_finite() {
            return Err(format!("engine reported duration {}", result.duration));
        }

        Ok(Self {
            text: result.text,
            language: result.language,
            language_probability: result.language_probability.clamp(0.0, 1.0),
            sample_duration: result.duration.max(0.0),
            runtime: runtime.max(0.0),
        })
    }
}

/// What a worker got back from its engine for one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Transcribed(TranscriptRecord),
    /// No partial data survives a failure; `reason` is only for reporting.
    Failed { reason: String },
}

#[derive(Debug, Default)]
pub struct WorkerReport {
    pub worker: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<TaskFailure>,
}

/// Drains the shared queue through one exclusively owned engine.
pub struct Worker<'a, E: TranscriptionEngine> {
    engine: EngineHandle<E>,
    queue: &'a TaskQueue,
    progress: &'a ProgressTracker,
    mapper: &'a OutputPathMapper,
}

impl<'a, E: TranscriptionEngine> Worker<'a, E> {
    pub fn new(
        engine: EngineHandle<E>,
        queue: &'a TaskQueue,
        progress: &'a ProgressTracker,
        mapper: &'a OutputPathMapper,
    ) -> Self {
        Self {
            engine,
            queue,
            progress,
            mapper,
        }
    }

    /// Process tasks until the queue is empty. Task failures never stop the loop.
    pub fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport {
            worker: self.engine.index(),
            ..Default::default()
        };

        while let Some(task) = self.queue.try_take() {
            match self.process(&task) {
                Ok(written) => {
                    report.succeeded += 1;
                    self.progress.increment(Some(&written));
                }
                Err(reason) => {
                    log::warn!(
                        "Worker {} failed on {}: {}",
                        report.worker,
                        task.path().display(),
                        reason
                    );
                    report.failures.push(TaskFailure {
                        path: task.path().to_path_buf(),
                        reason,
                    });
                    self.progress.increment(None);
                }
            }
            report.processed += 1;
        }

        log::debug!(
            "Worker {} finished after {} task(s)",
            report.worker,
            report.processed
        );
        report
    }

    fn process(&mut self, task: &Task) -> Result<PathBuf, String> {
        let destination = self.mapper.map(task.path()).map_err(|err| describe(&err))?;

        match self.engine.transcribe(task.path()) {
            TaskOutcome::Transcribed(record) => {
                if let Err(err) = self.write_record(task.path(), &record) {
                    remove_stale_output(&destination);
                    return Err(describe(&err));
                }
                Ok(destination)
            }
            TaskOutcome::Failed { reason } => {
                remove_stale_output(&destination);
                Err(reason)
            }
        }
    }

    /// Write the record next to its final path, then rename it into place so
    /// a failed write never leaves a truncated result behind.
    fn write_record(&self, source: &Path, record: &TranscriptRecord) -> Result<(), BatchError> {
        let destination = self.mapper.prepare(source)?;
        let json = serde_json::to_string_pretty(record)?;
        let temp_path = temp_path_for(&destination);

        let written =
            fs::write(&temp_path, json).and_then(|()| fs::rename(&temp_path, &destination));
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(BatchError::Write {
                path: destination,
                source,
            });
        }
        Ok(())
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn remove_stale_output(destination: &Path) {
    match fs::remove_file(destination) {
        Ok(()) => log::debug!("Removed stale output {}", destination.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::warn!(
            "Could not remove stale output {}: {}",
            destination.display(),
            err
        ),
    }
}

fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
