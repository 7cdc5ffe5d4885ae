pub mod audio;
pub mod batch;
pub mod config;
pub mod engines;
pub mod error;

use std::path::Path;

pub use batch::{run_batch, BatchSummary, TaskFailure};
pub use config::{BatchConfig, ComputeType, Device, EngineConfig};
pub use error::BatchError;

#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    pub text: String,
    pub segments: Vec<TranscriptionSegment>,
    pub language: String,
    pub language_probability: f32,
    /// Length of the transcribed audio in seconds.
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct TranscriptionSegment {
    pub start: f32,
    pub end: f32,
    pub text: String,
}

/// A stateful speech-to-text engine.
///
/// Implementations are not expected to be safe for concurrent use; the batch
/// dispatcher gives every worker its own instance.
pub trait TranscriptionEngine {
    type ModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn unload_model(&mut self);

    fn transcribe_samples(
        &mut self,
        samples: Vec<f32>,
    ) -> Result<TranscriptionResult, Box<dyn std::error::Error>>;

    fn transcribe_file(
        &mut self,
        wav_path: &Path,
    ) -> Result<TranscriptionResult, Box<dyn std::error::Error>> {
        let samples = audio::read_wav_samples(wav_path)?;
        self.transcribe_samples(samples)
    }
}
