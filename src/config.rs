//! Batch and engine configuration.
//!
//! The dispatcher only reads the batch-level fields. [`EngineConfig`] is handed
//! untouched to whatever engine factory builds the pool.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the engine runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
    /// Use a GPU when the engine was built with one.
    Auto,
}

impl Device {
    pub fn uses_gpu(self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            "auto" => Ok(Device::Auto),
            other => Err(format!("unknown device '{other}' (expected cpu, cuda or auto)")),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Numeric precision of the model weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComputeType {
    #[default]
    Int8,
    Int5,
    Float16,
}

impl ComputeType {
    /// Suffix of the ggml model file carrying weights at this precision.
    pub fn model_suffix(self) -> &'static str {
        match self {
            ComputeType::Int8 => "-q8_0",
            ComputeType::Int5 => "-q5_1",
            ComputeType::Float16 => "",
        }
    }
}

impl FromStr for ComputeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int8" | "q8_0" => Ok(ComputeType::Int8),
            "int5" | "q5_1" => Ok(ComputeType::Int5),
            "float16" | "f16" => Ok(ComputeType::Float16),
            other => Err(format!(
                "unknown compute type '{other}' (expected int8, int5 or float16)"
            )),
        }
    }
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeType::Int8 => "int8",
            ComputeType::Int5 => "int5",
            ComputeType::Float16 => "float16",
        };
        f.write_str(name)
    }
}

/// Settings shared by every engine instance in a pool.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Model name (`tiny`, `base.en`, ...) or a path to a model file.
    pub model: String,
    pub device: Device,
    pub device_index: i32,
    pub compute_type: ComputeType,
    pub model_cache_dir: PathBuf,
    pub beam_size: i32,
    /// Language hint; `None` lets the engine detect it.
    pub language: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "tiny".to_string(),
            device: Device::Cpu,
            device_index: 0,
            compute_type: ComputeType::Int8,
            model_cache_dir: PathBuf::from("/tmp/whisper-cache"),
            beam_size: 5,
            language: Some("en".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Number of engines, and therefore of workers.
    pub pool_size: usize,
    /// Extension (without the dot) of files picked up from `source`.
    pub audio_extension: String,
    /// JSON-lines file listing failed inputs, written after the batch.
    pub failure_log: Option<PathBuf>,
    /// Suppress the per-task progress lines.
    pub quiet: bool,
    pub engine: EngineConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("wavs"),
            destination: PathBuf::from("transcripts"),
            pool_size: 10,
            audio_extension: "wav".to_string(),
            failure_log: None,
            quiet: false,
            engine: EngineConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn validate(&self) -> Result<(), crate::BatchError> {
        if self.pool_size == 0 {
            return Err(crate::BatchError::InvalidConfig(
                "pool size must be at least 1".to_string(),
            ));
        }
        if self.audio_extension.is_empty() {
            return Err(crate::BatchError::InvalidConfig(
                "audio extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
