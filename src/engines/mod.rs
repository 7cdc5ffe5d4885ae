//! Speech recognition engines.
//!
//! Every engine implements [`crate::TranscriptionEngine`] and is meant to be
//! owned by a single worker. Engines are built from an
//! [`EngineConfig`](crate::EngineConfig), which the batch dispatcher passes
//! through without interpreting it.
//!
//! # Available Engines
//!
//! ## Whisper Engine
//!
//! whisper.cpp through `whisper-rs`:
//! - **Model Format**: single GGML file (`.bin`)
//! - **Resolution**: `<model_cache_dir>/ggml-<model><suffix>.bin`, where the
//!   suffix follows the compute type (`-q8_0` for int8, `-q5_1` for int5,
//!   none for float16). A model value that is a path to an existing file is
//!   used as-is.
//! - **Example**: `ggml-tiny-q8_0.bin`
//!
//! ```rust,no_run
//! use std::path::Path;
//! use transcribe_batch::{engines::whisper::WhisperEngine, EngineConfig, TranscriptionEngine};
//!
//! let mut engine = WhisperEngine::from_config(&EngineConfig::default())?;
//! let result = engine.transcribe_file(Path::new("audio.wav"))?;
//! println!("[{}] {}", result.language, result.text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod whisper;
