use crate::{audio, EngineConfig, TranscriptionEngine, TranscriptionResult, TranscriptionSegment};
use std::path::{Path, PathBuf};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

#[derive(Debug, Clone, Default)]
pub struct WhisperModelParams {
    pub use_gpu: bool,
    pub gpu_device: i32,
}

impl From<&EngineConfig> for WhisperModelParams {
    fn from(config: &EngineConfig) -> Self {
        Self {
            use_gpu: config.device.uses_gpu(),
            gpu_device: config.device_index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WhisperInferenceParams {
    pub language: Option<String>,
    pub beam_size: i32,
    pub n_threads: usize,
    pub suppress_blank: bool,
    pub suppress_non_speech_tokens: bool,
    pub no_speech_thold: f32,
}

impl Default for WhisperInferenceParams {
    fn default() -> Self {
        let n_threads = std::thread::available_parallelism()
            .map(|n| n.get().min(4))
            .unwrap_or(1);
        Self {
            language: None,
            beam_size: 5,
            n_threads,
            suppress_blank: true,
            suppress_non_speech_tokens: true,
            no_speech_thold: 0.2,
        }
    }
}

impl From<&EngineConfig> for WhisperInferenceParams {
    fn from(config: &EngineConfig) -> Self {
        Self {
            language: config.language.clone(),
            beam_size: config.beam_size,
            ..Default::default()
        }
    }
}

/// Locate the GGML model file described by `config`.
pub fn resolve_model_path(config: &EngineConfig) -> PathBuf {
    let direct = Path::new(&config.model);
    if direct.is_file() {
        return direct.to_path_buf();
    }
    config.model_cache_dir.join(format!(
        "ggml-{}{}.bin",
        config.model,
        config.compute_type.model_suffix()
    ))
}

pub struct WhisperEngine {
    loaded_model_path: Option<PathBuf>,
    state: Option<whisper_rs::WhisperState>,
    context: Option<whisper_rs::WhisperContext>,
    params: WhisperInferenceParams,
}

impl Default for WhisperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WhisperEngine {
    pub fn new() -> Self {
        Self::with_params(WhisperInferenceParams::default())
    }

    pub fn with_params(params: WhisperInferenceParams) -> Self {
        Self {
            loaded_model_path: None,
            state: None,
            context: None,
            params,
        }
    }

    /// Build an engine and load the model `config` points at.
    pub fn from_config(config: &EngineConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let model_path = resolve_model_path(config);
        if !model_path.is_file() {
            return Err(format!(
                "model file not found: {} (expected the {} ggml model for '{}')",
                model_path.display(),
                config.compute_type,
                config.model
            )
            .into());
        }

        let mut engine = Self::with_params(WhisperInferenceParams::from(config));
        engine.load_model_with_params(&model_path, WhisperModelParams::from(config))?;
        log::info!(
            "Loaded {} on {} (device {})",
            model_path.display(),
            config.device,
            config.device_index
        );
        Ok(engine)
    }

    pub fn loaded_model_path(&self) -> Option<&Path> {
        self.loaded_model_path.as_deref()
    }
}

impl TranscriptionEngine for WhisperEngine {
    type ModelParams = WhisperModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = model_path
            .to_str()
            .ok_or_else(|| format!("model path is not valid UTF-8: {}", model_path.display()))?;

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu = params.use_gpu;
        context_params.gpu_device = params.gpu_device;

        let context = WhisperContext::new_with_params(path, context_params)?;
        let state = context.create_state()?;

        self.context = Some(context);
        self.state = Some(state);
        self.loaded_model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.loaded_model_path = None;
        self.state = None;
        self.context = None;
    }

    fn transcribe_samples(
        &mut self,
        samples: Vec<f32>,
    ) -> Result<TranscriptionResult, Box<dyn std::error::Error>> {
        let state = self
            .state
            .as_mut()
            .ok_or("Model not loaded. Call load_model_with_params() first.")?;

        if samples.is_empty() {
            return Err("audio contains no samples".into());
        }

        let params = &self.params;
        let language = params.language.clone();

        // A forced language is certain; otherwise keep the detector's confidence.
        let detected_probability = match language {
            Some(_) => None,
            None => {
                state.pcm_to_mel(&samples, params.n_threads)?;
                let (lang_id, probs) = state.lang_detect(0, params.n_threads)?;
                usize::try_from(lang_id)
                    .ok()
                    .and_then(|id| probs.get(id).copied())
            }
        };

        let mut full_params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: params.beam_size,
            patience: -1.0,
        });
        full_params.set_language(language.as_deref());
        full_params.set_n_threads(params.n_threads as i32);
        full_params.set_print_special(false);
        full_params.set_print_progress(false);
        full_params.set_print_realtime(false);
        full_params.set_print_timestamps(false);
        full_params.set_suppress_blank(params.suppress_blank);
        full_params.set_suppress_non_speech_tokens(params.suppress_non_speech_tokens);
        full_params.set_no_speech_thold(params.no_speech_thold);

        state.full(full_params, &samples)?;

        let num_segments = state.full_n_segments()?;
        let mut segments = Vec::new();
        let mut texts = Vec::new();

        for i in 0..num_segments {
            let text = state.full_get_segment_text(i)?;
            let start = state.full_get_segment_t0(i)? as f32 / 100.0;
            let end = state.full_get_segment_t1(i)? as f32 / 100.0;

            texts.push(text.trim().to_string());
            segments.push(TranscriptionSegment { start, end, text });
        }

        let language = match language {
            Some(code) => code,
            None => whisper_rs::get_lang_str(state.full_lang_id_from_state()?)
                .unwrap_or("unknown")
                .to_string(),
        };

        Ok(TranscriptionResult {
            text: texts.join(" ").trim().to_string(),
            segments,
            language,
            language_probability: detected_probability.unwrap_or(1.0),
            duration: audio::samples_duration(samples.len()),
        })
    }
}
