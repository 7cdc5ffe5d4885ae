//! Audio loading for transcription engines.
//!
//! Engines consume 16 kHz mono PCM normalized to `[-1.0, 1.0]`. Decoding of
//! other containers or resampling is left to the caller.

use std::path::Path;

/// Sample rate every engine in this crate expects.
pub const SAMPLE_RATE: u32 = 16_000;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("failed to read WAV data")]
    Wav(#[from] hound::Error),
    #[error("expected {expected} channel(s), found {found}")]
    Channels { expected: u16, found: u16 },
    #[error("expected {expected} Hz sample rate, found {found} Hz")]
    SampleRate { expected: u32, found: u32 },
    #[error("expected {expected} bits per sample, found {found}")]
    BitsPerSample { expected: u16, found: u16 },
    #[error("expected integer PCM samples, found {0:?}")]
    SampleFormat(hound::SampleFormat),
}

/// Read a WAV file into normalized `f32` samples.
///
/// # Errors
///
/// Fails when the file cannot be opened or decoded, or when it is not
/// 16 kHz, mono, 16-bit integer PCM.
///
/// # Examples
///
/// ```rust,no_run
/// use transcribe_batch::audio::read_wav_samples;
/// use std::path::Path;
///
/// let samples = read_wav_samples(Path::new("audio.wav"))?;
/// println!("Loaded {} samples", samples.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn read_wav_samples(wav_path: &Path) -> Result<Vec<f32>, AudioError> {
    let mut reader = hound::WavReader::open(wav_path)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(AudioError::Channels {
            expected: 1,
            found: spec.channels,
        });
    }
    if spec.sample_rate != SAMPLE_RATE {
        return Err(AudioError::SampleRate {
            expected: SAMPLE_RATE,
            found: spec.sample_rate,
        });
    }
    if spec.bits_per_sample != 16 {
        return Err(AudioError::BitsPerSample {
            expected: 16,
            found: spec.bits_per_sample,
        });
    }
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(AudioError::SampleFormat(spec.sample_format));
    }

    let samples = reader
        .samples::<i16>()
        .map(|sample| sample.map(|s| (s as f32 / i16::MAX as f32).max(-1.0)))
        .collect::<Result<Vec<f32>, _>>()?;

    Ok(samples)
}

/// Duration in seconds of `sample_count` samples at [`SAMPLE_RATE`].
pub fn samples_duration(sample_count: usize) -> f64 {
    sample_count as f64 / SAMPLE_RATE as f64
}
