use std::path::PathBuf;

use clap::Parser;
use transcribe_batch::{
    engines::whisper::WhisperEngine, run_batch, BatchConfig, ComputeType, Device, EngineConfig,
};

#[derive(Parser, Debug)]
#[command(
    about = "Transcribe every WAV file under a directory with a pool of Whisper engines",
    version
)]
struct Args {
    /// Whisper model name (tiny, base.en, ...) or path to a ggml model file
    #[arg(short, long, default_value = "tiny")]
    model: String,

    /// Number of engines loaded side by side, one worker each
    #[arg(short = 's', long, visible_alias = "batch-size", default_value_t = 10)]
    pool_size: usize,

    /// Directory holding ggml model files
    #[arg(short = 'c', long, default_value = "/tmp/whisper-cache")]
    model_cache_dir: PathBuf,

    /// Device to run the engines on (cpu, cuda, auto)
    #[arg(short, long, default_value_t = Device::Cpu)]
    device: Device,

    /// GPU index used when the device is not cpu
    #[arg(short = 'i', long, default_value_t = 0)]
    device_index: i32,

    /// Weight precision (int8, int5, float16)
    #[arg(short = 't', long, default_value_t = ComputeType::Int8)]
    compute_type: ComputeType,

    /// Beam size for decoding
    #[arg(short, long, default_value_t = 5)]
    beam_size: i32,

    /// Language code, or "auto" to detect it per file
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Folder with the audio files to transcribe
    #[arg(short, long, default_value = "wavs")]
    audio: PathBuf,

    /// Folder receiving one JSON file per transcribed input
    #[arg(short, long, default_value = "transcripts")]
    output: PathBuf,

    /// Write failed inputs to this JSON-lines file
    #[arg(long)]
    failure_log: Option<PathBuf>,

    /// Do not print a line per finished file
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> BatchConfig {
        let language = match self.language.as_str() {
            "auto" | "" => None,
            code => Some(code.to_string()),
        };

        BatchConfig {
            source: self.audio,
            destination: self.output,
            pool_size: self.pool_size,
            failure_log: self.failure_log,
            quiet: self.quiet,
            engine: EngineConfig {
                model: self.model,
                device: self.device,
                device_index: self.device_index,
                compute_type: self.compute_type,
                model_cache_dir: self.model_cache_dir,
                beam_size: self.beam_size,
                language,
            },
            ..Default::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Args::parse().into_config();
    println!(
        "Initializing {} WhisperModel instance(s) ({})",
        config.pool_size, config.engine.model
    );

    let summary = run_batch(&config, |_| WhisperEngine::from_config(&config.engine))?;

    println!(
        "{} of {} file(s) transcribed, {} failed",
        summary.succeeded,
        summary.total,
        summary.failed()
    );
    for failure in &summary.failures {
        eprintln!("failed: {} ({})", failure.path.display(), failure.reason);
    }
    println!(
        "total time elapsed: {:.2} seconds",
        summary.elapsed.as_secs_f64()
    );

    Ok(())
}
