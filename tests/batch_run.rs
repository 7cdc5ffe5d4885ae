use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use transcribe_batch::{
    audio::{read_wav_samples, samples_duration},
    batch::TranscriptRecord,
    run_batch, BatchConfig, BatchError, TranscriptionEngine, TranscriptionResult,
};

#[derive(Default)]
struct Calls {
    files: Mutex<Vec<(usize, ThreadId, PathBuf)>>,
    unloads: AtomicUsize,
    built: AtomicUsize,
}

struct MockEngine {
    id: usize,
    calls: Arc<Calls>,
}

impl MockEngine {
    fn factory(
        calls: &Arc<Calls>,
    ) -> impl FnMut(usize) -> Result<MockEngine, Box<dyn std::error::Error>> + '_ {
        move |id| {
            calls.built.fetch_add(1, Ordering::SeqCst);
            Ok(MockEngine {
                id,
                calls: Arc::clone(calls),
            })
        }
    }
}

impl TranscriptionEngine for MockEngine {
    type ModelParams = ();

    fn load_model_with_params(
        &mut self,
        _model_path: &Path,
        _params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    fn unload_model(&mut self) {
        self.calls.unloads.fetch_add(1, Ordering::SeqCst);
    }

    fn transcribe_samples(
        &mut self,
        samples: Vec<f32>,
    ) -> Result<TranscriptionResult, Box<dyn std::error::Error>> {
        Ok(TranscriptionResult {
            text: format!("{} samples", samples.len()),
            segments: Vec::new(),
            language: "en".to_string(),
            language_probability: 0.9,
            duration: samples_duration(samples.len()),
        })
    }

    fn transcribe_file(
        &mut self,
        wav_path: &Path,
    ) -> Result<TranscriptionResult, Box<dyn std::error::Error>> {
        self.calls
            .files
            .lock()
            .unwrap()
            .push((self.id, thread::current().id(), wav_path.to_path_buf()));
        thread::sleep(Duration::from_millis(2));
        if wav_path.ends_with("panic.wav") {
            panic!("engine crashed on {}", wav_path.display());
        }
        let samples = read_wav_samples(wav_path)?;
        self.transcribe_samples(samples)
    }
}

fn write_wav(path: &Path, sample_count: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..sample_count {
        writer.write_sample((i % 100) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn write_broken(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"not a wav file").unwrap();
}

fn config(source: &Path, destination: &Path, pool_size: usize) -> BatchConfig {
    BatchConfig {
        quiet: true,
        ..BatchConfig::new(source, destination).with_pool_size(pool_size)
    }
}

fn read_record(path: &Path) -> TranscriptRecord {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if !root.exists() {
        return found;
    }
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

#[test]
fn mirrors_source_tree_into_destination() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    write_wav(&source.join("a.wav"), 16_000);
    write_wav(&source.join("sub/b.wav"), 8_000);

    let calls = Arc::new(Calls::default());
    let summary = run_batch(&config(&source, &destination, 2), MockEngine::factory(&calls)).unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 2);
    assert!(summary.failures.is_empty());
    assert!(destination.join("sub").is_dir());

    let a = read_record(&destination.join("a.json"));
    assert_eq!(a.text, "16000 samples");
    assert_eq!(a.language, "en");
    assert_eq!(a.sample_duration, 1.0);
    assert!((0.0..=1.0).contains(&a.language_probability));
    assert!(a.runtime >= 0.0);

    let b = read_record(&destination.join("sub/b.json"));
    assert_eq!(b.sample_duration, 0.5);

    assert_eq!(calls.built.load(Ordering::SeqCst), 2);
    assert_eq!(calls.unloads.load(Ordering::SeqCst), 2);
}

#[test]
fn empty_source_finishes_without_touching_engines() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("notes.txt"), b"not audio").unwrap();

    let calls = Arc::new(Calls::default());
    let summary = run_batch(
        &config(&source, &temp_dir.path().join("out"), 3),
        MockEngine::factory(&calls),
    )
    .unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.processed, 0);
    assert_eq!(calls.built.load(Ordering::SeqCst), 0);
    assert!(calls.files.lock().unwrap().is_empty());
}

#[test]
fn failed_file_is_counted_but_writes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    write_wav(&source.join("good.wav"), 160);
    write_broken(&source.join("bad.wav"));

    let calls = Arc::new(Calls::default());
    let summary = run_batch(&config(&source, &destination, 2), MockEngine::factory(&calls)).unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].path, source.join("bad.wav"));
    assert_eq!(files_under(&destination), vec![destination.join("good.json")]);
}

#[test]
fn engine_panic_fails_one_file_and_the_worker_continues() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    write_wav(&source.join("a.wav"), 160);
    write_wav(&source.join("panic.wav"), 160);
    write_wav(&source.join("z.wav"), 160);

    let calls = Arc::new(Calls::default());
    let summary = run_batch(&config(&source, &destination, 1), MockEngine::factory(&calls)).unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].path, source.join("panic.wav"));
    assert!(summary.failures[0].reason.contains("engine crashed"));
    assert_eq!(
        files_under(&destination),
        vec![destination.join("a.json"), destination.join("z.json")]
    );
    assert_eq!(calls.built.load(Ordering::SeqCst), 1);
    assert_eq!(calls.unloads.load(Ordering::SeqCst), 1);
}

#[test]
fn differently_cased_extension_is_not_picked_up() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    write_wav(&source.join("a.wav"), 160);
    write_broken(&source.join("a.WAV"));

    let calls = Arc::new(Calls::default());
    let summary = run_batch(&config(&source, &destination, 2), MockEngine::factory(&calls)).unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(summary.failures.is_empty());
    assert_eq!(read_record(&destination.join("a.json")).text, "160 samples");
}

#[test]
fn every_task_runs_once_on_an_exclusively_owned_engine() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    for i in 0..40 {
        let path = source.join(format!("dir{}/clip{i}.wav", i % 3));
        if i % 7 == 0 {
            write_broken(&path);
        } else {
            write_wav(&path, 32);
        }
    }

    let calls = Arc::new(Calls::default());
    let summary = run_batch(&config(&source, &destination, 4), MockEngine::factory(&calls)).unwrap();

    assert_eq!(summary.total, 40);
    assert_eq!(summary.processed, 40);
    assert_eq!(summary.succeeded + summary.failed(), 40);
    assert_eq!(summary.failed(), 6);

    let files = calls.files.lock().unwrap();
    let unique: HashSet<&PathBuf> = files.iter().map(|(_, _, path)| path).collect();
    assert_eq!(files.len(), 40);
    assert_eq!(unique.len(), 40);

    let mut threads_per_engine: HashMap<usize, HashSet<ThreadId>> = HashMap::new();
    for (engine, thread, _) in files.iter() {
        threads_per_engine.entry(*engine).or_default().insert(*thread);
    }
    assert!(threads_per_engine.values().all(|threads| threads.len() == 1));

    assert_eq!(files_under(&destination).len(), summary.succeeded);
}

#[test]
fn engine_initialization_failure_aborts_the_batch() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    write_wav(&source.join("a.wav"), 16);

    let calls = Arc::new(Calls::default());
    let mut build = MockEngine::factory(&calls);
    let result = run_batch(&config(&source, &destination, 3), |index| {
        if index == 1 {
            let err: Box<dyn std::error::Error> =
                Box::new(io::Error::new(io::ErrorKind::NotFound, "missing model"));
            return Err(err);
        }
        build(index)
    });

    match result {
        Err(BatchError::EngineInitialization { index, message }) => {
            assert_eq!(index, 1);
            assert!(message.contains("missing model"));
        }
        other => panic!("expected initialization error, got {other:?}"),
    }
    assert_eq!(calls.built.load(Ordering::SeqCst), 1);
    assert_eq!(calls.unloads.load(Ordering::SeqCst), 1);
    assert!(calls.files.lock().unwrap().is_empty());
    assert!(files_under(&destination).is_empty());
}

#[test]
fn missing_source_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("nowhere");

    let calls = Arc::new(Calls::default());
    let result = run_batch(
        &config(&source, &temp_dir.path().join("out"), 1),
        MockEngine::factory(&calls),
    );

    assert!(matches!(result, Err(BatchError::PathNotFound(path)) if path == source));
}

#[test]
fn zero_pool_size_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();

    let calls = Arc::new(Calls::default());
    let result = run_batch(
        &config(temp_dir.path(), &temp_dir.path().join("out"), 0),
        MockEngine::factory(&calls),
    );

    assert!(matches!(result, Err(BatchError::InvalidConfig(_))));
}

#[test]
fn rerun_overwrites_outputs_and_drops_stale_ones() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    write_wav(&source.join("a.wav"), 320);
    write_wav(&source.join("b.wav"), 640);
    let calls = Arc::new(Calls::default());
    let batch = config(&source, &destination, 2);

    run_batch(&batch, MockEngine::factory(&calls)).unwrap();
    let first = read_record(&destination.join("a.json"));

    run_batch(&batch, MockEngine::factory(&calls)).unwrap();
    let second = read_record(&destination.join("a.json"));
    assert_eq!(first.text, second.text);
    assert_eq!(first.sample_duration, second.sample_duration);
    assert_eq!(files_under(&destination).len(), 2);

    write_broken(&source.join("b.wav"));
    let summary = run_batch(&batch, MockEngine::factory(&calls)).unwrap();
    assert_eq!(summary.failed(), 1);
    assert_eq!(files_under(&destination), vec![destination.join("a.json")]);
}

#[test]
fn failure_log_lists_failed_inputs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = temp_dir.path().join("src");
    let destination = temp_dir.path().join("out");
    let log_path = temp_dir.path().join("failures.jsonl");
    write_wav(&source.join("ok.wav"), 16);
    write_broken(&source.join("sub/broken.wav"));

    let calls = Arc::new(Calls::default());
    let batch = BatchConfig {
        failure_log: Some(log_path.clone()),
        ..config(&source, &destination, 1)
    };
    run_batch(&batch, MockEngine::factory(&calls)).unwrap();

    let content = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0]["path"].as_str().unwrap(),
        source.join("sub/broken.wav").to_str().unwrap()
    );
    assert!(!lines[0]["reason"].as_str().unwrap().is_empty());
}
