use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("source path does not exist: {0}")]
    PathNotFound(PathBuf),
    #[error("source path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("{path} is not under source root {source_root}")]
    PathMapping { source_root: PathBuf, path: PathBuf },
    #[error("failed to initialize engine {index}: {message}")]
    EngineInitialization { index: usize, message: String },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}
