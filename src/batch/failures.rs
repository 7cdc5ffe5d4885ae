use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::output::create_dir_all_retry;
use crate::BatchError;

/// An input that produced no result file, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Write one JSON object per failure, one per line.
pub fn write_failure_log(path: &Path, failures: &[TaskFailure]) -> Result<(), BatchError> {
    let write_error = |source: std::io::Error| BatchError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all_retry(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(write_error)?);
    for failure in failures {
        serde_json::to_writer(&mut writer, failure)?;
        writer.write_all(b"\n").map_err(write_error)?;
    }
    writer.flush().map_err(write_error)?;

    log::info!(
        "Wrote {} failure(s) to {}",
        failures.len(),
        path.display()
    );
    Ok(())
}
