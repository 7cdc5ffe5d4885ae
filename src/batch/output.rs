use std::fs;
use std::path::{Path, PathBuf};

use crate::BatchError;

/// Extension of the result files.
pub const RESULT_EXTENSION: &str = "json";

/// Maps source files to result files mirroring the source layout.
#[derive(Debug, Clone)]
pub struct OutputPathMapper {
    source_root: PathBuf,
    destination_root: PathBuf,
}

impl OutputPathMapper {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
        }
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Compute the result path for `source_file` without touching the filesystem.
    pub fn map(&self, source_file: &Path) -> Result<PathBuf, BatchError> {
        let relative = source_file
            .strip_prefix(&self.source_root)
            .ok()
            .filter(|relative| relative.file_name().is_some())
            .ok_or_else(|| BatchError::PathMapping {
                source_root: self.source_root.clone(),
                path: source_file.to_path_buf(),
            })?;

        Ok(self
            .destination_root
            .join(relative)
            .with_extension(RESULT_EXTENSION))
    }

    /// Like [`OutputPathMapper::map`], and also create the missing parent directories.
    pub fn prepare(&self, source_file: &Path) -> Result<PathBuf, BatchError> {
        let destination = self.map(source_file)?;
        if let Some(parent) = destination.parent() {
            create_dir_all_retry(parent)?;
        }
        Ok(destination)
    }
}

/// `create_dir_all`, retried once so a lost creation race is not an error.
pub(crate) fn create_dir_all_retry(dir: &Path) -> Result<(), BatchError> {
    if let Err(first) = fs::create_dir_all(dir) {
        log::debug!("Retrying creation of {}: {}", dir.display(), first);
        fs::create_dir_all(dir).map_err(|source| BatchError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
