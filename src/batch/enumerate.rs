use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::BatchError;

/// Collect every regular file under `root` whose extension matches `extension`.
///
/// Entries are visited in file-name order at every level, so the result is
/// stable for an unchanged tree. Unreadable entries are skipped with a warning.
///
/// The extension must match exactly: `a.wav` and `a.WAV` would both map to
/// the same result file, so only one spelling is picked up.
pub fn enumerate_inputs(root: &Path, extension: &str) -> Result<Vec<PathBuf>, BatchError> {
    if !root.exists() {
        return Err(BatchError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(BatchError::NotADirectory(root.to_path_buf()));
    }

    let mut inputs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };

        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            inputs.push(entry.into_path());
        }
    }

    log::debug!("Found {} input file(s) under {}", inputs.len(), root.display());
    Ok(inputs)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == extension)
}
