use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::record::UpdateRecord;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct UpdatesFile<'a> {
    updates: &'a [UpdateRecord],
}

fn io_error(path: &Path) -> impl Fn(io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Deletes a file left at `path` by an earlier run. Nothing to do when there
/// is none.
pub fn remove_existing(path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    if path.exists() {
        log::info!("Removing existing file {}", path.display());
        fs::remove_file(path).map_err(io_error(path))?;
    }
    Ok(())
}

/// Replaces any file at `path` with `{"updates": [...]}`.
pub fn write_updates(path: impl AsRef<Path>, updates: &[UpdateRecord]) -> Result<(), OutputError> {
    let path = path.as_ref();
    remove_existing(path)?;

    let json = serde_json::to_string_pretty(&UpdatesFile { updates })?;
    fs::write(path, json).map_err(io_error(path))?;

    log::info!("Wrote {} update(s) to {}", updates.len(), path.display());
    Ok(())
}
