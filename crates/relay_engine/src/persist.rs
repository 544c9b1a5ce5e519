use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("parent directory of {path:?} missing or not a directory")]
    ParentDir { path: PathBuf },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Replace the file at `path` with `content` by writing a sibling temp file
/// and renaming it over the target. Readers never observe a half-written file.
///
/// The temp file is created owner-readable only, and the rename keeps that mode,
/// which suits credential files.
pub fn write_atomically(path: &Path, content: &str) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(PersistError::ParentDir {
            path: path.to_path_buf(),
        });
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;

    if path.exists() {
        fs::remove_file(path)?;
    }
    tmp.persist(path).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}
