//! Directory listing and raw text reads for activity exports.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::TrendError;

/// Entries that live next to the exports but never hold workout data.
pub const IGNORED_FILE_NAMES: &[&str] = &[".gitignore", ".DS_Store", "Thumbs.db"];

pub fn is_ignored(name: &str) -> bool {
    IGNORED_FILE_NAMES.contains(&name)
}

/// List the entry names of `dir`, sorted so repeated runs see the same order.
pub fn list_entries(dir: &Path) -> Result<Vec<String>, TrendError> {
    let read_dir = fs::read_dir(dir).map_err(|source| TrendError::DirectoryNotFound {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| TrendError::DirectoryNotFound {
            path: dir.to_path_buf(),
            source,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Read one directory entry as text.
///
/// Returns `Ok(None)` for names on the ignore list and for sub-directories;
/// neither is opened. Content is not validated here.
pub fn read_entry(dir: &Path, name: &str) -> Result<Option<String>, TrendError> {
    if is_ignored(name) {
        debug!("Skipping non-data file {}", name);
        return Ok(None);
    }
    let path = dir.join(name);
    if path.is_dir() {
        debug!("Skipping sub-directory {}", path.display());
        return Ok(None);
    }
    let bytes = fs::read(&path).map_err(|source| TrendError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
