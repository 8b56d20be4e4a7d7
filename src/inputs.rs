//! Expand CLI path arguments into the list of image files to process.
//!
//! Files are taken as given, whatever their extension; the sanitizer sniffs
//! the content anyway. Directories are walked recursively and contribute only
//! files with a JPEG, PNG or GIF extension. Hidden entries (dot-prefixed) are
//! skipped. Each directory's files come back sorted, and arguments keep their
//! command-line order.

use crate::imaging::MediaFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("No such file or directory: {0}")]
    NotFound(PathBuf),
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, InputError> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            inputs.extend(images_in_dir(path)?);
        } else if path.is_file() {
            inputs.push(path.clone());
        } else {
            return Err(InputError::NotFound(path.clone()));
        }
    }
    Ok(inputs)
}

fn images_in_dir(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let mut images = Vec::new();
    let walker = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|source| InputError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_supported_image(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(MediaFormat::from_file_name)
        .is_some()
}
