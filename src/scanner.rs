use crate::error::ScanError;
use crate::models::FileMeta;
use crate::utils;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files and folders found directly inside the target directory
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Canonical absolute form of the scanned directory
    pub root: PathBuf,
    /// Regular files under `root`, sorted by path
    pub files: Vec<FileMeta>,
    /// Names of sub-directories that already exist
    pub existing_dirs: Vec<String>,
}

/// List the files directly inside `dir` (no recursion)
///
/// Paths are absolute even when `dir` is relative. Hidden entries are
/// skipped. An entry that cannot be inspected is logged and skipped; only a
/// problem with `dir` itself is an error.
pub fn scan_directory(dir: &Path) -> Result<ScanResult, ScanError> {
    if !dir.exists() {
        return Err(ScanError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    // walkdir reports an unreadable root as an entry error; check up front
    std::fs::read_dir(dir).map_err(|source| ScanError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    let root = dir.canonicalize().map_err(|source| ScanError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut result = ScanResult {
        root: root.clone(),
        ..ScanResult::default()
    };

    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            result.existing_dirs.push(name);
            continue;
        }
        if !file_type.is_file() {
            debug!("Skipping non-regular entry: {}", entry.path().display());
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping {}: cannot read metadata: {}", entry.path().display(), e);
                continue;
            }
        };

        let path = entry.path().to_path_buf();
        let extension = utils::get_extension(&path);
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        result
            .files
            .push(FileMeta::new(path, metadata.len(), extension, modified));
    }

    debug!(
        "Scanned {}: {} files, {} existing folders",
        dir.display(),
        result.files.len(),
        result.existing_dirs.len()
    );

    Ok(result)
}
