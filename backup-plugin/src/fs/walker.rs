//! Directory traversal with modification times.
//!
//! Incremental backups select files by mtime, so every discovered file
//! carries its modification time in milliseconds since the Unix epoch.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links (files behind links are reported as files)
    pub follow_links: bool,
}

/// Information about a regular file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// Last modification time (ms since Unix epoch)
    pub modified_ms: i64,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Self> {
        let metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        Ok(Self {
            path,
            relative_path,
            modified_ms: modified_ms(&metadata)?,
        })
    }
}

/// Modification time of `metadata` in milliseconds since the Unix epoch.
/// Times before the epoch are reported as negative values.
pub fn modified_ms(metadata: &std::fs::Metadata) -> std::io::Result<i64> {
    let modified = metadata.modified()?;
    Ok(match modified.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    })
}

/// Walk a directory tree and collect all regular files.
///
/// Without `follow_links`, symbolic links are skipped entirely; with it, the
/// link targets are walked as if they were part of the tree.
pub fn walk_directory(root: &Path, options: &WalkOptions) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(options.follow_links) {
        let entry = entry?;

        if !entry.file_type().is_file() {
            continue;
        }

        files.push(FileInfo::from_entry(&entry, root)?);
    }

    Ok(files)
}
