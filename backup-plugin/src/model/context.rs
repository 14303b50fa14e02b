//! Per-invocation working state of a backup or restore run.

use super::options::{ObjectOptions, ObjectVerOptions};
use std::fmt;
use std::path::PathBuf;

/// Unique key of one backup/restore invocation.
///
/// The creation time fixes the version identity; the random suffix keeps
/// staging directories of sessions started in the same millisecond apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    created_ms: i64,
    suffix: String,
}

impl SessionKey {
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self {
            created_ms: chrono::Utc::now().timestamp_millis(),
            suffix: uuid[..8].to_string(),
        }
    }

    /// Build a key from known parts (tests and crash recovery).
    pub fn from_parts(created_ms: i64, suffix: impl Into<String>) -> Self {
        Self {
            created_ms,
            suffix: suffix.into(),
        }
    }

    pub fn created_ms(&self) -> i64 {
        self.created_ms
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.created_ms, self.suffix)
    }
}

#[derive(Debug, Clone)]
pub struct BackupContext {
    pub session: SessionKey,
    /// Full backup data; `None` for incrementals.
    pub data_dir: Option<PathBuf>,
    pub delete_data_dir_after_use: bool,
    /// Incremental data; empty for full backups.
    pub log_dir: PathBuf,
    pub delete_log_dir_after_use: bool,
    pub object_options: ObjectOptions,
    pub object_ver_options: ObjectVerOptions,
}

#[derive(Debug, Clone)]
pub struct RestoreContext {
    pub session: SessionKey,
    /// Landing place of the single full backup.
    pub data_dir: PathBuf,
    pub delete_data_dir_after_use: bool,
    /// Landing place of the ordered incremental chain.
    pub log_dir: PathBuf,
    pub delete_log_dir_after_use: bool,
}
