//! Metadata persisted alongside every backup version.

use super::request::BackupType;
use serde::{Deserialize, Serialize};

/// Identifies the protected application; stored once per object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOptions {
    pub app_name: String,
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_paths: Option<Vec<String>>,
}

/// Per-version metadata. `backup_time` (ms since epoch) is the boundary the
/// next incremental backup copies changes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectVerOptions {
    pub source_client: String,
    pub backup_type: BackupType,
    pub backup_time: i64,
}

/// Snapshot of the most recent version recorded for an application identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastBackupDetail {
    #[serde(default)]
    pub object_ver_options: Option<ObjectVerOptions>,
    #[serde(default)]
    pub backup_type: Option<BackupType>,
}

impl LastBackupDetail {
    /// Detail for an identity with no recorded versions.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_version(options: ObjectVerOptions) -> Self {
        Self {
            backup_type: Some(options.backup_type),
            object_ver_options: Some(options),
        }
    }
}
