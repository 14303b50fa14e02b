//! Backup and restore requests.
//!
//! The host hands over a generic envelope ([`BackupRequest`] /
//! [`RestoreRequest`]) whose `app_options` are opaque JSON. Validation turns
//! it into the typed [`AppBackupRequest`] / [`AppRestoreRequest`] the
//! orchestrator works with.

use crate::utils::{Result, ServiceError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupType {
    Full,
    Incr,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Full => "full",
            BackupType::Incr => "incr",
        }
    }
}

impl fmt::Display for BackupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("full") {
            Ok(BackupType::Full)
        } else if s.eq_ignore_ascii_case("incr") {
            Ok(BackupType::Incr)
        } else {
            Err(ServiceError::InvalidRequest(format!(
                "unsupported backup type '{}'",
                s
            )))
        }
    }
}

/// Backup request envelope as received from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    pub app_host: String,
    pub session_id: String,
    pub backup_type: String,
    #[serde(default)]
    pub barlist: Option<String>,
    #[serde(default)]
    pub concurrency: Option<u32>,
    #[serde(default)]
    pub app_options: serde_json::Value,
}

/// Restore request envelope as received from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub app_host: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub barlist: Option<String>,
    #[serde(default)]
    pub app_options: serde_json::Value,
}

impl BackupRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }
}

impl RestoreRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupAppOptions {
    pub app_name: String,
    pub app_id: String,
    pub dir_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreAppOptions {
    /// Authoritative session id; the envelope copy may carry escaping artefacts.
    pub session_id: String,
    pub app_name: String,
    pub app_id: String,
    pub restore_dir_path: PathBuf,
}

/// Validated backup request.
#[derive(Debug, Clone)]
pub struct AppBackupRequest {
    pub app_host: String,
    pub session_id: String,
    pub backup_type: BackupType,
    pub barlist: Option<String>,
    pub concurrency: Option<u32>,
    pub app_options: BackupAppOptions,
}

/// Validated restore request.
#[derive(Debug, Clone)]
pub struct AppRestoreRequest {
    pub app_host: String,
    pub barlist: Option<String>,
    pub app_options: RestoreAppOptions,
}

impl AppRestoreRequest {
    pub fn session_id(&self) -> &str {
        &self.app_options.session_id
    }
}

impl TryFrom<&BackupRequest> for AppBackupRequest {
    type Error = ServiceError;

    fn try_from(request: &BackupRequest) -> Result<Self> {
        require("appHost", &request.app_host)?;
        let backup_type = request.backup_type.parse()?;
        let app_options: BackupAppOptions = parse_app_options(&request.app_options)?;
        require("appOptions.appName", &app_options.app_name)?;
        require("appOptions.appId", &app_options.app_id)?;
        require_path("appOptions.dirPath", &app_options.dir_path)?;

        Ok(Self {
            app_host: request.app_host.clone(),
            session_id: request.session_id.clone(),
            backup_type,
            barlist: request.barlist.clone(),
            concurrency: request.concurrency,
            app_options,
        })
    }
}

impl TryFrom<&RestoreRequest> for AppRestoreRequest {
    type Error = ServiceError;

    fn try_from(request: &RestoreRequest) -> Result<Self> {
        require("appHost", &request.app_host)?;
        let app_options: RestoreAppOptions = parse_app_options(&request.app_options)?;
        require("appOptions.sessionId", &app_options.session_id)?;
        require("appOptions.appName", &app_options.app_name)?;
        require("appOptions.appId", &app_options.app_id)?;
        require_path("appOptions.restoreDirPath", &app_options.restore_dir_path)?;

        Ok(Self {
            app_host: request.app_host.clone(),
            barlist: request.barlist.clone(),
            app_options,
        })
    }
}

fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| ServiceError::InvalidRequest(e.to_string()))
}

fn parse_app_options<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T> {
    if value.is_null() {
        return Err(ServiceError::InvalidRequest(
            "appOptions must not be null".to_string(),
        ));
    }
    T::deserialize(value)
        .map_err(|e| ServiceError::InvalidRequest(format!("appOptions: {}", e)))
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidRequest(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

fn require_path(field: &str, value: &std::path::Path) -> Result<()> {
    require(field, &value.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;
    use serde_json::json;

    fn envelope(backup_type: &str, app_options: serde_json::Value) -> BackupRequest {
        BackupRequest {
            app_host: "host-a".to_string(),
            session_id: "2024/01/01-1".to_string(),
            backup_type: backup_type.to_string(),
            barlist: None,
            concurrency: None,
            app_options,
        }
    }

    #[test]
    fn test_backup_type_case_insensitive() {
        assert_eq!("FULL".parse::<BackupType>().unwrap(), BackupType::Full);
        assert_eq!("Incr".parse::<BackupType>().unwrap(), BackupType::Incr);
        assert!("diff".parse::<BackupType>().is_err());
    }

    #[test]
    fn test_valid_backup_request() {
        let raw = envelope(
            "incr",
            json!({"appName": "Home", "appId": "srv1", "dirPath": "/data/app"}),
        );
        let req = AppBackupRequest::try_from(&raw).unwrap();
        assert_eq!(req.backup_type, BackupType::Incr);
        assert_eq!(req.app_options.dir_path, PathBuf::from("/data/app"));
    }

    #[test]
    fn test_missing_app_option_is_invalid() {
        let raw = envelope("full", json!({"appName": "Home", "dirPath": "/data"}));
        let err = AppBackupRequest::try_from(&raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_empty_app_option_is_invalid() {
        let raw = envelope(
            "full",
            json!({"appName": " ", "appId": "srv1", "dirPath": "/data"}),
        );
        let err = AppBackupRequest::try_from(&raw).unwrap_err();
        assert!(err.to_string().contains("appOptions.appName"));
    }

    #[test]
    fn test_restore_envelope_from_json() {
        let raw = RestoreRequest::from_json(
            r#"{"appHost":"host-a","appOptions":{"sessionId":"2024/01/01-1","appName":"Home","appId":"srv1","restoreDirPath":"/restore"}}"#,
        )
        .unwrap();
        let req = AppRestoreRequest::try_from(&raw).unwrap();
        assert_eq!(req.session_id(), "2024/01/01-1");

        let err = RestoreRequest::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
