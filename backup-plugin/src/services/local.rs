//! Directory-backed media agent.
//!
//! Stores every backup version under
//! `<store>/<app_type>/<app_name>/<app_id>/versions/<seq>/{data,log}` and keeps
//! an ordered `catalog.json` of version records next to it. Used by the host
//! binary and by end-to-end tests in place of a remote media agent.

use super::{MetadataService, TransferService};
use crate::chain::FULL_BACKUP_ENTRY;
use crate::fs;
use crate::model::{
    AppBackupRequest, AppRestoreRequest, BackupContext, BackupType, LastBackupDetail,
    ObjectOptions, ObjectVerOptions, RestoreContext,
};
use crate::utils::{Result, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const CATALOG_FILE: &str = "catalog.json";

/// One stored backup version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub seq: u64,
    pub session_id: String,
    pub backup_type: BackupType,
    pub backup_time: i64,
    pub source_client: String,
    pub app_name: String,
    pub app_id: String,
    #[serde(default)]
    pub barlist: Option<String>,
    pub object_options: ObjectOptions,
    pub object_ver_options: ObjectVerOptions,
}

pub struct LocalMediaAgent {
    store: Store,
    // Serializes catalog read-modify-write cycles
    lock: Mutex<()>,
}

impl LocalMediaAgent {
    pub fn new(store_dir: impl Into<PathBuf>, app_type: impl Into<String>) -> Self {
        Self {
            store: Store {
                root: store_dir.into(),
                app_type: app_type.into(),
            },
            lock: Mutex::new(()),
        }
    }

    /// All versions recorded for an application identity, oldest first.
    pub async fn versions(&self, app_name: &str, app_id: &str) -> Result<Vec<VersionRecord>> {
        let store = self.store.clone();
        let object_dir = store.object_dir(app_name, app_id);
        run_blocking(move |_| store.load_catalog(&object_dir)).await
    }

    async fn send(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
        data_dir: Option<PathBuf>,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;

        let store = self.store.clone();
        let object_dir = store.object_dir(
            &context.object_options.app_name,
            &context.object_options.app_id,
        );
        let log_dir = context.log_dir.clone();
        let mut record = VersionRecord {
            seq: 0,
            session_id: request.session_id.clone(),
            backup_type: context.object_ver_options.backup_type,
            backup_time: context.object_ver_options.backup_time,
            source_client: context.object_ver_options.source_client.clone(),
            app_name: context.object_options.app_name.clone(),
            app_id: context.object_options.app_id.clone(),
            barlist: request.barlist.clone(),
            object_options: context.object_options.clone(),
            object_ver_options: context.object_ver_options.clone(),
        };

        run_blocking(move |stop| {
            let mut catalog = store.load_catalog(&object_dir)?;
            record.seq = catalog.last().map(|r| r.seq + 1).unwrap_or(1);

            let version_dir = object_dir.join("versions").join(record.seq.to_string());
            // Leftovers of an interrupted send with the same seq
            fs::remove_dir_recursive(&version_dir)?;

            if let Some(data_dir) = &data_dir {
                let target = version_dir.join("data");
                fs::create_dir(&target)?;
                let stats = fs::copy_all(data_dir, &target, stop)?;
                debug!("Stored {} data files for version {}", stats.files, record.seq);
            }

            let target = version_dir.join("log");
            fs::create_dir(&target)?;
            let stats = fs::copy_all(&log_dir, &target, stop)?;
            debug!("Stored {} log files for version {}", stats.files, record.seq);

            info!(
                "Recorded {} backup version {} for {}/{}",
                record.backup_type, record.seq, record.app_name, record.app_id
            );
            catalog.push(record);
            store.save_catalog(&object_dir, &catalog)
        })
        .await
    }
}

#[async_trait]
impl TransferService for LocalMediaAgent {
    async fn send_full(&self, request: &AppBackupRequest, context: &BackupContext) -> Result<()> {
        let data_dir = context.data_dir.clone().ok_or_else(|| {
            ServiceError::Transfer("full backup has no data directory".to_string())
        })?;
        self.send(request, context, Some(data_dir)).await
    }

    async fn send_incremental(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
    ) -> Result<()> {
        self.send(request, context, None).await
    }

    async fn receive(&self, request: &AppRestoreRequest, context: &RestoreContext) -> Result<()> {
        let _guard = self.lock.lock().await;

        let store = self.store.clone();
        let object_dir = store.object_dir(
            &request.app_options.app_name,
            &request.app_options.app_id,
        );
        let session_id = request.session_id().to_string();
        let data_dir = context.data_dir.clone();
        let log_dir = context.log_dir.clone();

        run_blocking(move |stop| {
            let catalog = store.load_catalog(&object_dir)?;
            let chain = chain_for_session(&catalog, &session_id)?;
            let versions = object_dir.join("versions");

            let full = chain[0];
            fs::copy_all(
                &versions.join(full.seq.to_string()).join("data"),
                &data_dir,
                stop,
            )?;

            for (ordinal, record) in chain.iter().enumerate() {
                let name = if ordinal == 0 {
                    FULL_BACKUP_ENTRY.to_string()
                } else {
                    ordinal.to_string()
                };
                let target = log_dir.join(name);
                fs::create_dir(&target)?;
                fs::copy_all(
                    &versions.join(record.seq.to_string()).join("log"),
                    &target,
                    stop,
                )?;
            }

            info!(
                "Received chain of {} versions ending at session {}",
                chain.len(),
                session_id
            );
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MetadataService for LocalMediaAgent {
    async fn get_last_backup_detail(
        &self,
        app_type: &str,
        app_name: &str,
        app_id: &str,
        source_host: &str,
    ) -> Result<LastBackupDetail> {
        if app_type != self.store.app_type {
            return Ok(LastBackupDetail::none());
        }

        let catalog = self.versions(app_name, app_id).await?;
        Ok(catalog
            .into_iter()
            .rev()
            .find(|r| r.source_client == source_host)
            .map(|r| LastBackupDetail::from_version(r.object_ver_options))
            .unwrap_or_default())
    }
}

/// The chain restoring the version of `session_id`: the nearest full backup
/// at or before it, then every later version up to and including it. Only
/// versions of the same source client take part; incrementals of one host are
/// computed against that host's previous backup, never another host's.
fn chain_for_session<'a>(
    catalog: &'a [VersionRecord],
    session_id: &str,
) -> std::io::Result<Vec<&'a VersionRecord>> {
    let end = catalog
        .iter()
        .rposition(|r| r.session_id == session_id)
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no backup version for session {}", session_id),
            )
        })?;
    let source_client = &catalog[end].source_client;

    let mut chain: Vec<&VersionRecord> = catalog[..=end]
        .iter()
        .filter(|r| r.source_client == *source_client)
        .collect();
    let start = chain
        .iter()
        .rposition(|r| r.backup_type == BackupType::Full)
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "session {} has no full backup from {} in its chain",
                    session_id, source_client
                ),
            )
        })?;
    Ok(chain.split_off(start))
}

#[derive(Debug, Clone)]
struct Store {
    root: PathBuf,
    app_type: String,
}

impl Store {
    fn object_dir(&self, app_name: &str, app_id: &str) -> PathBuf {
        self.root
            .join(sanitize(&self.app_type))
            .join(sanitize(app_name))
            .join(sanitize(app_id))
    }

    fn load_catalog(&self, object_dir: &Path) -> std::io::Result<Vec<VersionRecord>> {
        match std::fs::read_to_string(object_dir.join(CATALOG_FILE)) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn save_catalog(&self, object_dir: &Path, catalog: &[VersionRecord]) -> std::io::Result<()> {
        fs::create_dir(object_dir)?;
        let json = serde_json::to_string_pretty(catalog)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = object_dir.join(format!("{}.tmp", CATALOG_FILE));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, object_dir.join(CATALOG_FILE))
    }
}

/// Make an identity component safe to use as a single path segment.
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

/// Run store work on the blocking pool; the token passed to `work` is
/// cancelled if the caller's future is dropped first.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CancellationToken) -> std::io::Result<T> + Send + 'static,
{
    let stop = CancellationToken::new();
    let _stop_on_drop = stop.clone().drop_guard();
    tokio::task::spawn_blocking(move || work(&stop))
        .await
        .map_err(|e| ServiceError::Transfer(format!("media agent task failed: {}", e)))?
        .map_err(|e| ServiceError::Transfer(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64, session: &str, backup_type: BackupType) -> VersionRecord {
        record_from("host-a", seq, session, backup_type)
    }

    fn record_from(
        host: &str,
        seq: u64,
        session: &str,
        backup_type: BackupType,
    ) -> VersionRecord {
        let ver = ObjectVerOptions {
            source_client: host.to_string(),
            backup_type,
            backup_time: seq as i64 * 1000,
        };
        VersionRecord {
            seq,
            session_id: session.to_string(),
            backup_type,
            backup_time: ver.backup_time,
            source_client: ver.source_client.clone(),
            app_name: "Home".to_string(),
            app_id: "srv1".to_string(),
            barlist: None,
            object_options: ObjectOptions::default(),
            object_ver_options: ver,
        }
    }

    #[test]
    fn test_chain_for_session_walks_back_to_full() {
        let catalog = vec![
            record(1, "s1", BackupType::Full),
            record(2, "s2", BackupType::Incr),
            record(3, "s3", BackupType::Full),
            record(4, "s4", BackupType::Incr),
            record(5, "s5", BackupType::Incr),
        ];

        let chain = chain_for_session(&catalog, "s5").unwrap();
        assert_eq!(chain.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![3, 4, 5]);

        let chain = chain_for_session(&catalog, "s2").unwrap();
        assert_eq!(chain.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![1, 2]);

        let chain = chain_for_session(&catalog, "s3").unwrap();
        assert_eq!(chain.len(), 1);

        assert!(chain_for_session(&catalog, "unknown").is_err());
    }

    #[test]
    fn test_chain_ignores_other_source_clients() {
        let catalog = vec![
            record_from("host-a", 1, "a-full", BackupType::Full),
            record_from("host-b", 2, "b-full", BackupType::Full),
            record_from("host-a", 3, "a-incr", BackupType::Incr),
            record_from("host-b", 4, "b-incr", BackupType::Incr),
            record_from("host-a", 5, "a-incr2", BackupType::Incr),
        ];

        let chain = chain_for_session(&catalog, "a-incr2").unwrap();
        assert_eq!(chain.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![1, 3, 5]);

        let chain = chain_for_session(&catalog, "b-incr").unwrap();
        assert_eq!(chain.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_chain_without_full_backup_from_same_client() {
        let catalog = vec![
            record_from("host-b", 1, "b-full", BackupType::Full),
            record_from("host-a", 2, "a-incr", BackupType::Incr),
        ];
        assert!(chain_for_session(&catalog, "a-incr").is_err());
    }

    #[test]
    fn test_chain_without_full_backup() {
        let catalog = vec![record(1, "s1", BackupType::Incr)];
        assert!(chain_for_session(&catalog, "s1").is_err());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("srv1.example.com"), "srv1.example.com");
        assert_eq!(sanitize("../etc"), ".._etc");
        assert_eq!(sanitize(".."), "__");
        assert_eq!(sanitize("a/b c"), "a_b_c");
    }

    #[tokio::test]
    async fn test_last_backup_detail_for_empty_store() -> Result<()> {
        let store = tempfile::TempDir::new()?;
        let agent = LocalMediaAgent::new(store.path(), "SampleFS");
        let detail = agent
            .get_last_backup_detail("SampleFS", "Home", "srv1", "host-a")
            .await?;
        assert_eq!(detail, LastBackupDetail::none());
        Ok(())
    }
}
