//! Recording collaborators shared by the pipeline tests.

use crate::chain::IncrementalUnit;
use crate::model::{
    AppBackupRequest, AppRestoreRequest, BackupContext, LastBackupDetail, ObjectVerOptions,
    RestoreContext,
};
use crate::plugin::{DataDirPolicy, DataMover};
use crate::services::{MetadataService, TransferService};
use crate::status::{MessageType, ProgressStatus, SessionReport};
use crate::utils::{Result, ServiceError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingStatus {
    reports: Mutex<Vec<SessionReport>>,
}

impl RecordingStatus {
    pub fn messages(&self) -> Vec<String> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn has(&self, message: &str) -> bool {
        self.messages().iter().any(|m| m == message)
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.messages().iter().any(|m| m.starts_with(prefix))
    }

    pub fn count_major(&self) -> usize {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.severity == MessageType::Major)
            .count()
    }
}

impl ProgressStatus for RecordingStatus {
    fn status_message(&self, report: SessionReport) {
        self.reports.lock().unwrap().push(report);
    }
}

/// Where the [`RecordingMover`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverFailure {
    Validate,
    FullBackup,
    IncrBackup,
    RestoreFull,
    Unit(u64),
}

#[derive(Default)]
pub struct RecordingMover {
    pub staged: bool,
    pub fail: Option<MoverFailure>,
    /// Leave a regular file where the log directory was so its teardown fails
    pub break_log_dir: bool,
    pub calls: Mutex<Vec<String>>,
    pub applied_units: Mutex<Vec<u64>>,
    pub seen_previous: Mutex<Option<ObjectVerOptions>>,
}

impl RecordingMover {
    pub fn staged() -> Self {
        Self {
            staged: true,
            ..Default::default()
        }
    }

    pub fn failing(fail: MoverFailure) -> Self {
        Self {
            fail: Some(fail),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn applied_units(&self) -> Vec<u64> {
        self.applied_units.lock().unwrap().clone()
    }

    fn record(&self, call: &str, failure: MoverFailure) -> Result<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.fail == Some(failure) {
            return Err(ServiceError::DataMover(format!("{} failed", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl DataMover for RecordingMover {
    fn backup_data_dir(&self, request: &AppBackupRequest) -> DataDirPolicy {
        if self.staged {
            DataDirPolicy::Staged
        } else {
            DataDirPolicy::Direct(request.app_options.dir_path.clone())
        }
    }

    fn restore_data_dir(&self, request: &AppRestoreRequest) -> DataDirPolicy {
        if self.staged {
            DataDirPolicy::Staged
        } else {
            DataDirPolicy::Direct(request.app_options.restore_dir_path.clone())
        }
    }

    async fn validate_backup(&self, _request: &AppBackupRequest) -> Result<()> {
        self.record("validate_backup", MoverFailure::Validate)
    }

    async fn do_full_backup(&self, _request: &AppBackupRequest, ctx: &BackupContext) -> Result<()> {
        if self.break_log_dir {
            std::fs::remove_dir_all(&ctx.log_dir)?;
            std::fs::write(&ctx.log_dir, b"not a directory")?;
        }
        self.record("do_full_backup", MoverFailure::FullBackup)
    }

    async fn do_incr_backup(
        &self,
        _request: &AppBackupRequest,
        _ctx: &BackupContext,
        previous: &ObjectVerOptions,
    ) -> Result<()> {
        *self.seen_previous.lock().unwrap() = Some(previous.clone());
        self.record("do_incr_backup", MoverFailure::IncrBackup)
    }

    async fn do_restore_full_backup(
        &self,
        _request: &AppRestoreRequest,
        _ctx: &RestoreContext,
    ) -> Result<()> {
        self.record("do_restore_full_backup", MoverFailure::RestoreFull)
    }

    async fn do_restore_incr_backup(
        &self,
        _request: &AppRestoreRequest,
        _ctx: &RestoreContext,
        unit: &IncrementalUnit,
    ) -> Result<()> {
        self.applied_units.lock().unwrap().push(unit.ordinal);
        self.record(
            &format!("do_restore_incr_backup {}", unit.ordinal),
            MoverFailure::Unit(unit.ordinal),
        )
    }
}

/// What a [`MockTransfer`] saw on the filesystem when it was called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDirs {
    pub data_dir: Option<PathBuf>,
    pub data_dir_existed: bool,
    pub log_dir: PathBuf,
    pub log_dir_existed: bool,
}

#[derive(Default)]
pub struct MockTransfer {
    pub fail: bool,
    /// Log entries laid out on `receive`
    pub chain: Vec<String>,
    pub sent: Mutex<Vec<(String, SentDirs)>>,
    pub receive_calls: Mutex<usize>,
}

impl MockTransfer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_chain(entries: &[&str]) -> Self {
        Self {
            chain: entries.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, SentDirs)> {
        self.sent.lock().unwrap().clone()
    }

    fn record_send(&self, kind: &str, ctx: &BackupContext) -> Result<()> {
        self.sent.lock().unwrap().push((
            kind.to_string(),
            SentDirs {
                data_dir: ctx.data_dir.clone(),
                data_dir_existed: ctx.data_dir.as_ref().is_some_and(|d| d.is_dir()),
                log_dir: ctx.log_dir.clone(),
                log_dir_existed: ctx.log_dir.is_dir(),
            },
        ));
        if self.fail {
            return Err(ServiceError::Transfer("media agent unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TransferService for MockTransfer {
    async fn send_full(&self, _request: &AppBackupRequest, ctx: &BackupContext) -> Result<()> {
        self.record_send("full", ctx)
    }

    async fn send_incremental(
        &self,
        _request: &AppBackupRequest,
        ctx: &BackupContext,
    ) -> Result<()> {
        self.record_send("incr", ctx)
    }

    async fn receive(&self, _request: &AppRestoreRequest, ctx: &RestoreContext) -> Result<()> {
        *self.receive_calls.lock().unwrap() += 1;
        if self.fail {
            return Err(ServiceError::Transfer("media agent unreachable".to_string()));
        }
        for entry in &self.chain {
            std::fs::create_dir_all(ctx.log_dir.join(entry))?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMetadata {
    pub fail: bool,
    pub detail: LastBackupDetail,
}

impl MockMetadata {
    pub fn with_detail(detail: LastBackupDetail) -> Self {
        Self {
            fail: false,
            detail,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MetadataService for MockMetadata {
    async fn get_last_backup_detail(
        &self,
        _app_type: &str,
        _app_name: &str,
        _app_id: &str,
        _source_host: &str,
    ) -> Result<LastBackupDetail> {
        if self.fail {
            return Err(ServiceError::Transfer("catalog unavailable".to_string()));
        }
        Ok(self.detail.clone())
    }
}
