//! Application-specific data movement.
//!
//! The orchestrators own sequencing, staging and transfer; everything that
//! depends on what is being protected goes through a [`DataMover`].

pub mod samplefs;

use crate::chain::IncrementalUnit;
use crate::model::{
    AppBackupRequest, AppRestoreRequest, BackupContext, ObjectVerOptions, RestoreContext,
};
use crate::utils::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Where the full backup data lives during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataDirPolicy {
    /// A system-owned staging directory, removed after use.
    Staged,
    /// The live source (backup) or final target (restore). Never removed.
    Direct(PathBuf),
}

#[async_trait]
pub trait DataMover: Send + Sync {
    fn backup_data_dir(&self, _request: &AppBackupRequest) -> DataDirPolicy {
        DataDirPolicy::Staged
    }

    fn restore_data_dir(&self, _request: &AppRestoreRequest) -> DataDirPolicy {
        DataDirPolicy::Staged
    }

    /// Extra checks beyond the generic request validation.
    async fn validate_backup(&self, _request: &AppBackupRequest) -> Result<()> {
        Ok(())
    }

    async fn validate_restore(&self, _request: &AppRestoreRequest) -> Result<()> {
        Ok(())
    }

    /// Produce the full backup in `context.data_dir`.
    async fn do_full_backup(&self, request: &AppBackupRequest, context: &BackupContext)
        -> Result<()>;

    /// Stage everything changed since `previous` into `context.log_dir`.
    async fn do_incr_backup(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
        previous: &ObjectVerOptions,
    ) -> Result<()>;

    /// Turn the received full backup in `context.data_dir` into restored data.
    async fn do_restore_full_backup(
        &self,
        request: &AppRestoreRequest,
        context: &RestoreContext,
    ) -> Result<()>;

    /// Apply a single incremental unit on top of the restored data.
    async fn do_restore_incr_backup(
        &self,
        request: &AppRestoreRequest,
        context: &RestoreContext,
        unit: &IncrementalUnit,
    ) -> Result<()>;
}
