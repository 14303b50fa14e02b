//! Filesystem data mover.
//!
//! Protects a single directory tree. By default no staging is used: full
//! backups are sent straight from the source directory and full restores land
//! straight in the (empty) target directory. Incrementals carry every file
//! whose mtime is newer than the previous backup.

use super::{DataDirPolicy, DataMover};
use crate::chain::IncrementalUnit;
use crate::fs::{self, CopyStats};
use crate::model::{
    AppBackupRequest, AppRestoreRequest, BackupContext, ObjectVerOptions, RestoreContext,
};
use crate::utils::{Result, ServiceError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct FsDataMover {
    follow_symlinks: bool,
    staged: bool,
}

impl FsDataMover {
    pub fn new(follow_symlinks: bool) -> Self {
        Self {
            follow_symlinks,
            staged: false,
        }
    }

    /// Copy full backups through a staging directory instead of sending the
    /// live tree.
    pub fn with_staging(mut self, staged: bool) -> Self {
        self.staged = staged;
        self
    }
}

#[async_trait]
impl DataMover for FsDataMover {
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

    async fn do_full_backup(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
    ) -> Result<()> {
        let data_dir = match (&context.data_dir, self.staged) {
            (Some(dir), true) => dir.clone(),
            _ => {
                debug!("Full backup is sent directly from the source directory");
                return Ok(());
            }
        };

        let source = request.app_options.dir_path.clone();
        let stats = blocking_copy(source, data_dir, fs::copy_all).await?;
        info!("Staged {} files ({} bytes) for full backup", stats.files, stats.bytes);
        Ok(())
    }

    async fn do_incr_backup(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
        previous: &ObjectVerOptions,
    ) -> Result<()> {
        let since = previous.backup_time;
        let follow = self.follow_symlinks;

        let stats = blocking_copy(
            request.app_options.dir_path.clone(),
            context.log_dir.clone(),
            move |src, dst, stop| fs::copy_changed_since(src, dst, since, follow, stop),
        )
        .await?;
        info!(
            "{} files ({} bytes) modified since {} staged for incremental backup",
            stats.files, stats.bytes, since
        );
        Ok(())
    }

    async fn do_restore_full_backup(
        &self,
        request: &AppRestoreRequest,
        context: &RestoreContext,
    ) -> Result<()> {
        let target = &request.app_options.restore_dir_path;
        if context.data_dir == *target {
            debug!("Full backup was received directly into {}", target.display());
            return Ok(());
        }

        let stats = blocking_copy(context.data_dir.clone(), target.clone(), fs::copy_all).await?;
        info!("Restored {} files ({} bytes) from full backup", stats.files, stats.bytes);
        Ok(())
    }

    async fn do_restore_incr_backup(
        &self,
        request: &AppRestoreRequest,
        _context: &RestoreContext,
        unit: &IncrementalUnit,
    ) -> Result<()> {
        let stats = blocking_copy(
            unit.path.clone(),
            request.app_options.restore_dir_path.clone(),
            fs::copy_all,
        )
        .await?;
        debug!(
            "Incremental {} restored {} files ({} bytes)",
            unit.ordinal, stats.files, stats.bytes
        );
        Ok(())
    }
}

/// Run `copy` on the blocking pool. Dropping the returned future cancels the
/// token handed to `copy`, which then stops before its next file instead of
/// writing into directories the staging guard is about to remove.
async fn blocking_copy<F>(src: PathBuf, dst: PathBuf, copy: F) -> Result<CopyStats>
where
    F: FnOnce(&Path, &Path, &CancellationToken) -> std::io::Result<CopyStats> + Send + 'static,
{
    let label = format!("{} -> {}", src.display(), dst.display());
    let stop = CancellationToken::new();
    let _stop_on_drop = stop.clone().drop_guard();
    tokio::task::spawn_blocking(move || copy(&src, &dst, &stop))
        .await
        .map_err(|e| ServiceError::DataMover(format!("copy task failed: {}", e)))?
        .map_err(|e| ServiceError::DataMover(format!("copy {} failed: {}", label, e)))
}
