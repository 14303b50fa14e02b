//! Collaborators the orchestrators depend on: the media agent that stores
//! backup bytes and the catalog that remembers backup versions.

pub mod local;

use crate::model::{
    AppBackupRequest, AppRestoreRequest, BackupContext, LastBackupDetail, RestoreContext,
};
use crate::utils::Result;
use async_trait::async_trait;

pub use local::LocalMediaAgent;

/// Moves bytes between local staging directories and the media agent.
///
/// Implementations own retries; the orchestrators report and re-raise
/// whatever error comes back.
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Send `data_dir` and `log_dir` of a full backup.
    async fn send_full(&self, request: &AppBackupRequest, context: &BackupContext) -> Result<()>;

    /// Send `log_dir` of an incremental backup.
    async fn send_incremental(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
    ) -> Result<()>;

    /// Receive the chain ending at the requested session: the full backup
    /// into `data_dir`, and its log plus every later incremental into
    /// `log_dir/<ordinal>`.
    async fn receive(&self, request: &AppRestoreRequest, context: &RestoreContext) -> Result<()>;
}

/// Looks up previously recorded backup versions.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Most recent version for the identity, or an empty detail if none.
    async fn get_last_backup_detail(
        &self,
        app_type: &str,
        app_name: &str,
        app_id: &str,
        source_host: &str,
    ) -> Result<LastBackupDetail>;
}
