//! Data model shared by the orchestrators, plugins and collaborators.

pub mod context;
pub mod options;
pub mod request;

pub use context::{BackupContext, RestoreContext, SessionKey};
pub use options::{LastBackupDetail, ObjectOptions, ObjectVerOptions};
pub use request::{
    AppBackupRequest, AppRestoreRequest, BackupAppOptions, BackupRequest, BackupType,
    RestoreAppOptions, RestoreRequest,
};
