//! Incremental chain constraint.
//!
//! An incremental backup only means something relative to a well-defined
//! earlier point in time, so it needs the version options of the previous
//! backup and a positive timestamp in them.

use crate::model::{LastBackupDetail, ObjectVerOptions};
use crate::utils::{Result, ServiceError};

pub fn check_constraint(detail: &LastBackupDetail) -> Result<&ObjectVerOptions> {
    let options = detail
        .object_ver_options
        .as_ref()
        .ok_or(ServiceError::NoPriorBackup)?;

    if options.backup_time <= 0 {
        return Err(ServiceError::CorruptChainState(format!(
            "encountered invalid backup time of {}",
            options.backup_time
        )));
    }

    Ok(options)
}
