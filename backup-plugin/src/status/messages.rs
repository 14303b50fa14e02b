//! Human-readable session messages written to the progress sink.

pub const START_FULL_BACKUP: &str = "Starting full backup.";
pub const START_INCREMENTAL_BACKUP: &str = "Starting incremental backup.";
pub const GET_LAST_BACKUP_DETAILS: &str = "Retrieving last backup details.";
pub const INCREMENTAL_REQUIRES_PREVIOUS_BACKUP: &str =
    "Incremental backup requires previous backup.";
pub const TRANSFER_TO_MA: &str =
    "Transferring backup data to Media Agent. This may take a while.";
pub const TRANSFER_TO_MA_COMPLETED: &str = "Transfer of backup data to Media Agent is complete.";
pub const START_RESTORE: &str = "Starting restore.";
pub const TRANSFER_FROM_MA: &str =
    "Transferring backup data from Media Agent. This may take a while.";
pub const TRANSFER_FROM_MA_COMPLETED: &str =
    "Transfer of backup data from Media Agent is complete.";
pub const APPLYING_INCREMENTAL_COMPLETED: &str = "All incremental backups have been applied.";
pub const NO_INCREMENTAL_TO_APPLY: &str = "There are 0 incremental backups to apply.";
pub const OPERATION_INTERRUPTED: &str = "The operation was interrupted.";

pub fn failed_to_obtain_last_backup_detail(reason: impl std::fmt::Display) -> String {
    format!("Could not obtain last backup details:\n\t\t{}", reason)
}

pub fn failed_to_prepare_for_backup(reason: impl std::fmt::Display) -> String {
    format!("Could not prepare for backup:\n\t\t{}", reason)
}

pub fn failed_to_prepare_for_restore(reason: impl std::fmt::Display) -> String {
    format!("Could not prepare for restore:\n\t\t{}", reason)
}

pub fn input_validation_failed(reason: impl std::fmt::Display) -> String {
    format!("Input validation failed:\n\t\t{}", reason)
}

pub fn transfer_to_ma_failed(reason: impl std::fmt::Display) -> String {
    format!("Could not transfer backup data to Media Agent:\n\t\t{}", reason)
}

pub fn transfer_from_ma_failed(reason: impl std::fmt::Display) -> String {
    format!("Could not transfer backup data from Media Agent:\n\t\t{}", reason)
}

pub fn backup_step_failed(reason: impl std::fmt::Display) -> String {
    format!("Could not create backup data:\n\t\t{}", reason)
}

pub fn restore_full_failed(reason: impl std::fmt::Display) -> String {
    format!("Could not apply the full backup:\n\t\t{}", reason)
}

pub fn unexpected_error(reason: impl std::fmt::Display) -> String {
    format!("Unexpected error occurred:\n\t\t{}", reason)
}

pub fn applying_incremental(count: usize) -> String {
    format!("There are {} incremental backups to apply.", count)
}

pub fn failed_to_apply_incremental(reason: impl std::fmt::Display) -> String {
    format!("Could not apply incremental backups:\n\t\t{}", reason)
}

pub fn dir_removed(label: &str, path: &std::path::Path) -> String {
    format!("The {} directory {} is removed.", label, path.display())
}

pub fn failed_to_remove_dir(
    label: &str,
    path: &std::path::Path,
    reason: impl std::fmt::Display,
) -> String {
    format!(
        "Could not remove the {} directory {}:\n\t\t{}",
        label,
        path.display(),
        reason
    )
}
