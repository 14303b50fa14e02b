//! Backup chain rules: the incremental constraint and ordered replay.

pub mod replay;
pub mod validator;

pub use replay::{discover_units, IncrementalUnit, FULL_BACKUP_ENTRY};
pub use validator::check_constraint;
