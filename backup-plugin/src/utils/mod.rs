//! Utility modules for the backup plugin.

pub mod errors;
pub mod logger;

pub use errors::{ErrorKind, Result, ServiceError};
