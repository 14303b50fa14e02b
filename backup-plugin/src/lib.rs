//! Backup Plugin Library
//!
//! Orchestrates backup and restore of filesystem-backed applications:
//! staging, incremental chain checks, ordered replay and transfer to a media
//! agent.

pub mod chain;
pub mod config;
pub mod fs;
pub mod model;
pub mod orchestrator;
pub mod plugin;
pub mod services;
pub mod staging;
pub mod status;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::Orchestrator;
pub use utils::{ErrorKind, Result, ServiceError};
