//! Session-scoped staging directories.
//!
//! Every backup or restore run stages data in directories below
//! `<staging_root>/<plugin>/<backup|restore>/<kind>-<session>`. Directories
//! handed out through a [`StagingGuard`] are owned by that run and removed
//! when it ends, whichever way it ends.

use crate::fs;
use crate::model::SessionKey;
use crate::status::{messages, ProgressStatus, Reporter};
use crate::utils::{Result, ServiceError};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingPurpose {
    Backup,
    Restore,
}

impl StagingPurpose {
    fn as_str(&self) -> &'static str {
        match self {
            StagingPurpose::Backup => "backup",
            StagingPurpose::Restore => "restore",
        }
    }
}

/// Which half of a backup a staging directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingKind {
    /// Full backup data
    Data,
    /// Incremental chain
    Log,
}

impl StagingKind {
    pub fn label(&self) -> &'static str {
        match self {
            StagingKind::Data => "data",
            StagingKind::Log => "log",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StagingAreaManager {
    root: PathBuf,
    plugin_name: String,
}

impl StagingAreaManager {
    pub fn new(root: impl Into<PathBuf>, plugin_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            plugin_name: plugin_name.into(),
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Deterministic location for a given purpose, kind and session.
    pub fn staging_path(
        &self,
        purpose: StagingPurpose,
        kind: StagingKind,
        session: &SessionKey,
    ) -> PathBuf {
        self.root
            .join(&self.plugin_name)
            .join(purpose.as_str())
            .join(format!("{}-{}", kind.label(), session))
    }

    /// Create (or reuse) the staging directory and make sure it is empty and
    /// private. Stale content left behind by a crashed run is discarded.
    pub fn create_staging_dir(
        &self,
        purpose: StagingPurpose,
        kind: StagingKind,
        session: &SessionKey,
    ) -> Result<PathBuf> {
        let path = self.staging_path(purpose, kind, session);

        fs::create_dir(&path).map_err(|e| ServiceError::staging(&path, e))?;
        fs::clear_dir(&path).map_err(|e| ServiceError::staging(&path, e))?;
        fs::set_owner_only(&path).map_err(|e| ServiceError::staging(&path, e))?;

        debug!("Prepared {} staging directory {}", kind.label(), path.display());
        Ok(path)
    }

    /// Remove a staging directory and everything in it.
    pub fn teardown(&self, path: &Path) -> Result<()> {
        if !path.starts_with(&self.root) {
            return Err(ServiceError::staging(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "refusing to remove a directory outside the staging root",
                ),
            ));
        }
        fs::remove_dir_recursive(path).map_err(|e| ServiceError::staging(path, e))
    }
}

/// Owns the staging directories of one run.
///
/// Call [`StagingGuard::release`] on every normal exit path; it reports each
/// removal to the session log and surfaces failures. If the guard is dropped
/// without being released (panic, aborted task), the directories are removed
/// on a best-effort basis and only logged.
///
/// Copies running on the blocking pool cannot be aborted. They are cancelled
/// when their future is dropped and stop before the next file, but a copy
/// already writing a file when the guard drops may recreate that file's parent
/// directory, which is then left behind.
pub struct StagingGuard<'a> {
    manager: &'a StagingAreaManager,
    owned: Vec<(StagingKind, PathBuf)>,
    released: bool,
}

impl<'a> StagingGuard<'a> {
    pub fn new(manager: &'a StagingAreaManager) -> Self {
        Self {
            manager,
            owned: Vec::new(),
            released: false,
        }
    }

    /// Create a staging directory owned by this guard.
    pub fn create(
        &mut self,
        purpose: StagingPurpose,
        kind: StagingKind,
        session: &SessionKey,
    ) -> Result<PathBuf> {
        let path = self.manager.staging_path(purpose, kind, session);
        // Register first so a partially prepared directory is still removed
        self.owned.push((kind, path.clone()));
        self.manager.create_staging_dir(purpose, kind, session)?;
        Ok(path)
    }

    /// Tear down every owned directory. All directories are attempted; the
    /// first failure is returned.
    pub fn release(mut self, status: &dyn ProgressStatus) -> Result<()> {
        self.released = true;
        let reporter = Reporter::new(status, self.manager.plugin_name());
        let mut first_error = None;

        for (kind, path) in std::mem::take(&mut self.owned) {
            match self.manager.teardown(&path) {
                Ok(()) => {
                    info!(
                        "Removed the {} directory {} from the local system",
                        kind.label(),
                        path.display()
                    );
                    reporter.normal(messages::dir_removed(kind.label(), &path));
                }
                Err(e) => {
                    error!(
                        "Could not remove the {} directory {}: {}",
                        kind.label(),
                        path.display(),
                        e
                    );
                    reporter.major(messages::failed_to_remove_dir(kind.label(), &path, &e));
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for (kind, path) in self.owned.drain(..) {
            match self.manager.teardown(&path) {
                Ok(()) => warn!(
                    "Removed {} directory {} after an interrupted run",
                    kind.label(),
                    path.display()
                ),
                Err(e) => error!(
                    "Could not remove {} directory {} after an interrupted run: {}",
                    kind.label(),
                    path.display(),
                    e
                ),
            }
        }
    }
}
