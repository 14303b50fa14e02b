//! Backup and restore orchestration.
//!
//! One [`Orchestrator`] drives a single invocation at a time through its
//! phases, strictly in sequence: validate the request, prepare staging,
//! hand off to the [`DataMover`], move bytes through the [`TransferService`]
//! and finally tear staging down again. Every failure is written to the
//! progress sink before it is returned, and staging is released on every
//! exit path.

mod backup;
mod restore;

use crate::plugin::DataMover;
use crate::services::{MetadataService, TransferService};
use crate::staging::{StagingAreaManager, StagingGuard};
use crate::status::{messages, ProgressStatus, Reporter};
use crate::utils::{Result, ServiceError};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Orchestrator {
    staging: StagingAreaManager,
    mover: Arc<dyn DataMover>,
    transfer: Arc<dyn TransferService>,
    metadata: Arc<dyn MetadataService>,
    cancel_token: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator (no cancellation support)
    pub fn new(
        staging: StagingAreaManager,
        mover: Arc<dyn DataMover>,
        transfer: Arc<dyn TransferService>,
        metadata: Arc<dyn MetadataService>,
    ) -> Self {
        Self {
            staging,
            mover,
            transfer,
            metadata,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Cancelling the token makes the running operation stop at the next
    /// phase boundary with [`ServiceError::Interrupted`].
    pub fn with_cancel(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn plugin_name(&self) -> &str {
        self.staging.plugin_name()
    }

    fn reporter<'a>(&'a self, status: &'a dyn ProgressStatus) -> Reporter<'a> {
        Reporter::new(status, self.plugin_name())
    }

    fn checkpoint(&self, reporter: Reporter<'_>) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            warn!("Operation cancelled, stopping before the next phase");
            reporter.major(messages::OPERATION_INTERRUPTED);
            return Err(ServiceError::Interrupted);
        }
        Ok(())
    }

    async fn send_to_media_agent<F>(&self, reporter: Reporter<'_>, transfer: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        reporter.normal(messages::TRANSFER_TO_MA);
        if let Err(e) = transfer.await {
            error!("Transfer to media agent failed: {}", e);
            reporter.major(messages::transfer_to_ma_failed(&e));
            return Err(e);
        }
        info!("Transfer to media agent completed");
        reporter.normal(messages::TRANSFER_TO_MA_COMPLETED);
        Ok(())
    }

    /// Release staging and settle the final outcome.
    ///
    /// A pipeline error wins over a cleanup error; the cleanup error has
    /// already been reported by the guard.
    fn finish(
        &self,
        guard: StagingGuard<'_>,
        status: &dyn ProgressStatus,
        outcome: Result<()>,
    ) -> Result<()> {
        let cleanup = guard.release(status);
        match (outcome, cleanup) {
            (Ok(()), cleanup) => cleanup,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!("Staging cleanup also failed after an error: {}", cleanup_err);
                Err(e)
            }
        }
    }
}
