use super::Orchestrator;
use crate::chain::replay::replay_chain;
use crate::fs;
use crate::model::{AppRestoreRequest, RestoreContext, RestoreRequest, SessionKey};
use crate::plugin::DataDirPolicy;
use crate::staging::{StagingGuard, StagingKind, StagingPurpose};
use crate::status::{messages, ProgressStatus, Reporter};
use crate::utils::Result;
use tracing::{debug, error, info};

impl Orchestrator {
    /// Restore the chain ending at the requested session into an empty
    /// target directory.
    pub async fn restore(
        &self,
        status: &dyn ProgressStatus,
        request: &RestoreRequest,
    ) -> Result<()> {
        let reporter = self.reporter(status);

        let request = match self.validate_restore(request).await {
            Ok(request) => request,
            Err(e) => {
                error!("Restore request validation failed: {}", e);
                reporter.major(messages::input_validation_failed(&e));
                return Err(e);
            }
        };

        let session = SessionKey::new();
        info!(
            "Starting restore of session {} into {} (session {})",
            request.session_id(),
            request.app_options.restore_dir_path.display(),
            session
        );

        let mut guard = StagingGuard::new(&self.staging);
        let outcome = self.run_restore(&request, &session, &mut guard, reporter).await;
        self.finish(guard, status, outcome)
    }

    async fn validate_restore(&self, request: &RestoreRequest) -> Result<AppRestoreRequest> {
        let request = AppRestoreRequest::try_from(request)?;
        fs::assert_directory(&request.app_options.restore_dir_path, true, true)?;
        self.mover.validate_restore(&request).await?;
        Ok(request)
    }

    async fn run_restore(
        &self,
        request: &AppRestoreRequest,
        session: &SessionKey,
        guard: &mut StagingGuard<'_>,
        reporter: Reporter<'_>,
    ) -> Result<()> {
        let context = match self.restore_context(request, session, guard) {
            Ok(context) => context,
            Err(e) => {
                error!("Could not prepare for restore: {}", e);
                reporter.major(messages::failed_to_prepare_for_restore(&e));
                return Err(e);
            }
        };

        reporter.normal(messages::START_RESTORE);
        self.checkpoint(reporter)?;

        reporter.normal(messages::TRANSFER_FROM_MA);
        if let Err(e) = self.transfer.receive(request, &context).await {
            error!("Transfer from media agent failed: {}", e);
            reporter.major(messages::transfer_from_ma_failed(&e));
            return Err(e);
        }
        info!("Transfer from media agent completed");
        reporter.normal(messages::TRANSFER_FROM_MA_COMPLETED);
        self.checkpoint(reporter)?;

        if let Err(e) = self.mover.do_restore_full_backup(request, &context).await {
            error!("Could not apply the full backup: {}", e);
            reporter.major(messages::restore_full_failed(&e));
            return Err(e);
        }
        self.checkpoint(reporter)?;

        let applied = replay_chain(self.mover.as_ref(), request, &context, reporter).await?;
        info!("Restore completed with {} incremental backups applied", applied);
        Ok(())
    }

    fn restore_context(
        &self,
        request: &AppRestoreRequest,
        session: &SessionKey,
        guard: &mut StagingGuard<'_>,
    ) -> Result<RestoreContext> {
        let (data_dir, delete_data_dir_after_use) = match self.mover.restore_data_dir(request) {
            DataDirPolicy::Staged => (
                guard.create(StagingPurpose::Restore, StagingKind::Data, session)?,
                true,
            ),
            DataDirPolicy::Direct(path) => (path, false),
        };
        let log_dir = guard.create(StagingPurpose::Restore, StagingKind::Log, session)?;

        let context = RestoreContext {
            session: session.clone(),
            data_dir,
            delete_data_dir_after_use,
            log_dir,
            delete_log_dir_after_use: true,
        };
        debug!("Restore context: {:?}", context);
        Ok(context)
    }
}
