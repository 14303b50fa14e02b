use super::Orchestrator;
use crate::chain::check_constraint;
use crate::fs;
use crate::model::{
    AppBackupRequest, BackupContext, BackupRequest, BackupType, ObjectOptions, ObjectVerOptions,
    SessionKey,
};
use crate::plugin::DataDirPolicy;
use crate::staging::{StagingGuard, StagingKind, StagingPurpose};
use crate::status::{messages, ProgressStatus, Reporter};
use crate::utils::{Result, ServiceError};
use tracing::{debug, error, info};

impl Orchestrator {
    /// Run one backup invocation end to end.
    pub async fn backup(&self, status: &dyn ProgressStatus, request: &BackupRequest) -> Result<()> {
        let reporter = self.reporter(status);

        let request = match self.validate_backup(request).await {
            Ok(request) => request,
            Err(e) => {
                error!("Backup request validation failed: {}", e);
                reporter.major(messages::input_validation_failed(&e));
                return Err(e);
            }
        };

        let session = SessionKey::new();
        info!(
            "Starting {} backup of {} (session {}, job {})",
            request.backup_type,
            request.app_options.dir_path.display(),
            session,
            request.session_id
        );

        let mut guard = StagingGuard::new(&self.staging);
        let outcome = self.run_backup(&request, &session, &mut guard, reporter).await;
        self.finish(guard, status, outcome)
    }

    async fn validate_backup(&self, request: &BackupRequest) -> Result<AppBackupRequest> {
        let request = AppBackupRequest::try_from(request)?;
        fs::assert_directory(&request.app_options.dir_path, true, false)?;
        self.mover.validate_backup(&request).await?;
        Ok(request)
    }

    async fn run_backup(
        &self,
        request: &AppBackupRequest,
        session: &SessionKey,
        guard: &mut StagingGuard<'_>,
        reporter: Reporter<'_>,
    ) -> Result<()> {
        let context = match self.backup_context(request, session, guard) {
            Ok(context) => context,
            Err(e) => {
                error!("Could not prepare for backup: {}", e);
                reporter.major(messages::failed_to_prepare_for_backup(&e));
                return Err(e);
            }
        };
        self.checkpoint(reporter)?;

        match request.backup_type {
            BackupType::Full => self.full_backup(request, &context, reporter).await,
            BackupType::Incr => self.incr_backup(request, &context, reporter).await,
        }
    }

    fn backup_context(
        &self,
        request: &AppBackupRequest,
        session: &SessionKey,
        guard: &mut StagingGuard<'_>,
    ) -> Result<BackupContext> {
        let (data_dir, delete_data_dir_after_use) = match request.backup_type {
            BackupType::Incr => (None, false),
            BackupType::Full => match self.mover.backup_data_dir(request) {
                DataDirPolicy::Staged => (
                    Some(guard.create(StagingPurpose::Backup, StagingKind::Data, session)?),
                    true,
                ),
                DataDirPolicy::Direct(path) => (Some(path), false),
            },
        };
        let log_dir = guard.create(StagingPurpose::Backup, StagingKind::Log, session)?;

        let options = &request.app_options;
        let context = BackupContext {
            session: session.clone(),
            data_dir,
            delete_data_dir_after_use,
            log_dir,
            delete_log_dir_after_use: true,
            object_options: ObjectOptions {
                app_name: options.app_name.clone(),
                app_id: options.app_id.clone(),
                dir_paths: Some(vec![options.dir_path.to_string_lossy().to_string()]),
            },
            object_ver_options: ObjectVerOptions {
                source_client: request.app_host.clone(),
                backup_type: request.backup_type,
                backup_time: session.created_ms(),
            },
        };
        debug!("Backup context: {:?}", context);
        Ok(context)
    }

    async fn full_backup(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
        reporter: Reporter<'_>,
    ) -> Result<()> {
        reporter.normal(messages::START_FULL_BACKUP);

        if let Err(e) = self.mover.do_full_backup(request, context).await {
            error!("Full backup step failed: {}", e);
            reporter.major(messages::backup_step_failed(&e));
            return Err(e);
        }
        self.checkpoint(reporter)?;

        self.send_to_media_agent(reporter, self.transfer.send_full(request, context))
            .await
    }

    async fn incr_backup(
        &self,
        request: &AppBackupRequest,
        context: &BackupContext,
        reporter: Reporter<'_>,
    ) -> Result<()> {
        reporter.normal(messages::START_INCREMENTAL_BACKUP);
        reporter.normal(messages::GET_LAST_BACKUP_DETAILS);

        let options = &request.app_options;
        let detail = match self
            .metadata
            .get_last_backup_detail(
                self.plugin_name(),
                &options.app_name,
                &options.app_id,
                &request.app_host,
            )
            .await
        {
            Ok(detail) => detail,
            Err(e) => {
                error!("Could not obtain last backup details: {}", e);
                reporter.major(messages::failed_to_obtain_last_backup_detail(&e));
                return Err(e);
            }
        };

        let previous = match check_constraint(&detail) {
            Ok(previous) => previous,
            Err(e) => {
                error!("Incremental chain constraint violated: {}", e);
                match e {
                    ServiceError::NoPriorBackup => {
                        reporter.major(messages::INCREMENTAL_REQUIRES_PREVIOUS_BACKUP)
                    }
                    _ => reporter.major(messages::unexpected_error(&e)),
                }
                return Err(e);
            }
        };
        info!(
            "Previous {} backup at {}, collecting changes since then",
            previous.backup_type, previous.backup_time
        );
        self.checkpoint(reporter)?;

        if let Err(e) = self.mover.do_incr_backup(request, context, previous).await {
            error!("Incremental backup step failed: {}", e);
            reporter.major(messages::backup_step_failed(&e));
            return Err(e);
        }
        self.checkpoint(reporter)?;

        self.send_to_media_agent(reporter, self.transfer.send_incremental(request, context))
            .await
    }
}
