//! Ordered replay of the incremental chain during restore.
//!
//! The restore log directory holds one entry per backup in the chain, named
//! by its ordinal. `0` belongs to the full backup and is never replayed; the
//! rest are deltas that only produce a correct result when applied in
//! ascending numeric order (`10` after `9`, not after `1`).

use crate::fs;
use crate::model::{AppRestoreRequest, RestoreContext};
use crate::plugin::DataMover;
use crate::status::{messages, Reporter};
use crate::utils::{Result, ServiceError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Name of the log entry reserved for the full backup.
pub const FULL_BACKUP_ENTRY: &str = "0";

/// One incremental delta in the restore log directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalUnit {
    pub ordinal: u64,
    pub path: PathBuf,
}

/// List the incremental units of `log_dir` in replay order.
pub fn discover_units(log_dir: &Path) -> Result<Vec<IncrementalUnit>> {
    let mut units = BTreeMap::new();

    for path in fs::list_immediate_children(log_dir)? {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ServiceError::MalformedChain(format!("unreadable entry name {}", path.display()))
            })?
            .to_string();

        if name == FULL_BACKUP_ENTRY {
            continue;
        }

        let ordinal = parse_ordinal(&name)?;
        if ordinal == 0 {
            return Err(ServiceError::MalformedChain(format!(
                "entry '{}' collides with the full backup",
                name
            )));
        }
        if units.insert(ordinal, path).is_some() {
            return Err(ServiceError::MalformedChain(format!(
                "duplicate incremental ordinal {}",
                ordinal
            )));
        }
    }

    Ok(units
        .into_iter()
        .map(|(ordinal, path)| IncrementalUnit { ordinal, path })
        .collect())
}

fn parse_ordinal(name: &str) -> Result<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::MalformedChain(format!(
            "'{}' is not a valid incremental ordinal",
            name
        )));
    }
    name.parse().map_err(|_| {
        ServiceError::MalformedChain(format!("'{}' is out of the ordinal range", name))
    })
}

/// Apply every incremental unit found in the context's log directory.
///
/// Stops at the first unit that fails; later units are never attempted and
/// nothing already applied is rolled back. Returns the number of units applied.
pub(crate) async fn replay_chain(
    mover: &dyn DataMover,
    request: &AppRestoreRequest,
    context: &RestoreContext,
    reporter: Reporter<'_>,
) -> Result<usize> {
    let units = match discover_units(&context.log_dir) {
        Ok(units) => units,
        Err(e) => {
            error!("Failed to get sorted list of incremental backups: {}", e);
            reporter.major(messages::unexpected_error(&e));
            return Err(e);
        }
    };

    if units.is_empty() {
        info!("There is no incremental backup to apply");
        reporter.normal(messages::NO_INCREMENTAL_TO_APPLY);
        return Ok(0);
    }

    info!("There are {} incremental backups to apply", units.len());
    reporter.normal(messages::applying_incremental(units.len()));

    for (i, unit) in units.iter().enumerate() {
        info!(
            "({}) Applying the content of {} (ordinal {})",
            i + 1,
            unit.path.display(),
            unit.ordinal
        );
        if let Err(e) = mover.do_restore_incr_backup(request, context, unit).await {
            error!("Could not apply incremental backup {}: {}", unit.ordinal, e);
            reporter.major(messages::failed_to_apply_incremental(&e));
            return Err(e);
        }
    }

    info!("All {} incremental backups have been applied", units.len());
    reporter.normal(messages::APPLYING_INCREMENTAL_COMPLETED);
    Ok(units.len())
}
