//! Progress/status sink.
//!
//! The orchestrators write a [`SessionReport`] at every phase transition.
//! Reports are informational only; nothing reads them back to make control
//! decisions.

pub mod messages;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Maximum number of queued reports per subscriber
const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Normal,
    Warning,
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub plugin: String,
    pub severity: MessageType,
    pub message: String,
}

impl SessionReport {
    pub fn new(plugin: &str, severity: MessageType, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.to_string(),
            severity,
            message: message.into(),
        }
    }
}

/// One-way channel to the host's session log.
pub trait ProgressStatus: Send + Sync {
    fn status_message(&self, report: SessionReport);
}

/// Forwards reports to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatus;

impl ProgressStatus for TracingStatus {
    fn status_message(&self, report: SessionReport) {
        match report.severity {
            MessageType::Normal => info!("[{}] {}", report.plugin, report.message),
            MessageType::Warning | MessageType::Minor => {
                warn!("[{}] {}", report.plugin, report.message)
            }
            MessageType::Major | MessageType::Critical => {
                error!("[{}] {}", report.plugin, report.message)
            }
        }
    }
}

/// Fans reports out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastStatus {
    tx: broadcast::Sender<SessionReport>,
}

impl BroadcastStatus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionReport> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStatus for BroadcastStatus {
    fn status_message(&self, report: SessionReport) {
        // No subscribers is fine
        if self.tx.send(report).is_err() {
            debug!("No subscribers for session report");
        }
    }
}

/// Binds a sink to the plugin name so call sites only pass severity + text.
#[derive(Clone, Copy)]
pub(crate) struct Reporter<'a> {
    status: &'a dyn ProgressStatus,
    plugin: &'a str,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(status: &'a dyn ProgressStatus, plugin: &'a str) -> Self {
        Self { status, plugin }
    }

    pub(crate) fn normal(&self, message: impl Into<String>) {
        self.status
            .status_message(SessionReport::new(self.plugin, MessageType::Normal, message));
    }

    pub(crate) fn major(&self, message: impl Into<String>) {
        self.status
            .status_message(SessionReport::new(self.plugin, MessageType::Major, message));
    }
}
