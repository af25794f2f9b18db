// ============================================================================
// idlesweep Library
// ============================================================================

pub mod connection;
pub mod core;
pub mod memory;
pub mod notify;
pub mod sweep;
pub mod transaction;

// Re-export main types for convenience
pub use crate::core::{
    DataSourceInfo, ExecutionPurpose, MessageType, ProgressMonitor, ResourceId, Result, Savepoint,
    SweepError,
};

pub use connection::{ExecutionContext, Session, SessionGuard};
pub use notify::{
    ChannelNotificationSink, LogNotificationSink, Notification, NotificationCategory,
    NotificationSink,
};
pub use sweep::{
    ActiveResourceGuard, IdleSweepJob, IdleSweepTask, PendingTerminations, ResourceClaim,
    SweepConfig, SweepPhase, SweepReport, SweepStatus,
};
pub use transaction::{TerminationOutcome, TransactionManager, TransactionTerminator};

// ============================================================================
// High-level Reaper API
// ============================================================================

use std::sync::Arc;

/// Entry point for idle-transaction sweeps
///
/// Owns one [`ActiveResourceGuard`] shared by every sweep it starts, so two
/// jobs for the same data source never run at once.
///
/// # Examples
///
/// ```
/// use idlesweep::memory::{MemoryConnection, MemoryExecutionContext, MemoryTransactionManager};
/// use idlesweep::{DataSourceInfo, IdleReaper, PendingTerminations, ProgressMonitor};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reaper = IdleReaper::new()?;
///
/// let connection = Arc::new(MemoryConnection::new(1));
/// connection.begin().await?;
/// let pending = PendingTerminations::new().with(
///     Arc::new(MemoryExecutionContext::new("main", "ds-1", connection.clone())),
///     Arc::new(MemoryTransactionManager::new(connection.clone())),
/// );
///
/// let report = reaper
///     .submit(DataSourceInfo::new("ds-1", "Local"), pending, ProgressMonitor::new())
///     .await??;
/// assert_eq!(report.rolled_back_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct IdleReaper {
    task: Arc<IdleSweepTask>,
}

impl IdleReaper {
    /// Reaper with default configuration that logs notifications
    pub fn new() -> Result<Self> {
        Self::with_config(SweepConfig::default(), Arc::new(LogNotificationSink))
    }

    pub fn with_config(config: SweepConfig, notifier: Arc<dyn NotificationSink>) -> Result<Self> {
        let guard = Arc::new(ActiveResourceGuard::new());
        let task = IdleSweepTask::new(guard, notifier, config)?;
        Ok(Self {
            task: Arc::new(task),
        })
    }

    /// Spawn a sweep job for `data_source`
    pub fn submit(
        &self,
        data_source: DataSourceInfo,
        pending: PendingTerminations,
        monitor: ProgressMonitor,
    ) -> tokio::task::JoinHandle<Result<SweepReport>> {
        IdleSweepJob::new(data_source, pending).spawn(Arc::clone(&self.task), monitor)
    }

    /// Run a sweep job on the current task
    pub async fn sweep(
        &self,
        data_source: DataSourceInfo,
        pending: PendingTerminations,
        monitor: &ProgressMonitor,
    ) -> Result<SweepReport> {
        IdleSweepJob::new(data_source, pending)
            .run(&self.task, monitor)
            .await
    }

    /// Whether a sweep for `resource` is running right now
    pub fn is_sweeping(&self, resource: &ResourceId) -> bool {
        self.task.guard().is_active(resource)
    }

    pub fn task(&self) -> &Arc<IdleSweepTask> {
        &self.task
    }
}
