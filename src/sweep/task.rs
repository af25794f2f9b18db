use super::{ActiveResourceGuard, PendingTerminations, SweepConfig, SweepPhase, SweepReport, SweepStatus};
use crate::core::{ProgressMonitor, ResourceId, Result};
use crate::notify::{Notification, NotificationCategory, NotificationSink};
use crate::transaction::{TerminationOutcome, TransactionTerminator};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

/// Ends the idle transactions of one data source per run
///
/// Runs for the same resource never overlap: the second caller gets a
/// `SkippedAlreadyRunning` report and touches nothing.
pub struct IdleSweepTask {
    guard: Arc<ActiveResourceGuard>,
    terminator: TransactionTerminator,
    notifier: Arc<dyn NotificationSink>,
    config: SweepConfig,
}

impl IdleSweepTask {
    pub fn new(
        guard: Arc<ActiveResourceGuard>,
        notifier: Arc<dyn NotificationSink>,
        config: SweepConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut terminator = TransactionTerminator::new(&config.session_label);
        if !config.honor_cancellation {
            terminator = terminator.ignore_cancellation();
        }

        Ok(Self {
            guard,
            terminator,
            notifier,
            config,
        })
    }

    pub fn guard(&self) -> &Arc<ActiveResourceGuard> {
        &self.guard
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Roll back every pending pair for `resource` and notify once.
    ///
    /// Item failures end up in the report. An `Err` means the sweep itself
    /// hit an unexpected fault (e.g. the notifier failed); the resource is
    /// released in every case.
    pub async fn run(
        &self,
        resource: &ResourceId,
        pending: PendingTerminations,
        monitor: &ProgressMonitor,
    ) -> Result<SweepReport> {
        let sweep_id = Uuid::new_v4();
        let span = info_span!("idle_sweep", sweep_id = %sweep_id, resource = %resource);
        self.sweep(sweep_id, resource, pending, monitor)
            .instrument(span)
            .await
    }

    async fn sweep(
        &self,
        sweep_id: Uuid,
        resource: &ResourceId,
        pending: PendingTerminations,
        monitor: &ProgressMonitor,
    ) -> Result<SweepReport> {
        enter_phase(SweepPhase::Idle);
        enter_phase(SweepPhase::Claiming);
        let Some(claim) = self.guard.claim(resource) else {
            enter_phase(SweepPhase::SkippedAlreadyRunning);
            event!(Level::DEBUG, "idle sweep already in progress, skipping");
            return Ok(SweepReport::skipped(sweep_id, resource.clone()));
        };

        enter_phase(SweepPhase::Running);
        let total = pending.len();
        event!(Level::DEBUG, pending = total, "ending idle transactions");
        monitor.begin_task("End idle transactions", total as u64);

        let mut outcomes = Vec::with_capacity(total);
        let mut canceled = false;
        for (context, manager) in pending {
            let outcome = if canceled {
                TerminationOutcome::Skipped {
                    context: context.name().to_string(),
                }
            } else {
                self.terminator
                    .terminate(context.as_ref(), manager.as_ref(), monitor)
                    .await
            };
            canceled |= outcome.is_skipped();
            monitor.worked(1);
            outcomes.push(outcome);
        }
        monitor.done();

        enter_phase(SweepPhase::Notifying);
        let rolled_back = outcomes.iter().filter(|o| o.is_rolled_back()).count();
        let failed = outcomes.iter().filter(|o| o.is_failed()).count();
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();

        let notification = Notification::new(
            resource.clone(),
            NotificationCategory::Rollback,
            &self.config.render_message(rolled_back, failed, skipped),
            self.config.notification_severity,
        )
        .with_counts(rolled_back, failed, skipped);

        if let Err(err) = self.notifier.notify(notification) {
            event!(
                Level::ERROR,
                error = %err,
                rolled_back,
                failed,
                skipped,
                canceled,
                "idle sweep notification failed"
            );
            return Err(err);
        }

        enter_phase(SweepPhase::Releasing);
        drop(claim);

        enter_phase(SweepPhase::Done);
        event!(
            Level::INFO,
            rolled_back,
            failed,
            skipped,
            canceled,
            "idle transactions ended"
        );

        Ok(SweepReport {
            sweep_id,
            resource: resource.clone(),
            status: SweepStatus::Done,
            outcomes,
            canceled,
            notified: true,
        })
    }
}

fn enter_phase(phase: SweepPhase) {
    event!(Level::TRACE, phase = %phase, terminal = phase.is_terminal(), "sweep phase");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnection, MemoryExecutionContext, MemoryTransactionManager};
    use crate::notify::ChannelNotificationSink;
    use crate::core::MessageType;

    async fn create_pending(count: usize) -> (PendingTerminations, Vec<Arc<MemoryTransactionManager>>) {
        let mut pending = PendingTerminations::new();
        let mut managers = Vec::new();
        for i in 0..count {
            let connection = Arc::new(MemoryConnection::new(i as u64 + 1));
            connection.begin().await.unwrap();
            let context = Arc::new(MemoryExecutionContext::new(
                &format!("ctx-{}", i + 1),
                "ds-1",
                Arc::clone(&connection),
            ));
            let manager = Arc::new(MemoryTransactionManager::new(connection));
            pending.push(context, manager.clone());
            managers.push(manager);
        }
        (pending, managers)
    }

    #[tokio::test]
    async fn test_run_rolls_back_all_and_notifies_once() {
        let (sink, mut rx) = ChannelNotificationSink::channel();
        let guard = Arc::new(ActiveResourceGuard::new());
        let task = IdleSweepTask::new(guard.clone(), Arc::new(sink), SweepConfig::default()).unwrap();
        let (pending, managers) = create_pending(3).await;
        let resource = ResourceId::from("ds-1");
        let monitor = ProgressMonitor::new();

        let report = task.run(&resource, pending, &monitor).await.unwrap();

        assert_eq!(report.status, SweepStatus::Done);
        assert_eq!(report.rolled_back_count(), 3);
        assert!(report.notified);
        assert!(managers.iter().all(|m| m.rollback_calls() == 1));
        assert_eq!(monitor.worked_units(), 3);
        assert!(!guard.is_active(&resource));

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.severity, MessageType::Error);
        assert_eq!(notification.rolled_back, 3);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_skips_when_resource_claimed() {
        let (sink, mut rx) = ChannelNotificationSink::channel();
        let guard = Arc::new(ActiveResourceGuard::new());
        let task = IdleSweepTask::new(guard.clone(), Arc::new(sink), SweepConfig::default()).unwrap();
        let (pending, managers) = create_pending(2).await;
        let resource = ResourceId::from("ds-1");

        let _held = guard.claim(&resource).unwrap();
        let report = task.run(&resource, pending, &ProgressMonitor::new()).await.unwrap();

        assert!(report.is_skipped());
        assert!(report.outcomes.is_empty());
        assert!(managers.iter().all(|m| m.rollback_calls() == 0));
        assert!(rx.try_recv().is_err());
        assert!(guard.is_active(&resource));
    }

    #[tokio::test]
    async fn test_cancellation_short_circuits_remaining_items() {
        let (sink, _rx) = ChannelNotificationSink::channel();
        let guard = Arc::new(ActiveResourceGuard::new());
        let task = IdleSweepTask::new(guard, Arc::new(sink), SweepConfig::default()).unwrap();
        let (pending, managers) = create_pending(3).await;
        let monitor = ProgressMonitor::new();
        monitor.cancel();

        let report = task
            .run(&ResourceId::from("ds-1"), pending, &monitor)
            .await
            .unwrap();

        assert!(report.canceled);
        assert_eq!(report.skipped_count(), 3);
        assert!(report.notified);
        assert!(managers.iter().all(|m| m.rollback_calls() == 0));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = IdleSweepTask::new(
            Arc::new(ActiveResourceGuard::new()),
            Arc::new(crate::notify::LogNotificationSink),
            SweepConfig::new().session_label(""),
        );
        assert!(result.is_err());
    }
}
