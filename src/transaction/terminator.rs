use super::TransactionManager;
use crate::connection::{ExecutionContext, SessionGuard};
use crate::core::{ExecutionPurpose, ProgressMonitor, SweepError};
use tracing::{Level, event};

/// Result of trying to end one idle transaction
#[derive(Debug, Clone)]
pub enum TerminationOutcome {
    /// Rollback completed on the given session
    RolledBack { context: String, session_id: u64 },
    /// Session open or rollback failed; the item was skipped
    Failed { context: String, error: SweepError },
    /// Not attempted because the sweep was canceled
    Skipped { context: String },
}

impl TerminationOutcome {
    pub fn context(&self) -> &str {
        match self {
            TerminationOutcome::RolledBack { context, .. }
            | TerminationOutcome::Failed { context, .. }
            | TerminationOutcome::Skipped { context } => context,
        }
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, TerminationOutcome::RolledBack { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TerminationOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TerminationOutcome::Skipped { .. })
    }

    pub fn error(&self) -> Option<&SweepError> {
        match self {
            TerminationOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Ends a single idle transaction through a short-lived utility session
///
/// Never returns an error: every failure is logged and folded into the
/// returned [`TerminationOutcome`].
#[derive(Debug, Clone)]
pub struct TransactionTerminator {
    session_label: String,
    honor_cancellation: bool,
}

impl Default for TransactionTerminator {
    fn default() -> Self {
        Self::new("End idle transaction")
    }
}

impl TransactionTerminator {
    pub fn new(session_label: &str) -> Self {
        Self {
            session_label: session_label.to_string(),
            honor_cancellation: true,
        }
    }

    /// Ignore monitor cancellation and always attempt the rollback
    pub fn ignore_cancellation(mut self) -> Self {
        self.honor_cancellation = false;
        self
    }

    pub fn session_label(&self) -> &str {
        &self.session_label
    }

    pub async fn terminate(
        &self,
        context: &dyn ExecutionContext,
        manager: &dyn TransactionManager,
        monitor: &ProgressMonitor,
    ) -> TerminationOutcome {
        let context_name = context.name().to_string();

        if self.honor_cancellation && monitor.is_canceled() {
            event!(Level::DEBUG, context = %context_name, "canceled before opening session");
            return TerminationOutcome::Skipped {
                context: context_name,
            };
        }

        let mut session = match SessionGuard::open(
            context,
            monitor,
            ExecutionPurpose::Util,
            &self.session_label,
        )
        .await
        {
            Ok(session) => session,
            Err(err) => {
                event!(
                    Level::ERROR,
                    resource = %context.resource_id(),
                    context = %context_name,
                    error = %err,
                    "error opening session to end idle transaction"
                );
                return TerminationOutcome::Failed {
                    context: context_name,
                    error: err,
                };
            }
        };

        let session_id = session.id();
        // Once started the rollback runs to completion, cancellation or not.
        let result = manager.rollback(session.session(), None).await;
        session.close();

        match result {
            Ok(()) => {
                event!(
                    Level::DEBUG,
                    context = %context_name,
                    session = session_id,
                    "idle transaction rolled back"
                );
                TerminationOutcome::RolledBack {
                    context: context_name,
                    session_id,
                }
            }
            Err(err) => {
                event!(
                    Level::ERROR,
                    resource = %context.resource_id(),
                    context = %context_name,
                    session = session_id,
                    error = %err,
                    "error ending idle transaction"
                );
                TerminationOutcome::Failed {
                    context: context_name,
                    error: err,
                }
            }
        }
    }
}
