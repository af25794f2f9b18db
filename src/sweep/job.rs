use super::{IdleSweepTask, PendingTerminations, SweepReport};
use crate::core::{DataSourceInfo, ProgressMonitor, Result, SweepError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Level, event};

/// Background job ending the idle transactions of one data source
///
/// Created by the idle detector each time it finds idle transactions and
/// handed to the scheduler, which either spawns it or runs it inline.
pub struct IdleSweepJob {
    data_source: DataSourceInfo,
    pending: PendingTerminations,
}

impl IdleSweepJob {
    pub fn new(data_source: DataSourceInfo, pending: PendingTerminations) -> Self {
        Self {
            data_source,
            pending,
        }
    }

    pub fn name(&self) -> String {
        format!("End idle transactions ({})", self.data_source.name)
    }

    /// System jobs are hidden from the user's job list
    pub fn is_system(&self) -> bool {
        true
    }

    pub fn data_source(&self) -> &DataSourceInfo {
        &self.data_source
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Run the sweep on the current task.
    ///
    /// A panic inside the sweep is caught and returned as
    /// [`SweepError::Unexpected`]; the resource claim has been released by
    /// then.
    pub async fn run(self, task: &IdleSweepTask, monitor: &ProgressMonitor) -> Result<SweepReport> {
        let name = self.name();
        let resource = self.data_source.id;

        match AssertUnwindSafe(task.run(&resource, self.pending, monitor))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                event!(
                    Level::ERROR,
                    job = %name,
                    resource = %resource,
                    panic = %message,
                    "idle sweep job panicked"
                );
                Err(SweepError::Unexpected(message))
            }
        }
    }

    /// Spawn the sweep onto the tokio runtime
    pub fn spawn(self, task: Arc<IdleSweepTask>, monitor: ProgressMonitor) -> JoinHandle<Result<SweepReport>> {
        tokio::spawn(async move { self.run(&task, &monitor).await })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
