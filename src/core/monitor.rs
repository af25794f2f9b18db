use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Progress and cancellation handle shared between a job and its caller
///
/// Cancellation is advisory: long operations poll `is_canceled()` at safe
/// points and stop there.
#[derive(Debug, Clone, Default)]
pub struct ProgressMonitor {
    cancel: CancellationToken,
    inner: Arc<MonitorState>,
}

#[derive(Debug, Default)]
struct MonitorState {
    worked: AtomicU64,
    total: AtomicU64,
    task_name: Mutex<Option<String>>,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor driven by an existing cancellation token
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            inner: Arc::default(),
        }
    }

    /// Monitor with its own progress that is canceled along with this one
    pub fn child(&self) -> Self {
        Self::with_token(self.cancel.child_token())
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is requested
    pub async fn canceled(&self) {
        self.cancel.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn begin_task(&self, name: &str, total: u64) {
        *self.task_slot() = Some(name.to_string());
        self.inner.total.store(total, Ordering::SeqCst);
        self.inner.worked.store(0, Ordering::SeqCst);
    }

    pub fn worked(&self, units: u64) {
        self.inner.worked.fetch_add(units, Ordering::SeqCst);
    }

    pub fn done(&self) {
        *self.task_slot() = None;
    }

    pub fn worked_units(&self) -> u64 {
        self.inner.worked.load(Ordering::SeqCst)
    }

    pub fn total_units(&self) -> u64 {
        self.inner.total.load(Ordering::SeqCst)
    }

    pub fn task_name(&self) -> Option<String> {
        self.task_slot().clone()
    }

    fn task_slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.inner
            .task_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
