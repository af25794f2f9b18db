use super::ExecutionContext;
use crate::core::{ExecutionPurpose, ProgressMonitor, Result};

/// Short-lived handle used to issue one administrative operation
///
/// `close` is synchronous so it can run from `Drop`.
pub trait Session: Send + Sync {
    fn id(&self) -> u64;

    fn label(&self) -> &str;

    fn purpose(&self) -> ExecutionPurpose;

    fn is_closed(&self) -> bool;

    fn close(&mut self);
}

/// RAII guard for an open session
///
/// Closes the session when dropped, including while unwinding, so callers
/// never leak a session on an error path.
pub struct SessionGuard {
    session: Box<dyn Session>,
}

impl SessionGuard {
    /// Open a session on `context` and wrap it
    pub async fn open(
        context: &dyn ExecutionContext,
        monitor: &ProgressMonitor,
        purpose: ExecutionPurpose,
        label: &str,
    ) -> Result<Self> {
        let session = context.open_session(monitor, purpose, label).await?;
        Ok(Self { session })
    }

    pub fn id(&self) -> u64 {
        self.session.id()
    }

    /// Get the wrapped session
    pub fn session(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    /// Close the session now instead of at scope end
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.session.is_closed() {
            self.session.close();
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
