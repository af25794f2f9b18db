pub mod session;

use crate::core::{ExecutionPurpose, ProgressMonitor, ResourceId, Result};
use async_trait::async_trait;

pub use session::{Session, SessionGuard};

/// A live handle onto a database resource that can produce sessions
///
/// Owned by the connection subsystem. Sweeps only borrow it for the length
/// of one rollback attempt.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Human-readable context name, used in logs
    fn name(&self) -> &str;

    /// The data source this context belongs to
    fn resource_id(&self) -> &ResourceId;

    /// Open a short-lived session tagged with a purpose and label
    async fn open_session(
        &self,
        monitor: &ProgressMonitor,
        purpose: ExecutionPurpose,
        label: &str,
    ) -> Result<Box<dyn Session>>;
}
