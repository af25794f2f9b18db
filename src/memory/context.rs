use super::MemoryConnection;
use crate::connection::{ExecutionContext, Session};
use crate::core::{ExecutionPurpose, ProgressMonitor, ResourceId, Result, Savepoint, SweepError};
use crate::transaction::TransactionManager;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Execution context over a [`MemoryConnection`]
pub struct MemoryExecutionContext {
    name: String,
    resource: ResourceId,
    connection: Arc<MemoryConnection>,
    next_session_id: AtomicU64,
    sessions_opened: AtomicUsize,
    sessions_closed: Arc<AtomicUsize>,
    last_label: Mutex<Option<String>>,
    open_fault: Mutex<Option<String>>,
}

impl MemoryExecutionContext {
    pub fn new(name: &str, resource: impl Into<ResourceId>, connection: Arc<MemoryConnection>) -> Self {
        Self {
            name: name.to_string(),
            resource: resource.into(),
            connection,
            next_session_id: AtomicU64::new(1),
            sessions_opened: AtomicUsize::new(0),
            sessions_closed: Arc::new(AtomicUsize::new(0)),
            last_label: Mutex::new(None),
            open_fault: Mutex::new(None),
        }
    }

    pub fn connection(&self) -> &Arc<MemoryConnection> {
        &self.connection
    }

    /// Make every following `open_session` call fail
    pub fn fail_open_with(&self, message: &str) {
        *self.open_fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.to_string());
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet closed
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened().saturating_sub(self.sessions_closed())
    }

    pub fn last_label(&self) -> Option<String> {
        self.last_label
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ExecutionContext for MemoryExecutionContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn resource_id(&self) -> &ResourceId {
        &self.resource
    }

    async fn open_session(
        &self,
        _monitor: &ProgressMonitor,
        purpose: ExecutionPurpose,
        label: &str,
    ) -> Result<Box<dyn Session>> {
        let fault = self
            .open_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(message) = fault {
            return Err(SweepError::SessionOpen {
                context: self.name.clone(),
                message,
            });
        }

        if !self.connection.is_active().await {
            return Err(SweepError::SessionOpen {
                context: self.name.clone(),
                message: format!("connection {} is closed", self.connection.id()),
            });
        }

        *self.last_label.lock().unwrap_or_else(PoisonError::into_inner) = Some(label.to_string());
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySession {
            id: self.next_session_id.fetch_add(1, Ordering::SeqCst),
            label: label.to_string(),
            purpose,
            closed: false,
            closed_counter: Arc::clone(&self.sessions_closed),
        }))
    }
}

/// Session handed out by [`MemoryExecutionContext`]
pub struct MemorySession {
    id: u64,
    label: String,
    purpose: ExecutionPurpose,
    closed: bool,
    closed_counter: Arc<AtomicUsize>,
}

impl Session for MemorySession {
    fn id(&self) -> u64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn purpose(&self) -> ExecutionPurpose {
        self.purpose
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closed_counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone)]
enum RollbackFault {
    Error(String),
    Panic(String),
}

/// Transaction manager bound to a [`MemoryConnection`]
pub struct MemoryTransactionManager {
    connection: Arc<MemoryConnection>,
    rollback_calls: AtomicUsize,
    delay: Option<Duration>,
    fault: Mutex<Option<RollbackFault>>,
}

impl MemoryTransactionManager {
    pub fn new(connection: Arc<MemoryConnection>) -> Self {
        Self {
            connection,
            rollback_calls: AtomicUsize::new(0),
            delay: None,
            fault: Mutex::new(None),
        }
    }

    /// Simulate a slow server round trip on every rollback
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every following rollback return an error
    pub fn fail_with(&self, message: &str) {
        self.set_fault(RollbackFault::Error(message.to_string()));
    }

    /// Make every following rollback panic
    pub fn panic_with(&self, message: &str) {
        self.set_fault(RollbackFault::Panic(message.to_string()));
    }

    pub fn rollback_calls(&self) -> usize {
        self.rollback_calls.load(Ordering::SeqCst)
    }

    pub fn connection(&self) -> &Arc<MemoryConnection> {
        &self.connection
    }

    fn set_fault(&self, fault: RollbackFault) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(fault);
    }

    fn rollback_error(&self, message: String) -> SweepError {
        SweepError::Rollback {
            context: format!("connection-{}", self.connection.id()),
            message,
        }
    }
}

#[async_trait]
impl TransactionManager for MemoryTransactionManager {
    async fn rollback(
        &self,
        session: &mut dyn Session,
        savepoint: Option<&Savepoint>,
    ) -> Result<()> {
        self.rollback_calls.fetch_add(1, Ordering::SeqCst);

        if session.is_closed() {
            return Err(SweepError::SessionClosed(session.id()));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let fault = self
            .fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match fault {
            Some(RollbackFault::Error(message)) => return Err(self.rollback_error(message)),
            Some(RollbackFault::Panic(message)) => panic!("{}", message),
            None => {}
        }

        if let Some(savepoint) = savepoint {
            return Err(self.rollback_error(format!(
                "savepoint {} is not supported by in-memory connections",
                savepoint.id
            )));
        }

        self.connection
            .rollback()
            .await
            .map_err(|err| self.rollback_error(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_session_on_closed_connection() {
        let connection = Arc::new(MemoryConnection::new(3));
        connection.close().await;
        let context = MemoryExecutionContext::new("ctx", "ds-1", connection);

        let result = context
            .open_session(&ProgressMonitor::new(), ExecutionPurpose::Util, "x")
            .await;
        assert!(matches!(result, Err(SweepError::SessionOpen { .. })));
        assert_eq!(context.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_rollback_rejects_closed_session() {
        let connection = Arc::new(MemoryConnection::new(1));
        let context = MemoryExecutionContext::new("ctx", "ds-1", Arc::clone(&connection));
        let manager = MemoryTransactionManager::new(connection);

        let mut session = context
            .open_session(&ProgressMonitor::new(), ExecutionPurpose::Util, "x")
            .await
            .unwrap();
        session.close();

        let result = manager.rollback(session.as_mut(), None).await;
        assert!(matches!(result, Err(SweepError::SessionClosed(1))));
    }

    #[tokio::test]
    async fn test_savepoint_rollback_unsupported() {
        let connection = Arc::new(MemoryConnection::new(1));
        connection.begin().await.unwrap();
        let context = MemoryExecutionContext::new("ctx", "ds-1", Arc::clone(&connection));
        let manager = MemoryTransactionManager::new(Arc::clone(&connection));

        let mut session = context
            .open_session(&ProgressMonitor::new(), ExecutionPurpose::Util, "x")
            .await
            .unwrap();
        let savepoint = Savepoint::new(4, Some("before_update"));

        assert!(manager.rollback(session.as_mut(), Some(&savepoint)).await.is_err());
        assert!(connection.is_in_transaction().await);
    }
}
