use crate::core::{Result, SweepError};
use tokio::sync::Mutex;

/// In-process database connection with a single transaction slot
pub struct MemoryConnection {
    /// Unique connection ID
    id: u64,
    inner: Mutex<ConnectionInner>,
}

struct ConnectionInner {
    state: ConnectionState,
    transaction_id: Option<u64>,
    next_transaction_id: u64,
    rollbacks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    InTransaction,
    Closed,
}

impl MemoryConnection {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            inner: Mutex::new(ConnectionInner {
                state: ConnectionState::Active,
                transaction_id: None,
                next_transaction_id: 1,
                rollbacks: 0,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Begin a new transaction
    pub async fn begin(&self) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ConnectionState::Closed => Err(SweepError::Unexpected(format!(
                "connection {} is closed",
                self.id
            ))),
            ConnectionState::InTransaction => Err(SweepError::Unexpected(format!(
                "connection {} already has an active transaction",
                self.id
            ))),
            ConnectionState::Active => {
                let txn_id = inner.next_transaction_id;
                inner.next_transaction_id += 1;
                inner.state = ConnectionState::InTransaction;
                inner.transaction_id = Some(txn_id);
                Ok(txn_id)
            }
        }
    }

    /// Commit the current transaction
    pub async fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != ConnectionState::InTransaction {
            return Err(SweepError::Unexpected("No active transaction".into()));
        }
        inner.state = ConnectionState::Active;
        inner.transaction_id = None;
        Ok(())
    }

    /// Rollback the current transaction.
    ///
    /// Returns the id of the transaction that was ended, or `None` when there
    /// was nothing to roll back.
    pub async fn rollback(&self) -> Result<Option<u64>> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            ConnectionState::Closed => Err(SweepError::Unexpected(format!(
                "connection {} is closed",
                self.id
            ))),
            ConnectionState::Active => Ok(None),
            ConnectionState::InTransaction => {
                inner.state = ConnectionState::Active;
                inner.rollbacks += 1;
                Ok(inner.transaction_id.take())
            }
        }
    }

    pub async fn is_in_transaction(&self) -> bool {
        self.inner.lock().await.state == ConnectionState::InTransaction
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.state != ConnectionState::Closed
    }

    pub async fn transaction_id(&self) -> Option<u64> {
        self.inner.lock().await.transaction_id
    }

    /// Number of transactions ended by rollback
    pub async fn rollback_count(&self) -> u64 {
        self.inner.lock().await.rollbacks
    }

    /// Close the connection, discarding any open transaction
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = ConnectionState::Closed;
        inner.transaction_id = None;
    }
}
