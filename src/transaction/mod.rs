// ============================================================================
// Transaction Termination
// ============================================================================
//
// The transaction manager capability bound to an execution context, and the
// terminator that uses it to end one idle transaction at a time.
//
// ============================================================================

pub mod terminator;

use crate::connection::Session;
use crate::core::{Result, Savepoint};
use async_trait::async_trait;

pub use terminator::{TerminationOutcome, TransactionTerminator};

/// Transaction control for one execution context
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Roll back the current transaction on `session`.
    ///
    /// With `savepoint = None` the whole transaction is rolled back.
    async fn rollback(&self, session: &mut dyn Session, savepoint: Option<&Savepoint>)
    -> Result<()>;
}
