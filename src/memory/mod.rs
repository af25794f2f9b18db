//! In-process connections, contexts and transaction managers.
//!
//! Lets the sweep machinery run without a real database server: the CLI
//! demo and the test suites both build their pending sets from these types.

pub mod connection;
pub mod context;

pub use connection::{ConnectionState, MemoryConnection};
pub use context::{MemoryExecutionContext, MemorySession, MemoryTransactionManager};
