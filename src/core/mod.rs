pub mod error;
pub mod monitor;
pub mod types;

pub use error::{Result, SweepError};
pub use monitor::ProgressMonitor;
pub use types::{DataSourceInfo, ExecutionPurpose, MessageType, ResourceId, Savepoint};
