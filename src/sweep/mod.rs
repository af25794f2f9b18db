// ============================================================================
// Idle Transaction Sweep
// ============================================================================
//
// One sweep = one pass over the idle transactions of a single data source.
// The guard keeps sweeps single-flight per data source, the task runs the
// pass, and the job is the unit a scheduler spawns per trigger.
//
// ============================================================================

pub mod config;
pub mod guard;
pub mod job;
pub mod task;

use crate::connection::ExecutionContext;
use crate::core::ResourceId;
use crate::transaction::{TerminationOutcome, TransactionManager};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub use config::SweepConfig;
pub use guard::{ActiveResourceGuard, ResourceClaim};
pub use job::IdleSweepJob;
pub use task::IdleSweepTask;

/// Pair of an execution context and the transaction manager bound to it
pub type PendingPair = (Arc<dyn ExecutionContext>, Arc<dyn TransactionManager>);

/// Execution contexts whose transactions should be ended, in insertion order
///
/// Built fresh for each sweep and consumed by it.
#[derive(Default)]
pub struct PendingTerminations {
    pairs: Vec<PendingPair>,
}

impl PendingTerminations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, context: Arc<dyn ExecutionContext>, manager: Arc<dyn TransactionManager>) {
        self.pairs.push((context, manager));
    }

    pub fn with(
        mut self,
        context: Arc<dyn ExecutionContext>,
        manager: Arc<dyn TransactionManager>,
    ) -> Self {
        self.push(context, manager);
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Context names in sweep order
    pub fn context_names(&self) -> Vec<String> {
        self.pairs
            .iter()
            .map(|(context, _)| context.name().to_string())
            .collect()
    }
}

impl IntoIterator for PendingTerminations {
    type Item = PendingPair;
    type IntoIter = std::vec::IntoIter<PendingPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl FromIterator<PendingPair> for PendingTerminations {
    fn from_iter<I: IntoIterator<Item = PendingPair>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for PendingTerminations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTerminations")
            .field("contexts", &self.context_names())
            .finish()
    }
}

/// Steps a sweep moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Idle,
    Claiming,
    Running,
    Notifying,
    Releasing,
    Done,
    SkippedAlreadyRunning,
}

impl SweepPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SweepPhase::Done | SweepPhase::SkippedAlreadyRunning)
    }
}

impl fmt::Display for SweepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepPhase::Idle => "idle",
            SweepPhase::Claiming => "claiming",
            SweepPhase::Running => "running",
            SweepPhase::Notifying => "notifying",
            SweepPhase::Releasing => "releasing",
            SweepPhase::Done => "done",
            SweepPhase::SkippedAlreadyRunning => "skipped_already_running",
        };
        f.write_str(name)
    }
}

/// How a sweep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    /// The pass ran over every pending pair (or up to cancellation)
    Done,
    /// Another sweep for the same resource was already running
    SkippedAlreadyRunning,
}

/// Per-item results of one sweep
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub resource: ResourceId,
    pub status: SweepStatus,
    pub outcomes: Vec<TerminationOutcome>,
    pub canceled: bool,
    pub notified: bool,
}

impl SweepReport {
    pub(crate) fn skipped(sweep_id: Uuid, resource: ResourceId) -> Self {
        Self {
            sweep_id,
            resource,
            status: SweepStatus::SkippedAlreadyRunning,
            outcomes: Vec::new(),
            canceled: false,
            notified: false,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status == SweepStatus::SkippedAlreadyRunning
    }

    pub fn rolled_back_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_rolled_back()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TerminationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            SweepStatus::SkippedAlreadyRunning => {
                write!(f, "Sweep {}: skipped, already running", self.resource)
            }
            SweepStatus::Done => write!(
                f,
                "Sweep {}: {} rolled back, {} failed, {} skipped{}",
                self.resource,
                self.rolled_back_count(),
                self.failed_count(),
                self.skipped_count(),
                if self.canceled { " (canceled)" } else { "" }
            ),
        }
    }
}
