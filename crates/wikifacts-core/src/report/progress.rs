//! Run progress, emitted by the orchestrator in completion order.

use std::sync::Arc;

/// Facts resolved so far out of the work set of this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

/// Called once per completed fact. Implementations may throttle.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;
