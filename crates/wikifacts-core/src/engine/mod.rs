//! Checkpointed orchestration of a batch of facts.

pub mod checkpoint;
pub mod context;
pub mod logs;
pub mod runner;

pub use checkpoint::Checkpoint;
pub use context::{ContextResolver, ContextSource, FactJudge, GroundedJudge};
pub use runner::{Orchestrator, OrchestratorConfig, RunReport};
