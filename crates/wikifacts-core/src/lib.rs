//! Core of the WikiFacts evaluation pipeline.
//!
//! The pipeline turns a batch of short factual statements into judged,
//! checkpointed predictions:
//!
//! - [`judge::JudgmentClient`] sends a mode-specific prompt to a chat model and
//!   enforces the `{"answer", "reasoning"}` output contract, repairing
//!   malformed output through corrective follow-up turns.
//! - [`retrieval::FragmentRetriever`] splits long articles into fragments and
//!   ranks them against the statement by embedding similarity.
//! - [`engine::Orchestrator`] drives a bounded pool of concurrent judgments,
//!   persisting the checkpoint after every completion so that an interrupted
//!   run resumes exactly where it stopped.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod judge;
pub mod model;
pub mod prompt;
pub mod providers;
pub mod report;
pub mod retrieval;

pub use config::EvalConfig;
pub use engine::{Checkpoint, FactJudge, GroundedJudge, Orchestrator, RunReport};
pub use errors::{JudgeError, MalformedOutput, TransportError};
pub use judge::{Judgment, JudgmentClient};
pub use model::{Answer, Article, Fact, JudgmentRecord};
pub use retrieval::FragmentRetriever;
