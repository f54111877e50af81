//! Judge internals.
//!
//! - extract.rs: JSON object recovery from free-text completions
//! - protocol.rs: bounded retry/repair loop against the chat model
//! - translate.rs: template localization with contract-key masking

pub(crate) mod extract;
pub(crate) mod protocol;
pub(crate) mod translate;
