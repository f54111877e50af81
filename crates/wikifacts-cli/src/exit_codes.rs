//! Process exit codes. Part of the public contract of `wikifacts`.

pub const SUCCESS: i32 = 0;
/// The run finished but at least one fact exhausted its retries.
pub const RUN_INCOMPLETE: i32 = 1;
/// Invalid configuration or unreadable dataset.
pub const CONFIG_ERROR: i32 = 2;
/// Checkpoint, log or other I/O failure.
pub const INFRA_ERROR: i32 = 3;
