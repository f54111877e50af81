//! Error taxonomy for the evaluation pipeline.
//!
//! Per-fact failures ([`JudgeError`]) are contained inside one work item and
//! never abort a batch. Only [`ConfigError`] is fatal, and only at startup.

use std::path::PathBuf;

/// Failure talking to a model or encoder endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call did not complete within the per-call timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure (DNS, refused, reset).
    #[error("network error: {message}")]
    Network { message: String },

    /// The endpoint answered 2xx but the body was not what the protocol expects.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Outbound traffic is disabled by the process network policy.
    #[error("outbound network blocked by policy (target={target}): {reason}")]
    Blocked { target: String, reason: String },
}

impl TransportError {
    /// Whether the failure looks transient. Logged with every failed attempt;
    /// the judgment protocol retries every variant except `Blocked`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::InvalidResponse { .. } => true,
            Self::Http { status, .. } => matches!(*status, 408 | 409 | 425 | 429 | 500..=599),
            Self::Blocked { .. } => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout { timeout_secs: 0 };
        }
        if err.is_decode() {
            return Self::InvalidResponse {
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Defect in a model completion that breaks the JSON output contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedOutput {
    #[error("no JSON object found in the response")]
    NoJson,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("the JSON value is not an object")]
    NotAnObject,

    #[error("the JSON object is missing required key(s): {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

impl MalformedOutput {
    /// Corrective instruction appended to the conversation after this defect.
    pub fn correction(&self) -> String {
        let defect = match self {
            Self::NoJson => "Your previous response did not contain a JSON object.".to_string(),
            Self::InvalidJson(detail) => {
                format!("Your previous response contained invalid JSON ({detail}).")
            }
            Self::NotAnObject => {
                "Your previous response was JSON, but not a JSON object.".to_string()
            }
            Self::MissingKeys(keys) => format!(
                "Your previous response was missing the required key(s): {}.",
                keys.iter()
                    .map(|k| format!("\"{k}\""))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        format!(
            "{defect} Respond again with only a JSON object containing the keys \"answer\" and \"reasoning\"."
        )
    }
}

/// Outcome of a failed judgment for one fact.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// Endpoint unreachable, timed out or returned an error status.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The model answered but broke the output contract.
    #[error("malformed model output: {0}")]
    MalformedOutput(#[from] MalformedOutput),

    /// Every attempt failed; terminal for this fact in this run.
    #[error("no judgment after {attempts} attempt(s): {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        last_error: Box<JudgeError>,
    },
}

impl JudgeError {
    /// Message recorded in the failure log.
    pub fn failure_message(&self) -> String {
        match self {
            Self::ExhaustedRetries { last_error, .. } => last_error.failure_message(),
            Self::MalformedOutput(_) => "Unable to parse JSON".to_string(),
            Self::Transport(e) => e.to_string(),
        }
    }
}

/// Failure of the embedding encoder collaborator.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error("encoder transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("encoder returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("encoder returned an empty token sequence for input {index}")]
    EmptySequence { index: usize },
}

/// Failure persisting the checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid or unreadable configuration. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure loading a facts or corpus file.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{path}:{line}: missing required field '{field}'")]
    MissingField {
        path: PathBuf,
        line: usize,
        field: &'static str,
    },

    #[error("{path}: duplicate id '{id}'")]
    DuplicateId { path: PathBuf, id: String },
}
