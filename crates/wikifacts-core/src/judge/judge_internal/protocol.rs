use super::extract::extract_judgment;
use crate::errors::{JudgeError, TransportError};
use crate::model::{ChatMessage, DecodingParams};
use crate::providers::llm::ChatModel;
use serde_json::{Map, Value};
use std::time::Duration;

pub(crate) struct ProtocolLimits {
    pub(crate) max_attempts: u32,
    pub(crate) retry_backoff: Duration,
    pub(crate) call_timeout: Duration,
}

/// An accepted completion: the raw text and the object it carried.
#[derive(Debug)]
pub(crate) struct Accepted {
    pub(crate) raw: String,
    pub(crate) object: Map<String, Value>,
    pub(crate) attempts: u32,
}

/// Run the bounded retry/repair loop.
///
/// Transport failures of any kind, except a network-policy block, retry the
/// same history after a fixed backoff.
/// Contract defects append the model's output and a corrective system
/// message, then retry immediately. Both consume one attempt.
pub(crate) async fn run(
    model: &dyn ChatModel,
    mut messages: Vec<ChatMessage>,
    decoding: &DecodingParams,
    limits: &ProtocolLimits,
) -> Result<Accepted, JudgeError> {
    let max_attempts = limits.max_attempts.max(1);
    let mut last_error: Option<JudgeError> = None;

    for attempt in 1..=max_attempts {
        let result = tokio::time::timeout(limits.call_timeout, model.chat(&messages, decoding))
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Timeout {
                    timeout_secs: limits.call_timeout.as_secs(),
                })
            });

        match result {
            Ok(resp) => match extract_judgment(&resp.content) {
                Ok(object) => {
                    tracing::debug!(attempt, model = %resp.model, "judgment accepted");
                    return Ok(Accepted {
                        raw: resp.content,
                        object,
                        attempts: attempt,
                    });
                }
                Err(defect) => {
                    tracing::warn!(attempt, max_attempts, defect = %defect, "malformed model output");
                    messages.push(ChatMessage::assistant(resp.content));
                    messages.push(ChatMessage::system(defect.correction()));
                    last_error = Some(defect.into());
                }
            },
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    retryable = err.is_retryable(),
                    error = %err,
                    "model call failed"
                );
                // A policy block is local; resending cannot change the outcome.
                if matches!(err, TransportError::Blocked { .. }) {
                    return Err(JudgeError::ExhaustedRetries {
                        attempts: attempt,
                        last_error: Box::new(err.into()),
                    });
                }
                last_error = Some(err.into());
                if attempt < max_attempts && !limits.retry_backoff.is_zero() {
                    tokio::time::sleep(limits.retry_backoff).await;
                }
            }
        }
    }

    Err(JudgeError::ExhaustedRetries {
        attempts: max_attempts,
        last_error: Box::new(last_error.unwrap_or_else(|| {
            JudgeError::MalformedOutput(crate::errors::MalformedOutput::NoJson)
        })),
    })
}
