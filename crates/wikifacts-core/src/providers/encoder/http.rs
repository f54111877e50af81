use super::{EncodedBatch, TokenEncoder};
use crate::errors::{EncoderError, TransportError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Client for a text-embeddings-inference style server.
///
/// Calls `POST {url}/embed_all`, which returns one vector per token for every
/// input, and pads the result into an [`EncodedBatch`].
pub struct HttpTokenEncoder {
    url: String,
    max_len: usize,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTokenEncoder {
    pub fn new(
        url: impl Into<String>,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network {
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            max_len: max_len.max(1),
            timeout,
            client,
        })
    }

    async fn post(&self, texts: &[String]) -> Result<Vec<Vec<Vec<f32>>>, TransportError> {
        let url = format!("{}/embed_all", self.url);
        crate::providers::network::check_outbound(&url)?;

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "inputs": texts, "truncate": true }))
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }
        resp.json().await.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            TransportError::from(err)
        }
    }
}

#[async_trait]
impl TokenEncoder for HttpTokenEncoder {
    async fn encode(&self, texts: &[String]) -> Result<EncodedBatch, EncoderError> {
        if texts.is_empty() {
            return Ok(EncodedBatch::from_sequences(Vec::new()));
        }
        let mut sequences = self.post(texts).await?;
        if sequences.len() != texts.len() {
            return Err(EncoderError::CountMismatch {
                expected: texts.len(),
                got: sequences.len(),
            });
        }
        for (index, seq) in sequences.iter_mut().enumerate() {
            if seq.is_empty() {
                return Err(EncoderError::EmptySequence { index });
            }
            seq.truncate(self.max_len);
        }
        Ok(EncodedBatch::from_sequences(sequences))
    }

    fn name(&self) -> &str {
        "http"
    }
}
