//! Embedding-based fragment retrieval.
//!
//! A long document is split into fragments, every fragment and the query are
//! embedded with the same encoder and pooling policy, unit-normalized, and
//! ranked by cosine similarity (a dot product after normalization). Ties
//! keep document order.

mod pooling;
pub mod split;

pub use pooling::Pooling;

use crate::errors::EncoderError;
use crate::providers::encoder::TokenEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Splitter {
    Sentence,
    #[default]
    Paragraph,
}

impl Splitter {
    pub fn split(&self, text: &str) -> Vec<String> {
        match self {
            Self::Sentence => split::sentences(text),
            Self::Paragraph => split::paragraphs(text),
        }
    }
}

impl FromStr for Splitter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentence" => Ok(Self::Sentence),
            "paragraph" => Ok(Self::Paragraph),
            other => Err(format!(
                "unknown splitter '{other}' (expected sentence|paragraph)"
            )),
        }
    }
}

impl fmt::Display for Splitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sentence => "sentence",
            Self::Paragraph => "paragraph",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieverConfig {
    pub splitter: Splitter,
    pub pooling: Pooling,
    /// Texts per encoder call. Affects throughput only.
    pub batch_size: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            splitter: Splitter::Paragraph,
            pooling: Pooling::Mean,
            batch_size: 16,
        }
    }
}

pub struct FragmentRetriever {
    encoder: Arc<dyn TokenEncoder>,
    config: RetrieverConfig,
}

impl FragmentRetriever {
    pub fn new(encoder: Arc<dyn TokenEncoder>, config: RetrieverConfig) -> Self {
        Self { encoder, config }
    }

    /// Top-`top_k` fragments of `document` by similarity to `query`,
    /// most similar first. Empty when the document has no fragments.
    pub async fn retrieve(
        &self,
        query: &str,
        document: &str,
        top_k: usize,
    ) -> Result<Vec<String>, EncoderError> {
        let fragments = self.config.splitter.split(document);
        if fragments.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_emb = self
            .embed(&[query.to_string()])
            .await?
            .pop()
            .unwrap_or_default();
        let frag_embs = self.embed(&fragments).await?;

        let mut ranked: Vec<(usize, f32)> = frag_embs
            .iter()
            .enumerate()
            .map(|(i, e)| (i, pooling::dot(&query_emb, e)))
            .collect();
        // sort_by is stable: equal scores keep document order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::debug!(
            fragments = fragments.len(),
            top_k,
            best = ranked.first().map(|r| r.1),
            "ranked fragments"
        );

        let mut fragments: Vec<Option<String>> = fragments.into_iter().map(Some).collect();
        Ok(ranked
            .into_iter()
            .take(top_k)
            .filter_map(|(i, _)| fragments[i].take())
            .collect())
    }

    /// Pooled, unit-normalized embeddings in input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncoderError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let batch = self.encoder.encode(chunk).await?;
            if batch.len() != chunk.len() {
                return Err(EncoderError::CountMismatch {
                    expected: chunk.len(),
                    got: batch.len(),
                });
            }
            for (tokens, mask) in batch.token_embeddings.iter().zip(&batch.attention_mask) {
                out.push(pooling::l2_normalize(pooling::pool(
                    tokens,
                    mask,
                    self.config.pooling,
                )));
            }
        }
        Ok(out)
    }
}
