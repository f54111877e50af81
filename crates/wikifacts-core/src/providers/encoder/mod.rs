//! Token-level embedding encoders used by the fragment retriever.

pub mod hashing;
pub mod http;

use crate::errors::EncoderError;
use async_trait::async_trait;

/// Token-level encoder output for one batch, padded to the longest sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    /// `[batch][seq][dim]`
    pub token_embeddings: Vec<Vec<Vec<f32>>>,
    /// `[batch][seq]`, 1 for real tokens and 0 for padding.
    pub attention_mask: Vec<Vec<u8>>,
}

impl EncodedBatch {
    /// Pad variable-length sequences with zero vectors and build the mask.
    pub fn from_sequences(sequences: Vec<Vec<Vec<f32>>>) -> Self {
        let max_seq = sequences.iter().map(Vec::len).max().unwrap_or(0);
        let dim = sequences
            .iter()
            .flat_map(|s| s.first())
            .map(Vec::len)
            .next()
            .unwrap_or(0);

        let mut token_embeddings = Vec::with_capacity(sequences.len());
        let mut attention_mask = Vec::with_capacity(sequences.len());
        for mut seq in sequences {
            let real = seq.len();
            seq.resize_with(max_seq, || vec![0.0; dim]);
            let mut mask = vec![1u8; real];
            mask.resize(max_seq, 0);
            token_embeddings.push(seq);
            attention_mask.push(mask);
        }
        Self {
            token_embeddings,
            attention_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.token_embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_embeddings.is_empty()
    }
}

#[async_trait]
pub trait TokenEncoder: Send + Sync {
    async fn encode(&self, texts: &[String]) -> Result<EncodedBatch, EncoderError>;

    fn name(&self) -> &str;
}
