use super::{EncodedBatch, TokenEncoder};
use crate::errors::EncoderError;
use async_trait::async_trait;

/// Deterministic offline encoder.
///
/// Each word becomes a one-hot vector in a hashed feature space; a leading
/// CLS token carries the sum of all word vectors. Similarity between two
/// texts therefore tracks their lexical overlap. Useful without a model
/// server and in tests.
pub struct HashingEncoder {
    dims: usize,
    max_len: usize,
}

impl HashingEncoder {
    pub fn new(dims: usize, max_len: usize) -> Self {
        Self {
            dims: dims.max(1),
            max_len: max_len.max(1),
        }
    }

    fn encode_one(&self, text: &str) -> Vec<Vec<f32>> {
        let words: Vec<Vec<f32>> = tokenize(text)
            .take(self.max_len.saturating_sub(1))
            .map(|word| {
                let mut v = vec![0.0f32; self.dims];
                v[(fnv1a(&word) % self.dims as u64) as usize] = 1.0;
                v
            })
            .collect();

        let mut cls = vec![0.0f32; self.dims];
        for w in &words {
            for (c, x) in cls.iter_mut().zip(w) {
                *c += x;
            }
        }

        let mut seq = Vec::with_capacity(words.len() + 1);
        seq.push(cls);
        seq.extend(words);
        seq
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self::new(4096, 512)
    }
}

#[async_trait]
impl TokenEncoder for HashingEncoder {
    async fn encode(&self, texts: &[String]) -> Result<EncodedBatch, EncoderError> {
        Ok(EncodedBatch::from_sequences(
            texts.iter().map(|t| self.encode_one(t)).collect(),
        ))
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(word: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in word.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}
