use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How token-level encoder output collapses into one vector per text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Mean over non-padding positions (attention mask).
    #[default]
    Mean,
    /// The first token's vector.
    Cls,
}

impl FromStr for Pooling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" => Ok(Self::Mean),
            "cls" => Ok(Self::Cls),
            other => Err(format!("unknown pooling '{other}' (expected mean|cls)")),
        }
    }
}

impl fmt::Display for Pooling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mean => "mean",
            Self::Cls => "cls",
        })
    }
}

pub(crate) fn pool(tokens: &[Vec<f32>], mask: &[u8], pooling: Pooling) -> Vec<f32> {
    let dim = tokens.first().map_or(0, Vec::len);
    match pooling {
        Pooling::Cls => tokens.first().cloned().unwrap_or_default(),
        Pooling::Mean => {
            let mut acc = vec![0.0f32; dim];
            let mut count = 0usize;
            for (tok, m) in tokens.iter().zip(mask) {
                if *m == 0 {
                    continue;
                }
                count += 1;
                for (a, x) in acc.iter_mut().zip(tok) {
                    *a += x;
                }
            }
            let denom = count.max(1) as f32;
            acc.iter_mut().for_each(|a| *a /= denom);
            acc
        }
    }
}

/// Scale to unit L2 norm; zero vectors stay zero.
pub(crate) fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pool_ignores_padding() {
        let tokens = vec![vec![1.0, 3.0], vec![3.0, 1.0], vec![100.0, 100.0]];
        assert_eq!(pool(&tokens, &[1, 1, 0], Pooling::Mean), vec![2.0, 2.0]);
    }

    #[test]
    fn cls_pool_takes_first_token() {
        let tokens = vec![vec![0.5, 0.25], vec![9.0, 9.0]];
        assert_eq!(pool(&tokens, &[1, 1], Pooling::Cls), vec![0.5, 0.25]);
    }

    #[test]
    fn normalize_yields_unit_norm() {
        let v = l2_normalize(vec![3.0, 4.0]);
        assert!((dot(&v, &v) - 1.0).abs() < 1e-6);
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
