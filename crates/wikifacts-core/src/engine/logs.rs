//! Append-only JSON-lines audit logs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// One successfully judged fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLogEntry {
    pub prompt: String,
    pub prediction: String,
    pub reasoning: String,
    pub output: String,
}

/// One fact with no judgment after all attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLogEntry {
    pub fact: String,
    pub error: String,
}

/// JSON-lines file opened in append mode for every entry. Existing lines
/// are never rewritten.
#[derive(Debug, Clone)]
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append<T: Serialize>(&self, entry: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlLog::new(dir.path().join("logs").join("failures.jsonl"));
        for fact in ["a", "b"] {
            log.append(&FailureLogEntry {
                fact: fact.to_string(),
                error: "Unable to parse JSON".to_string(),
            })
            .await
            .unwrap();
        }

        let text = std::fs::read_to_string(log.path()).unwrap();
        let entries: Vec<FailureLogEntry> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].fact, "b");
    }
}
