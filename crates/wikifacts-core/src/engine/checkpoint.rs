//! Durable fact id -> judgment mapping.
//!
//! On disk this is one JSON object. A value is either a judgment record or
//! `null`, the explicit sentinel for an accepted but unusable completion.
//! Any key present marks the fact as resolved.

use crate::errors::CheckpointError;
use crate::model::JudgmentRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    entries: BTreeMap<String, Option<JudgmentRecord>>,
}

impl Checkpoint {
    /// Load from `path`. Missing, empty and corrupt files all yield an empty
    /// checkpoint; corruption is logged.
    pub async fn load(path: &Path) -> Result<Self, CheckpointError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Self::parse(path, &text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(CheckpointError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Blocking variant of [`Checkpoint::load`] for callers outside a runtime.
    pub fn load_blocking(path: &Path) -> Result<Self, CheckpointError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(path, &text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(CheckpointError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn parse(path: &Path, text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<BTreeMap<String, Option<JudgmentRecord>>>(text) {
            Ok(entries) => Self { entries },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "checkpoint is unreadable, starting from an empty checkpoint"
                );
                Self::default()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// `None` if absent, `Some(None)` for the sentinel.
    pub fn get(&self, id: &str) -> Option<Option<&JudgmentRecord>> {
        self.entries.get(id).map(Option::as_ref)
    }

    pub fn insert(&mut self, id: impl Into<String>, record: Option<JudgmentRecord>) {
        self.entries.insert(id.into(), record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&JudgmentRecord>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Overwrite `path` with the full mapping.
    ///
    /// Written to a sibling temp file and renamed into place, so a reader
    /// (or a crash) never observes a partial file.
    pub async fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let body = serde_json::to_string_pretty(&self.entries)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CheckpointError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let temp_path = temp_path_for(path);
        tokio::fs::write(&temp_path, body)
            .await
            .map_err(|source| CheckpointError::Io {
                path: temp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|source| CheckpointError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answer;
    use tempfile::tempdir;

    fn record(answer: Answer) -> JudgmentRecord {
        JudgmentRecord {
            answer,
            reasoning: "r".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_and_empty_files_are_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        assert!(Checkpoint::load(&path).await.unwrap().is_empty());

        std::fs::write(&path, "  \n").unwrap();
        assert!(Checkpoint::load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{\"f1\": {\"answer\": \"yes\"").unwrap();
        assert!(Checkpoint::load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_sentinels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("checkpoint.json");
        let mut cp = Checkpoint::default();
        cp.insert("f1", Some(record(Answer::Yes)));
        cp.insert("f2", None);
        cp.save(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["f1"]["answer"], "yes");
        assert!(raw["f2"].is_null());
        assert!(!dir.path().join("nested").join("checkpoint.json.tmp").exists());

        let loaded = Checkpoint::load_blocking(&path).unwrap();
        assert_eq!(loaded, cp);
        assert_eq!(loaded.get("f2"), Some(None));
        assert_eq!(loaded.get("f3"), None);
        assert!(loaded.contains("f2"));
    }

    #[tokio::test]
    async fn save_overwrites_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut cp = Checkpoint::default();
        cp.insert("a", Some(record(Answer::No)));
        cp.save(&path).await.unwrap();
        cp.insert("b", Some(record(Answer::Idk)));
        cp.save(&path).await.unwrap();
        assert_eq!(Checkpoint::load(&path).await.unwrap().len(), 2);
    }
}
