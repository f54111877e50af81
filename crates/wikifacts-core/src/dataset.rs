//! JSON-lines loaders for the `queries` and `corpus` splits.
//!
//! Records follow the published dataset layout, so both the spaced keys
//! (`"linked articles"`) and snake_case keys (`linked_article_ids`) are
//! accepted. Ids may be strings or integers.

use crate::errors::DatasetError;
use crate::model::{Article, ArticleMetadata, Fact};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Read-only article lookup, fully loaded before orchestration starts.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    articles: HashMap<String, Article>,
}

impl Corpus {
    pub fn new(articles: impl IntoIterator<Item = Article>) -> Self {
        Self {
            articles: articles.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.get(id)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

pub fn load_facts(path: &Path) -> Result<Vec<Fact>, DatasetError> {
    let mut seen = HashSet::new();
    let mut facts = Vec::new();
    for (line, obj) in read_records(path)? {
        let fact = parse_fact(path, line, &obj)?;
        if !seen.insert(fact.id.clone()) {
            return Err(DatasetError::DuplicateId {
                path: path.to_path_buf(),
                id: fact.id,
            });
        }
        facts.push(fact);
    }
    tracing::debug!(path = %path.display(), count = facts.len(), "loaded facts");
    Ok(facts)
}

pub fn load_corpus(path: &Path) -> Result<Corpus, DatasetError> {
    let mut articles = HashMap::new();
    for (line, obj) in read_records(path)? {
        let article = parse_article(path, line, &obj)?;
        if articles.contains_key(&article.id) {
            return Err(DatasetError::DuplicateId {
                path: path.to_path_buf(),
                id: article.id,
            });
        }
        articles.insert(article.id.clone(), article);
    }
    tracing::debug!(path = %path.display(), count = articles.len(), "loaded corpus");
    Ok(Corpus { articles })
}

fn read_records(path: &Path) -> Result<Vec<(usize, Map<String, Value>)>, DatasetError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message: e.to_string(),
        })?;
        match value {
            Value::Object(obj) => out.push((line_no, obj)),
            other => {
                return Err(DatasetError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: format!("expected a JSON object, got {}", type_name(&other)),
                })
            }
        }
    }
    Ok(out)
}

fn parse_fact(path: &Path, line: usize, obj: &Map<String, Value>) -> Result<Fact, DatasetError> {
    let ctx = RecordCtx { path, line };
    let id = ctx.id(obj)?;
    let text = ctx.required_str(obj, &["text"], "text")?;

    Ok(Fact {
        id,
        text,
        linked_article_ids: ctx.id_list(obj, &["linked articles", "linked_article_ids", "linked_articles"])?,
        relevant_article_ids: ctx.id_list(
            obj,
            &["relevant articles", "relevant_article_ids", "relevant_articles"],
        )?,
        keywords: ctx.string_list(obj, &["keywords"])?,
        label: label(obj),
        metadata: obj.get("metadata").cloned().unwrap_or(Value::Null),
    })
}

fn parse_article(
    path: &Path,
    line: usize,
    obj: &Map<String, Value>,
) -> Result<Article, DatasetError> {
    let ctx = RecordCtx { path, line };
    let id = ctx.id(obj)?;
    let full_text = ctx.required_str(obj, &["text", "full_text"], "text")?;
    let abstract_text = first(obj, &["abstract", "abstract_text"])
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let metadata = match obj.get("metadata") {
        Some(Value::Object(meta)) => {
            let mut extra = meta.clone();
            let source_url = extra
                .remove("source_url")
                .or_else(|| extra.remove("url"))
                .and_then(|v| v.as_str().map(str::to_string));
            ArticleMetadata { source_url, extra }
        }
        _ => ArticleMetadata::default(),
    };

    Ok(Article {
        id,
        full_text,
        abstract_text,
        metadata,
    })
}

struct RecordCtx<'a> {
    path: &'a Path,
    line: usize,
}

impl RecordCtx<'_> {
    fn path(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    fn id(&self, obj: &Map<String, Value>) -> Result<String, DatasetError> {
        match first(obj, &["id", "_id", "qid"]) {
            Some(v) => id_string(v).ok_or_else(|| DatasetError::Parse {
                path: self.path(),
                line: self.line,
                message: format!("id must be a string or integer, got {}", type_name(v)),
            }),
            None => Err(DatasetError::MissingField {
                path: self.path(),
                line: self.line,
                field: "id",
            }),
        }
    }

    fn required_str(
        &self,
        obj: &Map<String, Value>,
        keys: &[&str],
        field: &'static str,
    ) -> Result<String, DatasetError> {
        first(obj, keys)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DatasetError::MissingField {
                path: self.path(),
                line: self.line,
                field,
            })
    }

    fn id_list(&self, obj: &Map<String, Value>, keys: &[&str]) -> Result<Vec<String>, DatasetError> {
        match first(obj, keys) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    id_string(v).ok_or_else(|| DatasetError::Parse {
                        path: self.path(),
                        line: self.line,
                        message: format!("article id must be a string or integer, got {}", type_name(v)),
                    })
                })
                .collect(),
            Some(v) => id_string(v).map(|id| vec![id]).ok_or_else(|| DatasetError::Parse {
                path: self.path(),
                line: self.line,
                message: format!("expected a list of article ids, got {}", type_name(v)),
            }),
        }
    }

    fn string_list(
        &self,
        obj: &Map<String, Value>,
        keys: &[&str],
    ) -> Result<Vec<String>, DatasetError> {
        match first(obj, keys) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()),
            Some(Value::String(s)) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            Some(v) => Err(DatasetError::Parse {
                path: self.path(),
                line: self.line,
                message: format!("expected a list of strings, got {}", type_name(v)),
            }),
        }
    }
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn label(obj: &Map<String, Value>) -> Option<bool> {
    let raw = obj
        .get("label")
        .or_else(|| obj.get("metadata").and_then(|m| m.get("label")))?;
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
        f
    }

    #[test]
    fn loads_facts_with_dataset_keys() {
        let f = write_lines(&[
            r#"{"id": 7, "text": "Paris is the capital of France.", "linked articles": [1, "2"], "relevant articles": ["3"], "keywords": ["Paris", "capital"], "metadata": {"lang": "en"}}"#,
            "",
            r#"{"id": "q2", "text": "Oslo is in Sweden.", "label": false}"#,
        ]);
        let facts = load_facts(f.path()).unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].id, "7");
        assert_eq!(facts[0].linked_article_ids, vec!["1", "2"]);
        assert_eq!(facts[0].relevant_article_ids, vec!["3"]);
        assert_eq!(facts[0].keywords, vec!["Paris", "capital"]);
        assert!(facts[0].is_true());
        assert_eq!(facts[1].label, Some(false));
        assert!(facts[1].linked_article_ids.is_empty());
    }

    #[test]
    fn duplicate_fact_ids_are_rejected() {
        let f = write_lines(&[
            r#"{"id": "a", "text": "one"}"#,
            r#"{"id": "a", "text": "two"}"#,
        ]);
        let err = load_facts(f.path()).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateId { id, .. } if id == "a"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let f = write_lines(&[r#"{"id": "a", "text": "one"}"#, "{not json"]);
        let err = load_facts(f.path()).unwrap_err();
        assert!(matches!(err, DatasetError::Parse { line: 2, .. }));
    }

    #[test]
    fn missing_text_is_reported() {
        let f = write_lines(&[r#"{"id": "a"}"#]);
        let err = load_facts(f.path()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingField { field: "text", .. }));
    }

    #[test]
    fn loads_corpus_with_source_url() {
        let f = write_lines(&[
            r#"{"id": "1", "text": "Full body.", "abstract": "Short.", "metadata": {"source_url": "https://en.wikipedia.org/wiki/Paris", "title": "Paris"}}"#,
        ]);
        let corpus = load_corpus(f.path()).unwrap();
        let article = corpus.get("1").unwrap();
        assert_eq!(article.abstract_text, "Short.");
        assert_eq!(
            article.metadata.source_url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Paris")
        );
        assert_eq!(article.metadata.extra["title"], "Paris");
        assert!(corpus.get("2").is_none());
    }
}
