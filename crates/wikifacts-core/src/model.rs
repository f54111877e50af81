use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical judgment outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    Idk,
}

impl Answer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Idk => "idk",
        }
    }

    /// Map a model-provided answer onto the canonical set.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace and
    /// trailing punctuation. Returns `None` for anything else.
    pub fn canonicalize(raw: &str) -> Option<Self> {
        let norm = raw
            .trim()
            .trim_end_matches(['.', '!'])
            .trim()
            .to_lowercase()
            .replace('’', "'");
        match norm.as_str() {
            "yes" | "true" => Some(Self::Yes),
            "no" | "false" => Some(Self::No),
            "idk" | "i don't know" | "i dont know" | "don't know" | "dont know" | "unknown" => {
                Some(Self::Idk)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful judgment for one fact, as stored in the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    pub answer: Answer,
    pub reasoning: String,
}

impl JudgmentRecord {
    /// Build a record from an accepted `{answer, reasoning}` object.
    ///
    /// `None` means the object honoured the key contract but its values are
    /// unusable; callers store that as the explicit failure sentinel.
    pub fn from_object(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let answer = obj.get("answer")?.as_str().and_then(Answer::canonicalize)?;
        let reasoning = obj.get("reasoning")?.as_str()?.trim().to_string();
        Some(Self { answer, reasoning })
    }
}

/// A statement to be judged. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub linked_article_ids: Vec<String>,
    #[serde(default)]
    pub relevant_article_ids: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Gold truth value; `None` means the statement is true.
    #[serde(default)]
    pub label: Option<bool>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Fact {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            linked_article_ids: Vec::new(),
            relevant_article_ids: Vec::new(),
            keywords: Vec::new(),
            label: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn is_true(&self) -> bool {
        self.label.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Reference article usable as grounding context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub full_text: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub metadata: ArticleMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged turn sent to a chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Decoding parameters, held constant for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u32>,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.9,
            max_tokens: None,
        }
    }
}

/// Free-text completion returned by a chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
}
