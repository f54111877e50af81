//! Per-fact context resolution and the judge seam used by the orchestrator.

use crate::dataset::Corpus;
use crate::errors::JudgeError;
use crate::judge::{Judgment, JudgmentClient};
use crate::model::Fact;
use crate::prompt::JudgeMode;
use crate::retrieval::FragmentRetriever;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which article text grounds a judgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    Abstract,
    #[default]
    Full,
}

impl FromStr for ContextSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abstract" => Ok(Self::Abstract),
            "full" | "full_text" => Ok(Self::Full),
            other => Err(format!(
                "unknown context source '{other}' (expected abstract|full)"
            )),
        }
    }
}

impl fmt::Display for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abstract => "abstract",
            Self::Full => "full",
        })
    }
}

/// Turns a fact's article references into context fragments.
pub struct ContextResolver {
    corpus: Arc<Corpus>,
    mode: JudgeMode,
    source: ContextSource,
    retrieval: Option<(Arc<FragmentRetriever>, usize)>,
}

impl ContextResolver {
    pub fn new(corpus: Arc<Corpus>, mode: JudgeMode, source: ContextSource) -> Self {
        Self {
            corpus,
            mode,
            source,
            retrieval: None,
        }
    }

    /// Rank fragments of the concatenated articles and keep `top_k`.
    pub fn with_retriever(mut self, retriever: Arc<FragmentRetriever>, top_k: usize) -> Self {
        self.retrieval = Some((retriever, top_k));
        self
    }

    /// `None` in fact-only mode. Article ids missing from the corpus are
    /// skipped with a warning.
    pub async fn resolve(&self, fact: &Fact) -> Option<Vec<String>> {
        let ids = match self.mode {
            JudgeMode::Fact => return None,
            JudgeMode::Linked => &fact.linked_article_ids,
            JudgeMode::Relevant => &fact.relevant_article_ids,
        };

        let texts: Vec<String> = ids
            .iter()
            .filter_map(|id| match self.corpus.get(id) {
                Some(article) => Some(match self.source {
                    ContextSource::Abstract => article.abstract_text.clone(),
                    ContextSource::Full => article.full_text.clone(),
                }),
                None => {
                    tracing::warn!(fact_id = %fact.id, article_id = %id, "article missing from corpus, omitting context");
                    None
                }
            })
            .filter(|t| !t.trim().is_empty())
            .collect();

        let Some((retriever, top_k)) = &self.retrieval else {
            return Some(texts);
        };
        if texts.is_empty() {
            return Some(texts);
        }

        let document = texts.join("\n\n");
        match retriever.retrieve(&fact.text, &document, *top_k).await {
            Ok(fragments) if !fragments.is_empty() => Some(fragments),
            Ok(_) => {
                tracing::debug!(fact_id = %fact.id, "no fragments retrieved, using full context");
                Some(texts)
            }
            Err(e) => {
                tracing::warn!(fact_id = %fact.id, error = %e, "retrieval failed, using full context");
                Some(texts)
            }
        }
    }
}

/// Judges one fact end to end. The orchestrator's only dependency on the
/// model side.
#[async_trait]
pub trait FactJudge: Send + Sync {
    async fn judge(&self, fact: &Fact) -> Result<Judgment, JudgeError>;
}

/// Context resolution followed by a structured judgment call.
pub struct GroundedJudge {
    client: JudgmentClient,
    resolver: ContextResolver,
}

impl GroundedJudge {
    pub fn new(client: JudgmentClient, resolver: ContextResolver) -> Self {
        Self { client, resolver }
    }
}

#[async_trait]
impl FactJudge for GroundedJudge {
    async fn judge(&self, fact: &Fact) -> Result<Judgment, JudgeError> {
        let context = self.resolver.resolve(fact).await;
        self.client.judge(&fact.text, context.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, ArticleMetadata};
    use crate::providers::encoder::hashing::HashingEncoder;
    use crate::retrieval::{Pooling, RetrieverConfig, Splitter};

    fn article(id: &str, full: &str, abs: &str) -> Article {
        Article {
            id: id.to_string(),
            full_text: full.to_string(),
            abstract_text: abs.to_string(),
            metadata: ArticleMetadata::default(),
        }
    }

    fn corpus() -> Arc<Corpus> {
        Arc::new(Corpus::new([
            article(
                "paris",
                "Paris is the capital of France.\n\nThe Seine flows through Paris.",
                "Paris, capital of France.",
            ),
            article("banana", "Bananas are yellow fruit.", "A fruit."),
        ]))
    }

    fn fact() -> Fact {
        let mut f = Fact::new("f1", "Paris is the capital of France.");
        f.linked_article_ids = vec!["paris".to_string(), "ghost".to_string()];
        f.relevant_article_ids = vec!["banana".to_string()];
        f
    }

    #[tokio::test]
    async fn fact_mode_has_no_context() {
        let r = ContextResolver::new(corpus(), JudgeMode::Fact, ContextSource::Full);
        assert_eq!(r.resolve(&fact()).await, None);
    }

    #[tokio::test]
    async fn linked_mode_skips_missing_articles() {
        let r = ContextResolver::new(corpus(), JudgeMode::Linked, ContextSource::Abstract);
        assert_eq!(
            r.resolve(&fact()).await,
            Some(vec!["Paris, capital of France.".to_string()])
        );
    }

    #[tokio::test]
    async fn relevant_mode_uses_relevant_ids() {
        let r = ContextResolver::new(corpus(), JudgeMode::Relevant, ContextSource::Full);
        assert_eq!(
            r.resolve(&fact()).await,
            Some(vec!["Bananas are yellow fruit.".to_string()])
        );
    }

    #[tokio::test]
    async fn retrieval_narrows_context() {
        let retriever = Arc::new(FragmentRetriever::new(
            Arc::new(HashingEncoder::default()),
            RetrieverConfig {
                splitter: Splitter::Paragraph,
                pooling: Pooling::Mean,
                batch_size: 8,
            },
        ));
        let r = ContextResolver::new(corpus(), JudgeMode::Linked, ContextSource::Full)
            .with_retriever(retriever, 1);
        assert_eq!(
            r.resolve(&fact()).await,
            Some(vec!["Paris is the capital of France.".to_string()])
        );
    }
}
