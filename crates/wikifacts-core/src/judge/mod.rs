//! Structured judgment client.
//!
//! One parameterized client serves all three judgment modes: the mode only
//! selects template text, while the retry/repair protocol is shared.

mod judge_internal;

pub use judge_internal::translate::{ChatTranslator, TranslationCache, Translator};

use crate::errors::JudgeError;
use crate::model::{DecodingParams, JudgmentRecord};
use crate::prompt::{FewShot, PromptPolicy, TemplateSet};
use crate::providers::llm::ChatModel;
use judge_internal::protocol::{self, ProtocolLimits};
use judge_internal::translate::localize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct JudgeConfig {
    pub policy: PromptPolicy,
    pub max_attempts: u32,
    /// Fixed wait after a transport failure.
    pub retry_backoff: Duration,
    pub call_timeout: Duration,
    pub decoding: DecodingParams,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            policy: PromptPolicy::default(),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(1),
            call_timeout: Duration::from_secs(360),
            decoding: DecodingParams::default(),
        }
    }
}

/// Result of one accepted judgment call.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    /// Flat prompt text as sent (system, then user).
    pub prompt: String,
    /// Raw completion that passed the output contract.
    pub raw_output: String,
    /// `None` when the accepted object carried a non-canonical answer or a
    /// non-string reasoning; stored as the explicit failure sentinel.
    pub record: Option<JudgmentRecord>,
    pub attempts: u32,
}

pub struct JudgmentClient {
    model: Arc<dyn ChatModel>,
    translator: Option<Arc<dyn Translator>>,
    cache: TranslationCache,
    templates: TemplateSet,
    config: JudgeConfig,
}

impl JudgmentClient {
    /// Localization, when requested, goes through `model` itself.
    pub fn new(model: Arc<dyn ChatModel>, config: JudgeConfig) -> Self {
        let translator = config
            .policy
            .translate_to
            .as_ref()
            .map(|_| Arc::new(ChatTranslator::new(model.clone())) as Arc<dyn Translator>);
        tracing::debug!(
            provider = model.provider_name(),
            model = model.model_name(),
            mode = %config.policy.mode,
            max_attempts = config.max_attempts,
            "judgment client ready"
        );
        Self {
            templates: TemplateSet::for_mode(config.policy.mode, config.policy.allow_idk),
            model,
            translator,
            cache: TranslationCache::default(),
            config,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn translation_cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Judge one statement, optionally grounded in context fragments.
    ///
    /// `Err` is always [`JudgeError::ExhaustedRetries`]: the caller logs it
    /// and leaves the fact unresolved.
    pub async fn judge(
        &self,
        fact: &str,
        context: Option<&[String]>,
    ) -> Result<Judgment, JudgeError> {
        let templates = self.localized_templates().await;
        let built = templates.render(fact, context, self.config.policy.use_few_shots);
        let prompt = built.prompt_text();

        let limits = ProtocolLimits {
            max_attempts: self.config.max_attempts,
            retry_backoff: self.config.retry_backoff,
            call_timeout: self.config.call_timeout,
        };
        let accepted = protocol::run(
            self.model.as_ref(),
            built.messages(),
            &self.config.decoding,
            &limits,
        )
        .await?;

        let record = JudgmentRecord::from_object(&accepted.object);
        if record.is_none() {
            tracing::warn!(
                answer = ?accepted.object.get("answer"),
                "accepted output has no canonical answer, storing failure sentinel"
            );
        }
        Ok(Judgment {
            prompt,
            raw_output: accepted.raw,
            record,
            attempts: accepted.attempts,
        })
    }

    async fn localized_templates(&self) -> TemplateSet {
        let (Some(lang), Some(translator)) =
            (self.config.policy.translate_to.as_deref(), &self.translator)
        else {
            return self.templates.clone();
        };
        if lang.eq_ignore_ascii_case("en") {
            return self.templates.clone();
        }

        let tr = |text: String| {
            let translator = translator.clone();
            async move { localize(translator.as_ref(), &self.cache, &text, lang).await }
        };
        let mut few_shots = Vec::with_capacity(self.templates.few_shots.len());
        let shots = if self.config.policy.use_few_shots {
            self.templates.few_shots.as_slice()
        } else {
            &[]
        };
        for ex in shots {
            few_shots.push(FewShot {
                fact: tr(ex.fact.clone()).await,
                context: tr(ex.context.clone()).await,
                answer: ex.answer,
                reasoning: tr(ex.reasoning.clone()).await,
            });
        }
        TemplateSet {
            mode: self.templates.mode,
            system: tr(self.templates.system.clone()).await,
            user: tr(self.templates.user.clone()).await,
            few_shots,
        }
    }
}
