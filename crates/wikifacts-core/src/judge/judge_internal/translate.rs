use crate::errors::TransportError;
use crate::model::{ChatMessage, DecodingParams};
use crate::providers::llm::ChatModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Literals that must reach the model byte-for-byte after localization:
/// the JSON contract keys, the canonical answer values and template slots.
const PROTECTED: &[&str] = &[
    "\"answer\"",
    "\"reasoning\"",
    "\"yes\"",
    "\"no\"",
    "\"idk\"",
    "{fact}",
    "{context}",
];

/// Text localization collaborator.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TransportError>;
}

/// Translates through a chat model.
pub struct ChatTranslator {
    model: Arc<dyn ChatModel>,
}

impl ChatTranslator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TransportError> {
        let messages = [
            ChatMessage::system(format!(
                "Translate the user's text into the language with code '{target_lang}'. \
                 Keep every marker of the form \u{27E6}n\u{27E7} exactly as it is. \
                 Reply with the translation only."
            )),
            ChatMessage::user(text),
        ];
        let resp = self
            .model
            .chat(&messages, &DecodingParams::default())
            .await?;
        Ok(resp.content)
    }
}

/// Memo table from exact source string to its localized form.
///
/// Lives as long as one judgment client. Entries are never evicted; two
/// workers racing on the same key write equal values.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: RwLock<HashMap<String, String>>,
}

impl TranslationCache {
    pub fn get(&self, source: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(source)
            .cloned()
    }

    pub fn insert(&self, source: &str, translated: String) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source.to_string(), translated);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Localize `text`, consulting and filling `cache`.
///
/// Protected literals are swapped for numbered markers before translation
/// and restored afterwards. If the translation loses a marker, or the
/// translator fails, the source text is used unchanged and cached as the
/// localized form, so the translator is asked once per source string.
pub(crate) async fn localize(
    translator: &dyn Translator,
    cache: &TranslationCache,
    text: &str,
    target_lang: &str,
) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    if let Some(hit) = cache.get(text) {
        return hit;
    }

    let (masked, slots) = mask(text);
    let localized = match translator.translate(&masked, target_lang).await {
        Ok(translated) => unmask(&translated, &slots).unwrap_or_else(|| {
            tracing::warn!(lang = target_lang, "translation dropped a protected literal, keeping source text");
            text.to_string()
        }),
        Err(e) => {
            tracing::warn!(error = %e, lang = target_lang, "translation failed, keeping source text");
            text.to_string()
        }
    };
    cache.insert(text, localized.clone());
    localized
}

fn marker(i: usize) -> String {
    format!("\u{27E6}{i}\u{27E7}")
}

/// Replace each protected literal occurrence with a unique marker.
pub(crate) fn mask(text: &str) -> (String, Vec<(String, &'static str)>) {
    let mut slots = Vec::new();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let next = PROTECTED
            .iter()
            .filter_map(|lit| rest.find(lit).map(|pos| (pos, *lit)))
            .min_by_key(|(pos, lit)| (*pos, std::cmp::Reverse(lit.len())));
        let Some((pos, lit)) = next else {
            out.push_str(rest);
            break;
        };
        let m = marker(slots.len());
        out.push_str(&rest[..pos]);
        out.push_str(&m);
        slots.push((m, lit));
        rest = &rest[pos + lit.len()..];
    }
    (out, slots)
}

/// Restore markers; `None` if any marker is missing from `translated`.
pub(crate) fn unmask(translated: &str, slots: &[(String, &'static str)]) -> Option<String> {
    let mut out = translated.trim().to_string();
    for (m, lit) in slots {
        if !out.contains(m.as_str()) {
            return None;
        }
        out = out.replacen(m.as_str(), lit, 1);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_round_trips_protected_literals() {
        let text = "Reply with {\"answer\": \"yes\" | \"no\", \"reasoning\": ...} for {fact}.";
        let (masked, slots) = mask(text);
        assert!(!masked.contains("answer"));
        assert!(!masked.contains("{fact}"));
        assert_eq!(slots.len(), 5);
        assert_eq!(unmask(&masked, &slots).as_deref(), Some(text));
    }

    #[test]
    fn unmask_rejects_lost_marker() {
        let (masked, slots) = mask("Use \"answer\" here");
        let damaged = masked.replace(&marker(0), "respuesta");
        assert_eq!(unmask(&damaged, &slots), None);
    }

    #[test]
    fn cache_recovers_from_poison() {
        let cache = Arc::new(TranslationCache::default());
        let c = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = c.entries.write().unwrap();
            panic!("poison");
        })
        .join();
        cache.insert("a", "b".to_string());
        assert_eq!(cache.get("a").as_deref(), Some("b"));
    }
}
