//! Prompt construction for the three judgment modes.
//!
//! Modes differ only in the instruction sentence and in whether a context
//! block is embedded; the call protocol downstream is identical.

mod templates;

use crate::model::{Answer, ChatMessage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which grounding context accompanies the statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeMode {
    /// Statement only; the model relies on its own knowledge.
    #[default]
    Fact,
    /// Statement plus the articles it links to.
    Linked,
    /// Statement plus articles (or retrieved fragments) judged relevant to it.
    Relevant,
}

impl JudgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Linked => "linked",
            Self::Relevant => "relevant",
        }
    }

    pub fn uses_context(&self) -> bool {
        !matches!(self, Self::Fact)
    }
}

impl fmt::Display for JudgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JudgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fact" | "facts" => Ok(Self::Fact),
            "linked" => Ok(Self::Linked),
            "relevant" => Ok(Self::Relevant),
            other => Err(format!(
                "unknown mode '{other}' (expected fact|linked|relevant)"
            )),
        }
    }
}

/// Prompt toggles applied on top of the mode template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPolicy {
    pub mode: JudgeMode,
    pub allow_idk: bool,
    pub use_few_shots: bool,
    /// Target language for template localization; `None` keeps English.
    pub translate_to: Option<String>,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self {
            mode: JudgeMode::Fact,
            allow_idk: true,
            use_few_shots: false,
            translate_to: None,
        }
    }
}

/// One illustrative exchange, already stripped/localized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FewShot {
    pub fact: String,
    pub context: String,
    pub answer: Answer,
    pub reasoning: String,
}

/// Mode-specific template strings with `{fact}` / `{context}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    pub mode: JudgeMode,
    pub system: String,
    pub user: String,
    pub few_shots: Vec<FewShot>,
}

impl TemplateSet {
    /// English templates for `mode`, with the idk option removed when
    /// `allow_idk` is false.
    pub fn for_mode(mode: JudgeMode, allow_idk: bool) -> Self {
        let (clause, instruction, user) = match mode {
            JudgeMode::Fact => ("", templates::INSTRUCTION_FACT, templates::USER_FACT),
            JudgeMode::Linked => (
                templates::CONTEXT_CLAUSE_LINKED,
                templates::INSTRUCTION_LINKED,
                templates::USER_CONTEXT,
            ),
            JudgeMode::Relevant => (
                templates::CONTEXT_CLAUSE_RELEVANT,
                templates::INSTRUCTION_RELEVANT,
                templates::USER_CONTEXT,
            ),
        };
        let system = fill(
            templates::SYSTEM_BASE,
            &[("context_clause", clause), ("instruction", instruction)],
        );

        let mut set = Self {
            mode,
            system,
            user: user.to_string(),
            few_shots: templates::FEW_SHOTS
                .iter()
                .map(|ex| FewShot {
                    fact: ex.fact.to_string(),
                    context: ex.context.to_string(),
                    answer: ex.answer,
                    reasoning: ex.reasoning.to_string(),
                })
                .collect(),
        };
        if !allow_idk {
            set.system = strip_idk(&set.system);
            set.user = strip_idk(&set.user);
        }
        set
    }

    /// Render the prompt for one statement.
    pub fn render(
        &self,
        fact: &str,
        context: Option<&[String]>,
        use_few_shots: bool,
    ) -> BuiltPrompt {
        let context_block = context.map(format_context).unwrap_or_default();
        let user = self.fill_user(fact, &context_block);

        let few_shots = if use_few_shots {
            self.few_shots
                .iter()
                .flat_map(|ex| {
                    let answer = serde_json::json!({
                        "answer": ex.answer.as_str(),
                        "reasoning": ex.reasoning,
                    });
                    [
                        ChatMessage::user(self.fill_user(&ex.fact, &ex.context)),
                        ChatMessage::assistant(answer.to_string()),
                    ]
                })
                .collect()
        } else {
            Vec::new()
        };

        BuiltPrompt {
            system: self.system.clone(),
            user,
            few_shots,
        }
    }

    fn fill_user(&self, fact: &str, context: &str) -> String {
        fill(&self.user, &[("fact", fact), ("context", context)])
    }
}

/// The message sequence for one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
    pub few_shots: Vec<ChatMessage>,
}

impl BuiltPrompt {
    /// System instruction, few-shot exchanges, then the user turn.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.few_shots.len() + 2);
        out.push(ChatMessage::system(self.system.clone()));
        out.extend(self.few_shots.iter().cloned());
        out.push(ChatMessage::user(self.user.clone()));
        out
    }

    /// Flat text recorded in the output log.
    pub fn prompt_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Numbered context block, one fragment per entry.
pub fn format_context(fragments: &[String]) -> String {
    fragments
        .iter()
        .enumerate()
        .map(|(i, f)| format!("[{}] {}", i + 1, f.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Remove every offer of the "don't know" outcome from `text`.
pub fn strip_idk(text: &str) -> String {
    templates::IDK_FRAGMENTS
        .iter()
        .fold(text.to_string(), |acc, frag| acc.replace(frag, ""))
}

/// Single-pass `{name}` substitution; values are never re-scanned.
pub(crate) fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = vars.iter().find_map(|(name, value)| {
            let slot_len = name.len() + 2;
            (tail.as_bytes().get(slot_len - 1) == Some(&b'}')
                && tail.get(1..slot_len - 1) == Some(*name))
            .then_some((slot_len, *value))
        });
        match hit {
            Some((len, value)) => {
                out.push_str(value);
                rest = &tail[len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [JudgeMode; 3] = [JudgeMode::Fact, JudgeMode::Linked, JudgeMode::Relevant];

    fn mentions_idk(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("idk")
            || lower.contains("don't know")
            || lower.contains("not enough information")
    }

    #[test]
    fn idk_is_stripped_in_every_mode() {
        let ctx = vec!["Paris is the capital of France.".to_string()];
        for mode in MODES {
            let set = TemplateSet::for_mode(mode, false);
            let prompt = set.render("Paris is in France.", Some(ctx.as_slice()), true);
            for msg in prompt.messages() {
                assert!(
                    !mentions_idk(&msg.content),
                    "mode {mode}: idk leaked into {:?}",
                    msg.content
                );
            }
            assert!(prompt.system.contains("\"yes\" | \"no\""));
            assert!(prompt.user.contains("Answer \"yes\" or \"no\"."));
        }
    }

    #[test]
    fn idk_is_offered_when_allowed() {
        for mode in MODES {
            let prompt = TemplateSet::for_mode(mode, true).render("x", None, false);
            assert!(mentions_idk(&prompt.system));
            assert!(mentions_idk(&prompt.user));
        }
    }

    #[test]
    fn context_only_embedded_in_context_modes() {
        let ctx = vec!["First passage.".to_string(), "Second passage.".to_string()];
        let fact_prompt = TemplateSet::for_mode(JudgeMode::Fact, true).render("S", Some(ctx.as_slice()), false);
        assert!(!fact_prompt.user.contains("First passage."));

        let linked = TemplateSet::for_mode(JudgeMode::Linked, true).render("S", Some(ctx.as_slice()), false);
        assert!(linked.user.contains("[1] First passage.\n\n[2] Second passage."));
        assert!(linked.system.contains("linked articles"));

        let relevant = TemplateSet::for_mode(JudgeMode::Relevant, true).render("S", Some(ctx.as_slice()), false);
        assert!(relevant.system.contains("relevant passages"));
    }

    #[test]
    fn few_shots_precede_user_turn() {
        let prompt = TemplateSet::for_mode(JudgeMode::Linked, true).render("S", None, true);
        let messages = prompt.messages();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].role, crate::model::Role::System);
        assert_eq!(messages[2].role, crate::model::Role::Assistant);
        let shot: serde_json::Value = serde_json::from_str(&messages[2].content).unwrap();
        assert_eq!(shot["answer"], "yes");
        assert!(messages[1].content.contains("Eiffel Tower"));
        assert_eq!(messages[5].content, prompt.user);
    }

    #[test]
    fn fill_does_not_rescan_values() {
        let out = fill("{context} / {fact}", &[("fact", "{context}"), ("context", "C")]);
        assert_eq!(out, "C / {context}");
        assert_eq!(fill("{\"a\": 1} {fact}", &[("fact", "F")]), "{\"a\": 1} F");
    }

    #[test]
    fn mode_parses_from_str() {
        assert_eq!("Linked".parse::<JudgeMode>().unwrap(), JudgeMode::Linked);
        assert!("wiki".parse::<JudgeMode>().is_err());
    }
}
