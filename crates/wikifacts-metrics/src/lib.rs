//! Aggregate metrics over a judgment checkpoint.
//!
//! Everything here is derived: the checkpoint and the fact list are the
//! inputs, the results file is the only output.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wikifacts_core::model::{Answer, Fact, JudgmentRecord};
use wikifacts_core::Checkpoint;

/// Current schema version for the results file.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDistribution {
    pub yes: usize,
    pub no: usize,
    pub idk: usize,
    /// Checkpoint entries holding the failure sentinel.
    pub sentinel: usize,
    /// Facts with no checkpoint entry.
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub schema_version: u32,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub total_facts: usize,
    /// Facts with a checkpoint entry; the denominator of the ratios below.
    pub considered: usize,
    pub accuracy: f64,
    pub recall: f64,
    pub idk_ratio: f64,
    pub coverage: f64,
    pub mean_keyword_coverage: f64,
    pub answer_distribution: AnswerDistribution,
}

impl ResultsSummary {
    pub fn with_run_info(mut self, model: impl Into<String>, mode: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self.mode = Some(mode.into());
        self
    }
}

/// Compute metrics for `facts` from `checkpoint`.
///
/// Idk answers and sentinels count as incorrect for accuracy and are left
/// out of recall's tp/fn accounting. The positive class is a true statement.
pub fn summarize(facts: &[Fact], checkpoint: &Checkpoint) -> ResultsSummary {
    let mut dist = AnswerDistribution::default();
    let mut correct = 0usize;
    let (mut tp, mut fn_) = (0usize, 0usize);
    let mut keyword_scores = Vec::new();

    for fact in facts {
        let Some(entry) = checkpoint.get(&fact.id) else {
            dist.missing += 1;
            continue;
        };
        let Some(record) = entry else {
            dist.sentinel += 1;
            continue;
        };
        match record.answer {
            Answer::Yes => dist.yes += 1,
            Answer::No => dist.no += 1,
            Answer::Idk => dist.idk += 1,
        }

        let expected = if fact.is_true() { Answer::Yes } else { Answer::No };
        if record.answer == expected {
            correct += 1;
        }
        if fact.is_true() {
            match record.answer {
                Answer::Yes => tp += 1,
                Answer::No => fn_ += 1,
                Answer::Idk => {}
            }
        }
        if let Some(score) = keyword_coverage(&fact.keywords, record) {
            keyword_scores.push(score);
        }
    }

    let considered = facts.len() - dist.missing;
    ResultsSummary {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        model: None,
        mode: None,
        total_facts: facts.len(),
        considered,
        accuracy: ratio(correct, considered),
        recall: ratio(tp, tp + fn_),
        idk_ratio: ratio(dist.idk, considered),
        coverage: ratio(dist.yes + dist.no, considered),
        mean_keyword_coverage: if keyword_scores.is_empty() {
            0.0
        } else {
            keyword_scores.iter().sum::<f64>() / keyword_scores.len() as f64
        },
        answer_distribution: dist,
    }
}

/// Fraction of `keywords` found in the reasoning, `None` without keywords.
///
/// Matching is a case-insensitive substring test after collapsing runs of
/// whitespace.
pub fn keyword_coverage(keywords: &[String], record: &JudgmentRecord) -> Option<f64> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| normalize(k))
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return None;
    }
    let reasoning = normalize(&record.reasoning);
    let hits = keywords.iter().filter(|k| reasoning.contains(k.as_str())).count();
    Some(hits as f64 / keywords.len() as f64)
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn write_results(summary: &ResultsSummary, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(out, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(id: &str, label: bool, keywords: &[&str]) -> Fact {
        let mut f = Fact::new(id, format!("statement {id}"));
        f.label = Some(label);
        f.keywords = keywords.iter().map(|k| k.to_string()).collect();
        f
    }

    fn rec(answer: Answer, reasoning: &str) -> Option<JudgmentRecord> {
        Some(JudgmentRecord {
            answer,
            reasoning: reasoning.to_string(),
        })
    }

    #[test]
    fn metrics_follow_definitions() {
        let facts = vec![
            fact("t1", true, &["Paris", "capital"]),
            fact("t2", true, &[]),
            fact("t3", true, &["Seine"]),
            fact("t4", true, &[]),
            fact("f1", false, &[]),
            fact("f2", false, &[]),
            fact("m1", true, &[]),
        ];
        let mut cp = Checkpoint::default();
        cp.insert("t1", rec(Answer::Yes, "PARIS is the   capital."));
        cp.insert("t2", rec(Answer::No, "wrong"));
        cp.insert("t3", rec(Answer::Idk, "no idea"));
        cp.insert("t4", None);
        cp.insert("f1", rec(Answer::No, "false"));
        cp.insert("f2", rec(Answer::Yes, "true"));
        cp.insert("unrelated", rec(Answer::Yes, "ignored"));

        let s = summarize(&facts, &cp);

        assert_eq!(s.schema_version, SCHEMA_VERSION);
        assert_eq!(s.total_facts, 7);
        assert_eq!(s.considered, 6);
        assert_eq!(
            s.answer_distribution,
            AnswerDistribution {
                yes: 2,
                no: 2,
                idk: 1,
                sentinel: 1,
                missing: 1
            }
        );
        // t1 and f1 are correct.
        assert!((s.accuracy - 2.0 / 6.0).abs() < 1e-9);
        // tp = t1, fn = t2; idk and sentinel excluded.
        assert!((s.recall - 0.5).abs() < 1e-9);
        assert!((s.idk_ratio - 1.0 / 6.0).abs() < 1e-9);
        assert!((s.coverage - 4.0 / 6.0).abs() < 1e-9);
        // t1 covers 2/2, t3 covers 0/1.
        assert!((s.mean_keyword_coverage - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_inputs_yield_zeroes() {
        let s = summarize(&[], &Checkpoint::default());
        assert_eq!(s.considered, 0);
        assert_eq!(s.accuracy, 0.0);
        assert_eq!(s.recall, 0.0);
        assert_eq!(s.mean_keyword_coverage, 0.0);
    }

    #[test]
    fn recall_is_zero_without_decided_true_facts() {
        let facts = vec![fact("t", true, &[]), fact("f", false, &[])];
        let mut cp = Checkpoint::default();
        cp.insert("t", rec(Answer::Idk, ""));
        cp.insert("f", rec(Answer::No, ""));
        let s = summarize(&facts, &cp);
        assert_eq!(s.recall, 0.0);
        assert!((s.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn keyword_matching_normalizes_whitespace_and_case() {
        let r = JudgmentRecord {
            answer: Answer::Yes,
            reasoning: "The  Eiffel\nTower stands in Paris.".to_string(),
        };
        let kws = vec!["eiffel tower".to_string(), "London".to_string()];
        assert_eq!(keyword_coverage(&kws, &r), Some(0.5));
        assert_eq!(keyword_coverage(&[" ".to_string()], &r), None);
    }

    #[test]
    fn results_file_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("results.json");
        let s = summarize(&[], &Checkpoint::default()).with_run_info("gpt-4o-mini", "fact");
        write_results(&s, &out).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("\n  \"schema_version\": 1"));
        let back: ResultsSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
    }
}
