use crate::engine::checkpoint::Checkpoint;
use crate::engine::context::FactJudge;
use crate::engine::logs::{FailureLogEntry, JsonlLog, OutputLogEntry};
use crate::errors::JudgeError;
use crate::judge::Judgment;
use crate::model::Fact;
use crate::report::progress::{ProgressEvent, ProgressSink};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub checkpoint_path: PathBuf,
    pub output_log: PathBuf,
    pub failure_log: PathBuf,
    /// Upper bound on concurrent judgments.
    pub threads: usize,
    /// Completions between checkpoint writes. 1 writes after every fact;
    /// larger values bound the loss on a crash to that many facts.
    pub flush_every: usize,
}

/// Counts for one orchestrator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Facts in the work list.
    pub total: usize,
    /// Already present in the checkpoint at start.
    pub skipped: usize,
    /// Newly written to the checkpoint, sentinels included.
    pub judged: usize,
    pub sentinels: usize,
    /// Exhausted retries; left unresolved for a later run.
    pub failed: usize,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Drives the work list through a [`FactJudge`] with bounded concurrency.
///
/// The checkpoint is owned here: workers hand results back through the
/// join set and only this loop mutates and persists it.
pub struct Orchestrator {
    judge: Arc<dyn FactJudge>,
    config: OrchestratorConfig,
    progress: Option<ProgressSink>,
}

impl Orchestrator {
    pub fn new(judge: Arc<dyn FactJudge>, config: OrchestratorConfig) -> Self {
        Self {
            judge,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: Option<ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Facts not yet present in the checkpoint, in work-list order, each id
    /// at most once.
    pub fn remaining<'a>(facts: &'a [Fact], checkpoint: &Checkpoint) -> Vec<&'a Fact> {
        let mut seen = HashSet::new();
        facts
            .iter()
            .filter(|f| !checkpoint.contains(&f.id) && seen.insert(f.id.as_str()))
            .collect()
    }

    pub async fn run(&self, facts: &[Fact]) -> anyhow::Result<RunReport> {
        let cfg = &self.config;
        let mut checkpoint = Checkpoint::load(&cfg.checkpoint_path)
            .await
            .context("loading checkpoint")?;

        let remaining: Vec<Fact> = Self::remaining(facts, &checkpoint)
            .into_iter()
            .cloned()
            .collect();
        let mut report = RunReport {
            total: facts.len(),
            skipped: facts.len() - remaining.len(),
            ..RunReport::default()
        };
        if remaining.is_empty() {
            tracing::info!(total = report.total, "all facts already resolved");
            return Ok(report);
        }

        let pool = cfg.threads.max(1).min(remaining.len());
        tracing::info!(
            total = report.total,
            skipped = report.skipped,
            remaining = remaining.len(),
            pool,
            "starting judgment run"
        );

        let output_log = JsonlLog::new(&cfg.output_log);
        let failure_log = JsonlLog::new(&cfg.failure_log);
        let sem = Arc::new(Semaphore::new(pool));
        let mut join_set = JoinSet::new();

        // Permits are taken inside the task so completions are collected
        // (and checkpointed) while later facts still wait for a slot.
        for fact in remaining {
            let judge = self.judge.clone();
            let sem = sem.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let result = judge.judge(&fact).await;
                (fact, result)
            });
        }

        let todo = join_set.len();
        let flush_every = cfg.flush_every.max(1);
        let mut done = 0usize;
        let mut unflushed = 0usize;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((fact, Ok(judgment))) => {
                    record_judgment(&mut checkpoint, &mut report, &output_log, &fact, judgment)
                        .await;
                    unflushed += 1;
                }
                Ok((fact, Err(err))) => {
                    record_failure(&failure_log, &fact, &err).await;
                    report.failed += 1;
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "judgment task aborted");
                    report.failed += 1;
                }
            }

            if unflushed >= flush_every {
                checkpoint
                    .save(&cfg.checkpoint_path)
                    .await
                    .context("writing checkpoint")?;
                unflushed = 0;
            }

            done += 1;
            if let Some(sink) = &self.progress {
                sink(ProgressEvent { done, total: todo });
            }
        }

        if unflushed > 0 {
            checkpoint
                .save(&cfg.checkpoint_path)
                .await
                .context("writing checkpoint")?;
        }

        tracing::info!(
            judged = report.judged,
            sentinels = report.sentinels,
            failed = report.failed,
            "judgment run finished"
        );
        Ok(report)
    }
}

/// The checkpoint entry is made first; audit-log write failures are logged
/// and never abort the batch.
async fn record_judgment(
    checkpoint: &mut Checkpoint,
    report: &mut RunReport,
    output_log: &JsonlLog,
    fact: &Fact,
    judgment: Judgment,
) {
    report.judged += 1;
    checkpoint.insert(fact.id.clone(), judgment.record.clone());
    let Some(record) = judgment.record else {
        report.sentinels += 1;
        return;
    };
    tracing::debug!(fact_id = %fact.id, answer = %record.answer, attempts = judgment.attempts, "fact judged");
    let entry = OutputLogEntry {
        prompt: judgment.prompt,
        prediction: record.answer.to_string(),
        reasoning: record.reasoning,
        output: judgment.raw_output,
    };
    if let Err(e) = output_log.append(&entry).await {
        tracing::warn!(
            fact_id = %fact.id,
            path = %output_log.path().display(),
            error = %e,
            "output log append failed"
        );
    }
}

async fn record_failure(log: &JsonlLog, fact: &Fact, err: &JudgeError) {
    tracing::error!(fact_id = %fact.id, error = %err, "fact left unresolved");
    let entry = FailureLogEntry {
        fact: fact.text.clone(),
        error: err.failure_message(),
    };
    if let Err(e) = log.append(&entry).await {
        tracing::warn!(
            fact_id = %fact.id,
            path = %log.path().display(),
            error = %e,
            "failure log append failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, JudgmentRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingJudge {
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl FactJudge for CountingJudge {
        async fn judge(&self, fact: &Fact) -> Result<Judgment, JudgeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.calls.lock().unwrap().push(fact.id.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if fact.text.contains("garbled") {
                return Err(JudgeError::ExhaustedRetries {
                    attempts: 3,
                    last_error: Box::new(crate::errors::MalformedOutput::NoJson.into()),
                });
            }
            let record = (!fact.text.contains("odd")).then(|| JudgmentRecord {
                answer: Answer::Yes,
                reasoning: format!("checked {}", fact.id),
            });
            Ok(Judgment {
                prompt: format!("prompt for {}", fact.text),
                raw_output: "{}".to_string(),
                record,
                attempts: 1,
            })
        }
    }

    fn config(dir: &std::path::Path, threads: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            checkpoint_path: dir.join("checkpoint.json"),
            output_log: dir.join("output.jsonl"),
            failure_log: dir.join("failures.jsonl"),
            threads,
            flush_every: 1,
        }
    }

    fn facts(texts: &[&str]) -> Vec<Fact> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Fact::new(format!("f{i}"), *t))
            .collect()
    }

    #[tokio::test]
    async fn writes_checkpoint_logs_and_report() {
        let dir = tempdir().unwrap();
        let judge = Arc::new(CountingJudge::default());
        let orch = Orchestrator::new(judge.clone(), config(dir.path(), 2));
        let work = facts(&["fine", "odd one", "garbled"]);

        let report = orch.run(&work).await.unwrap();

        assert_eq!(
            report,
            RunReport {
                total: 3,
                skipped: 0,
                judged: 2,
                sentinels: 1,
                failed: 1
            }
        );
        assert!(!report.is_complete());

        let cp = Checkpoint::load(&dir.path().join("checkpoint.json"))
            .await
            .unwrap();
        assert_eq!(cp.get("f0").unwrap().unwrap().answer, Answer::Yes);
        assert_eq!(cp.get("f1"), Some(None));
        assert!(!cp.contains("f2"));

        let output = std::fs::read_to_string(dir.path().join("output.jsonl")).unwrap();
        let lines: Vec<OutputLogEntry> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].prediction, "yes");
        assert_eq!(lines[0].prompt, "prompt for fine");

        let failures = std::fs::read_to_string(dir.path().join("failures.jsonl")).unwrap();
        let failure: FailureLogEntry = serde_json::from_str(failures.trim()).unwrap();
        assert_eq!(failure.fact, "garbled");
        assert_eq!(failure.error, "Unable to parse JSON");
    }

    #[tokio::test]
    async fn pool_is_bounded_by_threads() {
        let dir = tempdir().unwrap();
        let judge = Arc::new(CountingJudge::default());
        let orch = Orchestrator::new(judge.clone(), config(dir.path(), 2));
        let work = facts(&["a", "b", "c", "d", "e", "f"]);

        orch.run(&work).await.unwrap();

        assert!(judge.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(judge.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn duplicate_ids_are_judged_once() {
        let dir = tempdir().unwrap();
        let judge = Arc::new(CountingJudge::default());
        let orch = Orchestrator::new(judge.clone(), config(dir.path(), 4));
        let mut work = facts(&["a", "b"]);
        work.push(Fact::new("f0", "a again"));

        let report = orch.run(&work).await.unwrap();

        assert_eq!(judge.calls.lock().unwrap().len(), 2);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn progress_reports_every_completion() {
        let dir = tempdir().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: ProgressSink = Arc::new(move |ev: ProgressEvent| sink_events.lock().unwrap().push(ev));
        let orch = Orchestrator::new(Arc::new(CountingJudge::default()), config(dir.path(), 3))
            .with_progress(Some(sink));

        orch.run(&facts(&["a", "b", "c"])).await.unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last(), Some(&ProgressEvent { done: 3, total: 3 }));
    }

    #[tokio::test]
    async fn unwritable_audit_logs_do_not_lose_judgments() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), 2);
        // Directories cannot be opened for appending.
        cfg.output_log = dir.path().to_path_buf();
        cfg.failure_log = dir.path().to_path_buf();
        cfg.flush_every = 10;
        let orch = Orchestrator::new(Arc::new(CountingJudge::default()), cfg);

        let report = orch.run(&facts(&["a", "b", "garbled"])).await.unwrap();

        assert_eq!(report.judged, 2);
        assert_eq!(report.failed, 1);
        let cp = Checkpoint::load(&dir.path().join("checkpoint.json"))
            .await
            .unwrap();
        assert_eq!(cp.len(), 2);
        assert!(cp.contains("f0") && cp.contains("f1"));
    }

    #[tokio::test]
    async fn batched_flush_still_persists_everything() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), 2);
        cfg.flush_every = 4;
        let orch = Orchestrator::new(Arc::new(CountingJudge::default()), cfg);

        orch.run(&facts(&["a", "b", "c", "d", "e"])).await.unwrap();

        let cp = Checkpoint::load(&dir.path().join("checkpoint.json"))
            .await
            .unwrap();
        assert_eq!(cp.len(), 5);
    }
}
