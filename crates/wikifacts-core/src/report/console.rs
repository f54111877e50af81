use crate::engine::RunReport;
use crate::report::progress::{ProgressEvent, ProgressSink};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[must_use]
pub fn format_progress_line(done: usize, total: usize) -> String {
    format!("Judged {done}/{total} facts")
}

const PROGRESS_MIN_INTERVAL_MS: u64 = 200;

/// Emit roughly every 10% of large work sets.
pub(crate) fn progress_step(total: usize) -> usize {
    if total <= 10 {
        1
    } else {
        std::cmp::max(1, total / 10)
    }
}

/// Throttled stderr progress. `None` for work sets of at most one fact.
/// The final `total/total` line is always printed.
pub fn default_progress_sink(total: usize) -> Option<ProgressSink> {
    if total <= 1 {
        return None;
    }
    let step = progress_step(total);
    let last_emit: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    Some(Arc::new(move |ev: ProgressEvent| {
        if ev.total == 0 {
            return;
        }
        let now = Instant::now();
        let should_emit = {
            let mut last = last_emit.lock().unwrap_or_else(|e| e.into_inner());
            let interval_ok = last.map_or(true, |t| {
                now.saturating_duration_since(t) >= Duration::from_millis(PROGRESS_MIN_INTERVAL_MS)
            });
            let ok = ev.done == ev.total || ((ev.done % step == 0 || ev.done == 1) && interval_ok);
            if ok {
                *last = Some(now);
            }
            ok
        };
        if should_emit {
            eprintln!("{}", format_progress_line(ev.done, ev.total));
        }
    }))
}

#[must_use]
pub fn format_run_summary(report: &RunReport) -> String {
    format!(
        "Run finished: {} facts, {} already resolved, {} judged ({} sentinel), {} failed after retries",
        report.total, report.skipped, report.judged, report.sentinels, report.failed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_scales_with_total() {
        assert_eq!(progress_step(5), 1);
        assert_eq!(progress_step(10), 1);
        assert_eq!(progress_step(250), 25);
    }

    #[test]
    fn no_sink_for_single_fact() {
        assert!(default_progress_sink(0).is_none());
        assert!(default_progress_sink(1).is_none());
        assert!(default_progress_sink(2).is_some());
    }

    #[test]
    fn summary_line_lists_counts() {
        let report = RunReport {
            total: 10,
            skipped: 4,
            judged: 5,
            sentinels: 1,
            failed: 1,
        };
        assert_eq!(
            format_run_summary(&report),
            "Run finished: 10 facts, 4 already resolved, 5 judged (1 sentinel), 1 failed after retries"
        );
    }
}
