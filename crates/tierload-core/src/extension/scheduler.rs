//! Priority-tiered batch scheduling.
//!
//! Candidates are grouped into batches of equal priority, highest first.
//! Every load in a batch runs concurrently on the current task and the next
//! batch starts only once every load in the previous one has settled. A
//! failed load never cancels its siblings.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::loader::{LoadOutcome, LoaderCore};
use super::scanner::Candidate;
use crate::error::{error_chain, LoaderError};
use crate::telemetry::{DynTelemetry, EventOutcome, EventScope, LoadEvent};

/// A failed module within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Module path, or the candidate path when it could not be resolved.
    pub module: String,
    pub error_type: String,
    pub message: String,
}

/// Result of one settled batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub priority: i32,
    /// Candidate stems in discovery order.
    pub modules: Vec<String>,
    pub loaded: usize,
    pub duplicates: usize,
    pub config_skipped: usize,
    pub failures: Vec<BatchFailure>,
    pub duration: Duration,
}

impl BatchReport {
    /// Settled without error: loaded, duplicate or configuration skip.
    pub fn succeeded(&self) -> usize {
        self.loaded + self.duplicates + self.config_skipped
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Sort candidates by descending priority and split into equal-priority runs.
///
/// The sort is stable, so candidates sharing a priority keep discovery order.
pub fn partition_batches(
    mut candidates: Vec<Candidate>,
    priority_of: impl Fn(&Candidate) -> i32,
) -> Vec<(i32, Vec<Candidate>)> {
    candidates.sort_by_key(|c| Reverse(priority_of(c)));

    let mut batches: Vec<(i32, Vec<Candidate>)> = Vec::new();
    for candidate in candidates {
        let priority = priority_of(&candidate);
        match batches.last_mut() {
            Some((last, batch)) if *last == priority => batch.push(candidate),
            _ => batches.push((priority, vec![candidate])),
        }
    }
    batches
}

/// Runs candidates through [`LoaderCore`] tier by tier.
#[derive(Clone)]
pub struct GroupScheduler {
    core: LoaderCore,
    telemetry: DynTelemetry,
}

impl GroupScheduler {
    pub fn new(core: LoaderCore, telemetry: DynTelemetry) -> Self {
        Self { core, telemetry }
    }

    pub fn core(&self) -> &LoaderCore {
        &self.core
    }

    /// Load every candidate. Always returns; per-module failures are reported, not raised.
    pub async fn load_all(&self, candidates: Vec<Candidate>) -> Vec<BatchReport> {
        let priorities = self.core.priorities().clone();
        let batches = partition_batches(candidates, |c| priorities.priority(c));
        debug!(batches = batches.len(), "Scheduling extension batches");

        let mut reports = Vec::with_capacity(batches.len());
        for (priority, batch) in batches {
            reports.push(self.load_batch(priority, &batch).await);
        }
        reports
    }

    /// Load one batch concurrently and wait for every load to settle.
    pub async fn load_batch(&self, priority: i32, batch: &[Candidate]) -> BatchReport {
        let started = Instant::now();
        let results = join_all(batch.iter().map(|candidate| self.core.load(candidate))).await;

        let mut report = BatchReport {
            priority,
            modules: batch.iter().map(|c| c.stem.clone()).collect(),
            ..Default::default()
        };

        for (candidate, result) in batch.iter().zip(results) {
            match result {
                Ok(LoadOutcome::Loaded(_)) => report.loaded += 1,
                Ok(LoadOutcome::Duplicate) => report.duplicates += 1,
                Ok(LoadOutcome::ConfigurationSkipped(_)) => report.config_skipped += 1,
                Err(err) => {
                    let module = match &err {
                        LoaderError::LoadFailed { module, .. } => module.clone(),
                        _ => candidate.path.display().to_string(),
                    };
                    error!(
                        module = %module,
                        priority,
                        error = %error_chain(&err),
                        "Extension failed in batch; continuing"
                    );
                    report.failures.push(BatchFailure {
                        module,
                        error_type: err.kind().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        report.duration = started.elapsed();

        let categories: BTreeSet<&str> = batch.iter().map(|c| c.parent.as_str()).collect();
        info!(
            priority,
            total = batch.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.duration.as_secs_f64() * 1000.0,
            "Extension batch settled"
        );

        let outcome = if report.failures.is_empty() {
            EventOutcome::Success
        } else {
            EventOutcome::Partial
        };
        self.telemetry.record(
            LoadEvent::new(EventScope::Batch, format!("priority_{}", priority), outcome)
                .with_duration(report.duration)
                .with_extra("priority", priority)
                .with_extra("total", batch.len())
                .with_extra("succeeded", report.succeeded())
                .with_extra("failed", report.failed())
                .with_extra(
                    "categories",
                    categories.into_iter().map(str::to_string).collect::<Vec<_>>(),
                ),
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str) -> Candidate {
        Candidate::from_path(path).unwrap()
    }

    #[test]
    fn test_partition_descending_and_stable() {
        let candidates = vec![
            candidate("/r/m/fun/a.toml"),
            candidate("/r/m/admin/b.toml"),
            candidate("/r/m/fun/c.toml"),
            candidate("/r/m/misc/d.toml"),
            candidate("/r/m/admin/e.toml"),
        ];
        let table = |c: &Candidate| match c.parent.as_str() {
            "admin" => 80,
            "fun" => 10,
            _ => 0,
        };

        let batches = partition_batches(candidates, table);
        let shape: Vec<(i32, Vec<&str>)> = batches
            .iter()
            .map(|(p, b)| (*p, b.iter().map(|c| c.stem.as_str()).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![(80, vec!["b", "e"]), (10, vec!["a", "c"]), (0, vec!["d"])]
        );
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_batches(Vec::new(), |_| 0).is_empty());
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            loaded: 2,
            duplicates: 1,
            config_skipped: 1,
            failures: vec![BatchFailure {
                module: "bot.modules.x".into(),
                error_type: "install".into(),
                message: "boom".into(),
            }],
            ..Default::default()
        };
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.failed(), 1);
    }
}
