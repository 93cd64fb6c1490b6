//! Per-folder load pipeline.

use std::path::PathBuf;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::host::DynHost;
use super::ledger::LoadLedger;
use super::loader::LoaderCore;
use super::priority::PriorityTable;
use super::resolver::ModuleResolver;
use super::scanner::{Candidate, EligibilityValidator, PathScanner};
use super::scheduler::{BatchReport, GroupScheduler};
use crate::config::{defaults, LoaderConfig};
use crate::error::{LoaderError, Result};
use crate::telemetry::{DynTelemetry, EventOutcome, EventScope, LoadEvent};

/// Summary of one folder's load.
#[derive(Debug, Clone, Default)]
pub struct FolderReport {
    pub folder: String,
    /// False when the folder does not exist and was skipped.
    pub present: bool,
    /// Files found by the scanner.
    pub scanned: usize,
    /// Candidates that passed eligibility.
    pub eligible: usize,
    pub batches: Vec<BatchReport>,
    /// Ledger entries under the folder's module prefix.
    pub modules: usize,
    /// Host registry entries under the folder's module prefix.
    pub registered: usize,
    /// Loads over the slow threshold, slowest first.
    pub slow: Vec<(String, Duration)>,
    pub duration: Duration,
}

impl FolderReport {
    fn absent(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            ..Default::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(BatchReport::failed).sum()
    }
}

/// Drives scan → eligibility → batching for a named top-level folder.
#[derive(Clone)]
pub struct FolderOrchestrator {
    config: LoaderConfig,
    host: DynHost,
    telemetry: DynTelemetry,
}

impl FolderOrchestrator {
    pub fn new(config: LoaderConfig, host: DynHost, telemetry: DynTelemetry) -> Self {
        Self {
            config,
            host,
            telemetry,
        }
    }

    pub fn folder_path(&self, folder: &str) -> PathBuf {
        self.config.root.join(folder)
    }

    /// Load every eligible extension under `folder`, recording durations into `ledger`.
    ///
    /// A missing folder is not an error. Individual extension failures are
    /// isolated by the scheduler; anything else is returned as
    /// [`LoaderError::FolderLoad`].
    pub async fn load_folder(&self, folder: &str, ledger: &LoadLedger) -> Result<FolderReport> {
        let path = self.folder_path(folder);
        // only a definite "not found" counts as absent; other errors surface from the scan
        if let Ok(false) = tokio::fs::try_exists(&path).await {
            info!(folder = %folder, path = %path.display(), "Extension folder not found; skipping");
            self.telemetry
                .record(LoadEvent::new(EventScope::Folder, folder, EventOutcome::Absent));
            return Ok(FolderReport::absent(folder));
        }

        let started = Instant::now();
        match self.run_pipeline(folder, path, ledger).await {
            Ok(mut report) => {
                report.duration = started.elapsed();
                info!(
                    folder = %folder,
                    modules = report.modules,
                    eligible = report.eligible,
                    failed = report.failed(),
                    duration_ms = report.duration.as_secs_f64() * 1000.0,
                    "Extension folder loaded"
                );
                self.telemetry.record(
                    LoadEvent::new(EventScope::Folder, folder, EventOutcome::Success)
                        .with_duration(report.duration)
                        .with_extra("modules", report.modules)
                        .with_extra("registered", report.registered)
                        .with_extra("slow", report.slow.len()),
                );
                Ok(report)
            }
            Err(err) => {
                error!(folder = %folder, error = %err, "Extension folder pipeline failed");
                self.telemetry.record(
                    LoadEvent::new(EventScope::Folder, folder, EventOutcome::Failed)
                        .with_duration(started.elapsed())
                        .with_error_type(err.kind()),
                );
                Err(LoaderError::FolderLoad {
                    folder: folder.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn run_pipeline(
        &self,
        folder: &str,
        path: PathBuf,
        ledger: &LoadLedger,
    ) -> Result<FolderReport> {
        let scanner = PathScanner::new(self.config.suffix.clone());
        let files = scanner
            .scan(&path)
            .await
            .map_err(|source| LoaderError::Scan {
                path: path.clone(),
                source,
            })?;

        let validator = EligibilityValidator::new(self.config.ignore.clone(), self.config.suffix.clone());
        let candidates: Vec<Candidate> = join_all(files.iter().map(|file| validator.check(file)))
            .await
            .into_iter()
            .flatten()
            .collect();
        debug!(folder = %folder, scanned = files.len(), eligible = candidates.len(), "Eligible extensions collected");

        let resolver = ModuleResolver::new(self.config.root.clone(), self.config.package.clone());
        let prefix = resolver.folder_prefix(folder);
        let core = LoaderCore::new(
            self.host.clone(),
            resolver,
            PriorityTable::from(&self.config.priorities),
            self.telemetry.clone(),
            ledger.clone(),
        )
        .with_max_error_depth(self.config.max_error_depth);

        let mut report = FolderReport {
            folder: folder.to_string(),
            present: true,
            scanned: files.len(),
            eligible: candidates.len(),
            ..Default::default()
        };
        report.batches = GroupScheduler::new(core, self.telemetry.clone())
            .load_all(candidates)
            .await;

        report.modules = ledger.count_with_prefix(&prefix);
        report.registered = self.host.loaded_with_prefix(&prefix).len();

        let threshold = Duration::try_from_secs_f64(self.config.slow_load_threshold_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(defaults::SLOW_LOAD_THRESHOLD_SECS));
        report.slow = ledger.slow_entries(&prefix, threshold);
        for (module, duration) in &report.slow {
            warn!(
                module = %module,
                duration_ms = duration.as_secs_f64() * 1000.0,
                threshold_ms = threshold.as_secs_f64() * 1000.0,
                "Slow extension load"
            );
        }

        Ok(report)
    }
}
