//! Single-extension loading.
//!
//! [`LoaderCore::load`] takes one eligible candidate through
//! resolve → duplicate check → host load, timing the host call and
//! classifying its failure. A configuration decline is returned as a normal
//! outcome; any other failure is returned as [`LoaderError::LoadFailed`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use super::guard::is_duplicate;
use super::host::DynHost;
use super::ledger::LoadLedger;
use super::priority::PriorityTable;
use super::resolver::ModuleResolver;
use super::scanner::Candidate;
use crate::config::defaults;
use crate::error::{error_chain, LoaderError, Result};
use crate::telemetry::{DynTelemetry, EventOutcome, EventScope, LoadEvent};

/// How a settled load attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Duration),
    /// The module or an ancestor package was already registered; the host was not called.
    Duplicate,
    /// The extension declined for lack of configuration.
    ConfigurationSkipped(String),
}

/// Loads one candidate at a time.
#[derive(Clone)]
pub struct LoaderCore {
    host: DynHost,
    resolver: ModuleResolver,
    priorities: PriorityTable,
    telemetry: DynTelemetry,
    ledger: LoadLedger,
    max_error_depth: usize,
}

impl LoaderCore {
    pub fn new(
        host: DynHost,
        resolver: ModuleResolver,
        priorities: PriorityTable,
        telemetry: DynTelemetry,
        ledger: LoadLedger,
    ) -> Self {
        Self {
            host,
            resolver,
            priorities,
            telemetry,
            ledger,
            max_error_depth: defaults::MAX_ERROR_DEPTH,
        }
    }

    /// Set how many error-source links are inspected for a configuration marker.
    pub fn with_max_error_depth(mut self, depth: usize) -> Self {
        self.max_error_depth = depth.max(1);
        self
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    pub fn ledger(&self) -> &LoadLedger {
        &self.ledger
    }

    /// Load a single candidate.
    pub async fn load(&self, candidate: &Candidate) -> Result<LoadOutcome> {
        let module_path = self.resolver.to_module_path(&candidate.path)?;
        let priority = self.priorities.priority(candidate);

        if is_duplicate(&module_path, self.host.as_ref()) {
            self.emit(&module_path, candidate, priority, EventOutcome::Duplicate, Duration::ZERO, None);
            return Ok(LoadOutcome::Duplicate);
        }

        let started = Instant::now();
        let result = self.host.load_extension(&module_path).await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                self.ledger.record(module_path.clone(), elapsed);
                info!(
                    module = %module_path,
                    priority,
                    duration_ms = elapsed.as_secs_f64() * 1000.0,
                    "Extension loaded"
                );
                self.emit(&module_path, candidate, priority, EventOutcome::Loaded, elapsed, None);
                Ok(LoadOutcome::Loaded(elapsed))
            }
            Err(err) => match err.configuration_reason(self.max_error_depth) {
                Some(reason) => {
                    warn!(
                        module = %module_path,
                        reason = %reason,
                        "Extension skipped: missing configuration. Provide the setting, or add '{}' to the ignore list to silence this warning",
                        candidate.stem
                    );
                    self.emit(
                        &module_path,
                        candidate,
                        priority,
                        EventOutcome::SkippedConfiguration,
                        elapsed,
                        Some("configuration"),
                    );
                    Ok(LoadOutcome::ConfigurationSkipped(reason))
                }
                None => {
                    let err = LoaderError::LoadFailed {
                        module: module_path.clone(),
                        source: err,
                    };
                    let chain = error_chain(&err);
                    error!(module = %module_path, error = %chain, "Extension failed to load");
                    self.telemetry.record(
                        self.event(&module_path, candidate, priority, EventOutcome::Failed, elapsed)
                            .with_error_type(err.kind())
                            .with_extra("error", chain),
                    );
                    Err(err)
                }
            },
        }
    }

    fn emit(
        &self,
        module_path: &str,
        candidate: &Candidate,
        priority: i32,
        outcome: EventOutcome,
        elapsed: Duration,
        error_type: Option<&str>,
    ) {
        let mut event = self.event(module_path, candidate, priority, outcome, elapsed);
        if let Some(error_type) = error_type {
            event = event.with_error_type(error_type);
        }
        self.telemetry.record(event);
    }

    fn event(
        &self,
        module_path: &str,
        candidate: &Candidate,
        priority: i32,
        outcome: EventOutcome,
        elapsed: Duration,
    ) -> LoadEvent {
        LoadEvent::new(EventScope::Module, module_path, outcome)
            .with_duration(elapsed)
            .with_extra("category", candidate.parent.as_str())
            .with_extra("priority", priority)
    }
}
