//! Startup entry point: load every configured folder in order.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use super::host::DynHost;
use super::ledger::LoadLedger;
use super::orchestrator::{FolderOrchestrator, FolderReport};
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::telemetry::{DynTelemetry, EventOutcome, EventScope, LoadEvent};

/// Telemetry name for the setup-scope event.
const SETUP_EVENT: &str = "extension_setup";

/// Outcome of a complete setup run.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub folders: Vec<FolderReport>,
    /// Durations of every module loaded during the run.
    pub ledger: LoadLedger,
    pub duration: Duration,
}

impl SetupReport {
    pub fn folder(&self, name: &str) -> Option<&FolderReport> {
        self.folders.iter().find(|f| f.folder == name)
    }

    pub fn loaded(&self) -> usize {
        self.ledger.len()
    }

    pub fn failed(&self) -> usize {
        self.folders.iter().map(FolderReport::failed).sum()
    }
}

/// Loads the configured folders (by default handlers, modules, plugins) in sequence.
///
/// Each folder fully completes before the next starts. A folder-level
/// pipeline failure aborts the remaining folders and is returned to the
/// caller; individual extension failures never are.
pub struct ExtensionSetup {
    config: LoaderConfig,
    host: DynHost,
    telemetry: DynTelemetry,
}

impl ExtensionSetup {
    pub fn new(config: LoaderConfig, host: DynHost, telemetry: DynTelemetry) -> Self {
        Self {
            config,
            host,
            telemetry,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run the full setup sequence and register the loader with the host.
    pub async fn run(&self) -> Result<SetupReport> {
        self.config.validate()?;

        let started = Instant::now();
        let ledger = LoadLedger::new();
        let orchestrator =
            FolderOrchestrator::new(self.config.clone(), self.host.clone(), self.telemetry.clone());

        let mut folders = Vec::with_capacity(self.config.folders.len());
        for folder in &self.config.folders {
            match orchestrator.load_folder(folder, &ledger).await {
                Ok(report) => folders.push(report),
                Err(err) => {
                    error!(folder = %folder, error = %err, "Extension setup aborted");
                    self.telemetry.record(
                        LoadEvent::new(EventScope::Setup, SETUP_EVENT, EventOutcome::Failed)
                            .with_duration(started.elapsed())
                            .with_error_type(err.kind())
                            .with_extra("failed_folder", folder.as_str()),
                    );
                    return Err(err);
                }
            }
        }

        self.host.register_component(&self.config.component_name);

        let duration = started.elapsed();
        info!(
            folders = folders.len(),
            loaded = ledger.len(),
            duration_ms = duration.as_secs_f64() * 1000.0,
            "Extension setup complete"
        );
        self.telemetry.record(
            LoadEvent::new(EventScope::Setup, SETUP_EVENT, EventOutcome::Success)
                .with_duration(duration)
                .with_extra("folders", folders.len())
                .with_extra("loaded", ledger.len()),
        );

        Ok(SetupReport {
            folders,
            ledger,
            duration,
        })
    }
}
