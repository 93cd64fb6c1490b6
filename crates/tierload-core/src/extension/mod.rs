//! Priority-tiered extension loading.
//!
//! Extensions are declared on disk by descriptor files and installed by the
//! host runtime. This module discovers the descriptors, groups them into
//! priority tiers and drives the host through each tier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   ExtensionSetup                     │
//! │  handlers → modules → plugins (fail-fast per folder) │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 FolderOrchestrator                   │
//! │  PathScanner → EligibilityValidator → GroupScheduler │
//! └─────────────────────────────────────────────────────┘
//!                          │  one batch per priority, highest first
//!                          ▼
//! ┌─────────────┐ ┌─────────────┐ ┌─────────────┐
//! │ LoaderCore  │ │ LoaderCore  │ │ LoaderCore  │   (concurrent within a batch)
//! └─────────────┘ └─────────────┘ └─────────────┘
//!                          │
//!                          ▼
//!                   ExtensionHost
//! ```
//!
//! # Descriptor format
//!
//! ```toml
//! name = "ping"
//! [entry]
//! name = "setup"
//! async = true
//! params = ["host"]
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tierload_core::extension::{ExtensionSetup, StaticHost};
//! use tierload_core::{LoaderConfig, TracingTelemetry};
//!
//! let host = Arc::new(StaticHost::new().with_extension("bot.modules.fun.ping", Arc::new(Ping)));
//! let config = LoaderConfig::new("/srv/bot", "bot").with_env_overrides()?;
//! let report = ExtensionSetup::new(config, host, Arc::new(TracingTelemetry)).run().await?;
//! println!("loaded {} extensions", report.loaded());
//! ```

pub mod guard;
pub mod host;
pub mod ledger;
pub mod loader;
pub mod manifest;
pub mod orchestrator;
pub mod priority;
pub mod resolver;
pub mod scanner;
pub mod scheduler;
pub mod setup;

pub use guard::is_duplicate;
pub use host::{
    DynExtension, DynHost, Extension, ExtensionHost, InstallContext, ModuleRegistry, StaticHost,
};
pub use ledger::LoadLedger;
pub use loader::{LoadOutcome, LoaderCore};
pub use manifest::{EntryPoint, ExtensionManifest, ManifestError, ENTRY_POINT};
pub use orchestrator::{FolderOrchestrator, FolderReport};
pub use priority::{PriorityTable, DEFAULT_PRIORITY};
pub use resolver::ModuleResolver;
pub use scanner::{Candidate, EligibilityValidator, PathScanner};
pub use scheduler::{partition_batches, BatchFailure, BatchReport, GroupScheduler};
pub use setup::{ExtensionSetup, SetupReport};
