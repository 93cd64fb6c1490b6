//! Priority-ordered concurrent extension loader.
//!
//! Discovers extension descriptors on disk, loads them tier by tier through
//! a host runtime, isolates per-extension failures and reports load timings.

pub mod config;
pub mod error;
pub mod extension;
pub mod telemetry;

pub use config::{ConfigError, LoaderConfig};
pub use error::{HostError, InstallError, LoaderError, MissingConfiguration, Result};
pub use telemetry::{
    BroadcastTelemetry, DynTelemetry, EventOutcome, EventScope, LoadEvent, MemoryTelemetry,
    NoopTelemetry, TelemetrySink, TracingTelemetry,
};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::LoaderConfig;
    pub use crate::error::{InstallError, LoaderError, MissingConfiguration, Result};
    pub use crate::extension::{
        Extension, ExtensionHost, ExtensionSetup, InstallContext, LoadLedger, ModuleRegistry,
        SetupReport, StaticHost,
    };
    pub use crate::telemetry::{LoadEvent, TelemetrySink};
}
