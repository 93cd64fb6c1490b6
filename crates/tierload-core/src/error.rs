//! Error types for the extension loader.
//!
//! Two families live here:
//! - [`InstallError`] is produced by extensions (and the host) when a single
//!   unit fails to install. It is a closed set so the loader can tell an
//!   operator-configuration decline apart from a genuine failure.
//! - [`LoaderError`] is produced by the loading machinery itself.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Boxed error carried by [`InstallError::Other`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the loader.
pub type Result<T, E = LoaderError> = std::result::Result<T, E>;

/// Error returned by an extension's install entry point.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The extension declined to install because operator configuration is missing.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// Any other install failure.
    #[error("extension install failed")]
    Other(#[source] BoxError),
}

impl InstallError {
    /// Wrap an arbitrary error as [`InstallError::Other`].
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// Short label used as the telemetry `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Other(_) => "install",
        }
    }

    /// Return the configuration-missing reason if this error is, or wraps, one.
    ///
    /// `Configuration` matches directly. For `Other`, the source chain is
    /// followed for at most `max_depth` links looking for a
    /// [`MissingConfiguration`] marker or a nested `InstallError::Configuration`.
    pub fn configuration_reason(&self, max_depth: usize) -> Option<String> {
        let inner = match self {
            Self::Configuration(reason) => return Some(reason.clone()),
            Self::Other(inner) => inner,
        };

        let first: &(dyn std::error::Error + 'static) = inner.as_ref();
        let mut current = Some(first);
        let mut depth = 0;
        while let Some(err) = current {
            if depth >= max_depth {
                break;
            }
            if let Some(marker) = err.downcast_ref::<MissingConfiguration>() {
                return Some(marker.reason.clone());
            }
            if let Some(InstallError::Configuration(reason)) = err.downcast_ref::<InstallError>() {
                return Some(reason.clone());
            }
            current = err.source();
            depth += 1;
        }
        None
    }
}

impl From<MissingConfiguration> for InstallError {
    fn from(err: MissingConfiguration) -> Self {
        Self::Configuration(err.reason)
    }
}

impl From<HostError> for InstallError {
    fn from(err: HostError) -> Self {
        Self::Other(Box::new(err))
    }
}

/// Marker error for "required configuration is not set".
///
/// Extensions may return it directly (it converts into
/// [`InstallError::Configuration`]) or nest it as the source of another error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing configuration: {reason}")]
pub struct MissingConfiguration {
    pub reason: String,
}

impl MissingConfiguration {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised by a host while resolving a load request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("extension not found in catalog: {0}")]
    NotInCatalog(String),

    #[error("extension already loaded: {0}")]
    AlreadyLoaded(String),
}

/// Errors raised by the loading machinery.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// A single extension failed for a reason other than missing configuration.
    #[error("failed to load extension {module}")]
    LoadFailed {
        module: String,
        #[source]
        source: InstallError,
    },

    #[error("path {} is not under project root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("path cannot be expressed as a module path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pipeline failure while loading one top-level folder.
    #[error("failed to load folder {folder}")]
    FolderLoad {
        folder: String,
        #[source]
        source: Box<LoaderError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LoaderError {
    /// Short label used as the telemetry `error_type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoadFailed { source, .. } => source.kind(),
            Self::OutsideRoot { .. } => "outside_root",
            Self::InvalidPath(_) => "invalid_path",
            Self::Scan { .. } => "scan",
            Self::FolderLoad { .. } => "folder",
            Self::Config(_) => "config",
        }
    }
}

/// Render an error and every source beneath it, one per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        current = cause.source();
    }
    out
}
