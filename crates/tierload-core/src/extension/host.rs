//! Host runtime interface.
//!
//! The loader never installs anything itself. It asks an [`ExtensionHost`]
//! to load a dotted module path and reads the host's [`ModuleRegistry`] to
//! avoid loading twice. Only the host mutates the registry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{HostError, InstallError, MissingConfiguration};

/// Read-only view of the set of loaded module paths.
pub trait ModuleRegistry: Send + Sync {
    /// Whether `module_path` is currently registered.
    fn is_loaded(&self, module_path: &str) -> bool;

    /// Every registered path equal to `prefix` or nested beneath it.
    fn loaded_with_prefix(&self, prefix: &str) -> Vec<String>;
}

/// Host runtime the loader drives.
#[async_trait]
pub trait ExtensionHost: ModuleRegistry {
    /// Load and install the extension at `module_path`.
    ///
    /// Must return [`InstallError::Configuration`] (or an error chain holding a
    /// [`MissingConfiguration`]) when the extension declines for lack of
    /// configuration.
    async fn load_extension(&self, module_path: &str) -> Result<(), InstallError>;

    /// Record a non-extension component (such as the loader itself) as loaded.
    fn register_component(&self, name: &str);
}

/// Shared host handle.
pub type DynHost = Arc<dyn ExtensionHost>;

/// An installable extension.
#[async_trait]
pub trait Extension: Send + Sync {
    async fn install(&self, ctx: &InstallContext) -> Result<(), InstallError>;
}

/// Shared extension handle.
pub type DynExtension = Arc<dyn Extension>;

/// Context handed to [`Extension::install`].
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub module_path: String,
    /// Operator settings for this module (a JSON object, or `Null` when none are set).
    pub settings: serde_json::Value,
}

impl InstallContext {
    pub fn new(module_path: impl Into<String>, settings: serde_json::Value) -> Self {
        Self {
            module_path: module_path.into(),
            settings,
        }
    }

    /// Look up an optional setting.
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings.get(key).filter(|v| !v.is_null())
    }

    /// Look up a required setting; missing keys decline the install as a configuration skip.
    pub fn require(&self, key: &str) -> Result<&serde_json::Value, MissingConfiguration> {
        self.setting(key).ok_or_else(|| {
            MissingConfiguration::new(format!("`{}` is not set for {}", key, self.module_path))
        })
    }
}

/// Returns true if `path` equals `prefix` or is a dotted descendant of it.
pub(crate) fn is_within(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// In-process host backed by a catalog of extensions compiled into the binary.
///
/// The catalog maps dotted module paths to [`Extension`] implementations;
/// descriptor files on disk select which of them get loaded.
#[derive(Default)]
pub struct StaticHost {
    catalog: RwLock<HashMap<String, DynExtension>>,
    settings: RwLock<HashMap<String, serde_json::Value>>,
    registry: RwLock<BTreeSet<String>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extension to the catalog under `module_path`.
    pub fn register_extension(&self, module_path: impl Into<String>, extension: DynExtension) {
        self.catalog.write().insert(module_path.into(), extension);
    }

    /// Builder form of [`StaticHost::register_extension`].
    pub fn with_extension(self, module_path: impl Into<String>, extension: DynExtension) -> Self {
        self.register_extension(module_path, extension);
        self
    }

    /// Set operator settings for `module_path`.
    pub fn configure(&self, module_path: impl Into<String>, settings: serde_json::Value) {
        self.settings.write().insert(module_path.into(), settings);
    }

    /// Mark a path as loaded without installing anything.
    pub fn mark_loaded(&self, module_path: impl Into<String>) {
        self.registry.write().insert(module_path.into());
    }

    /// All registered paths in sorted order.
    pub fn loaded(&self) -> Vec<String> {
        self.registry.read().iter().cloned().collect()
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.read().len()
    }
}

impl ModuleRegistry for StaticHost {
    fn is_loaded(&self, module_path: &str) -> bool {
        self.registry.read().contains(module_path)
    }

    fn loaded_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.registry
            .read()
            .range(prefix.to_string()..)
            .take_while(|path| path.starts_with(prefix))
            .filter(|path| is_within(path, prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ExtensionHost for StaticHost {
    async fn load_extension(&self, module_path: &str) -> Result<(), InstallError> {
        if self.is_loaded(module_path) {
            return Err(HostError::AlreadyLoaded(module_path.to_string()).into());
        }

        let extension = self
            .catalog
            .read()
            .get(module_path)
            .cloned()
            .ok_or_else(|| HostError::NotInCatalog(module_path.to_string()))?;

        let settings = self
            .settings
            .read()
            .get(module_path)
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let ctx = InstallContext::new(module_path, settings);
        debug!(module = %module_path, "Installing extension");
        extension.install(&ctx).await?;

        self.registry.write().insert(module_path.to_string());
        Ok(())
    }

    fn register_component(&self, name: &str) {
        info!(component = %name, "Component registered");
        self.registry.write().insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NeedsToken;

    #[async_trait]
    impl Extension for NeedsToken {
        async fn install(&self, ctx: &InstallContext) -> Result<(), InstallError> {
            ctx.require("token")?;
            Ok(())
        }
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("bot.modules", "bot.modules"));
        assert!(is_within("bot.modules.fun", "bot.modules"));
        assert!(!is_within("bot.modules_extra", "bot.modules"));
        assert!(!is_within("bot", "bot.modules"));
    }

    #[test]
    fn test_prefix_enumeration() {
        let host = StaticHost::new();
        host.mark_loaded("bot.modules.fun.ping");
        host.mark_loaded("bot.modules.admin");
        host.mark_loaded("bot.modules_extra.x");
        host.mark_loaded("bot.handlers.error");

        assert_eq!(
            host.loaded_with_prefix("bot.modules"),
            vec!["bot.modules.admin", "bot.modules.fun.ping"]
        );
        assert!(host.loaded_with_prefix("bot.plugins").is_empty());
    }

    #[tokio::test]
    async fn test_load_registers_on_success() {
        let host = StaticHost::new().with_extension("bot.modules.ping", Arc::new(NeedsToken));
        host.configure("bot.modules.ping", json!({ "token": "abc" }));

        host.load_extension("bot.modules.ping").await.unwrap();
        assert!(host.is_loaded("bot.modules.ping"));

        let err = host.load_extension("bot.modules.ping").await.unwrap_err();
        assert_eq!(err.kind(), "install");
    }

    #[tokio::test]
    async fn test_missing_setting_is_configuration() {
        let host = StaticHost::new().with_extension("bot.modules.ping", Arc::new(NeedsToken));
        host.configure("bot.modules.ping", json!({ "token": null }));

        let err = host.load_extension("bot.modules.ping").await.unwrap_err();
        assert!(matches!(err, InstallError::Configuration(_)));
        assert!(!host.is_loaded("bot.modules.ping"));
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let host = StaticHost::new();
        let err = host.load_extension("bot.modules.nope").await.unwrap_err();
        assert!(err.to_string().contains("install failed"));
        assert_eq!(host.catalog_len(), 0);
    }

    #[test]
    fn test_register_component() {
        let host = StaticHost::new();
        host.register_component("extension_loader");
        assert!(host.is_loaded("extension_loader"));
    }
}
