//! Loader configuration.
//!
//! Every field has a default so a bare `LoaderConfig::new(root, package)` is
//! enough for the common layout. Values can be read from a `.toml` or `.json`
//! file and then overridden from the environment.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown config format (expected .json or .toml): {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Default values.
pub mod defaults {
    /// Top-level folders, in load order.
    pub const FOLDERS: &[&str] = &["handlers", "modules", "plugins"];
    /// Descriptor file suffix.
    pub const SUFFIX: &str = "toml";
    /// Loads slower than this are reported.
    pub const SLOW_LOAD_THRESHOLD_SECS: f64 = 1.0;
    /// How many `source()` links are followed when classifying an install error.
    pub const MAX_ERROR_DEPTH: usize = 10;
    /// Name the loader registers itself under once setup completes.
    pub const COMPONENT_NAME: &str = "extension_loader";

    /// Built-in directory priorities. Anything not listed loads at 0.
    pub const PRIORITIES: &[(&str, i32)] = &[
        ("services", 90),
        ("admin", 80),
        ("levels", 70),
        ("snippets", 60),
        ("moderation", 50),
        ("guild", 40),
        ("utility", 30),
        ("info", 20),
        ("fun", 10),
    ];
}

/// Environment variable names.
pub mod env_vars {
    pub const ROOT: &str = "TIERLOAD_ROOT";
    pub const PACKAGE: &str = "TIERLOAD_PACKAGE";
    /// Comma separated list of stems.
    pub const IGNORE: &str = "TIERLOAD_IGNORE";
    /// Comma separated list of folder names.
    pub const FOLDERS: &str = "TIERLOAD_FOLDERS";
    pub const SLOW_LOAD_SECS: &str = "TIERLOAD_SLOW_LOAD_SECS";
    pub const MAX_ERROR_DEPTH: &str = "TIERLOAD_MAX_ERROR_DEPTH";
}

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Project root; folders are resolved beneath it and module paths are relative to it.
    pub root: PathBuf,
    /// Root package name prefixed to every module path.
    pub package: String,
    /// Top-level folders loaded in order.
    pub folders: Vec<String>,
    /// File stems that are never loaded.
    pub ignore: BTreeSet<String>,
    /// Descriptor suffix, without the dot.
    pub suffix: String,
    /// Parent-directory name to priority. Higher loads first.
    pub priorities: BTreeMap<String, i32>,
    pub slow_load_threshold_secs: f64,
    pub max_error_depth: usize,
    pub component_name: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            package: String::new(),
            folders: defaults::FOLDERS.iter().map(|f| f.to_string()).collect(),
            ignore: BTreeSet::new(),
            suffix: defaults::SUFFIX.to_string(),
            priorities: defaults::PRIORITIES
                .iter()
                .map(|(name, priority)| (name.to_string(), *priority))
                .collect(),
            slow_load_threshold_secs: defaults::SLOW_LOAD_THRESHOLD_SECS,
            max_error_depth: defaults::MAX_ERROR_DEPTH,
            component_name: defaults::COMPONENT_NAME.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Create a config for `root` with package name `package` and defaults elsewhere.
    pub fn new(root: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            package: package.into(),
            ..Default::default()
        }
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(root) = lookup(env_vars::ROOT) {
            self.root = PathBuf::from(root);
        }
        if let Some(package) = lookup(env_vars::PACKAGE) {
            self.package = package;
        }
        if let Some(ignore) = lookup(env_vars::IGNORE) {
            self.ignore = split_list(&ignore).collect();
        }
        if let Some(folders) = lookup(env_vars::FOLDERS) {
            self.folders = split_list(&folders).collect();
        }
        if let Some(secs) = lookup(env_vars::SLOW_LOAD_SECS) {
            self.slow_load_threshold_secs = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a number: {}", env_vars::SLOW_LOAD_SECS, secs))
            })?;
        }
        if let Some(depth) = lookup(env_vars::MAX_ERROR_DEPTH) {
            self.max_error_depth = depth.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not an integer: {}", env_vars::MAX_ERROR_DEPTH, depth))
            })?;
        }
        Ok(self)
    }

    /// Add a stem to the ignore set.
    pub fn with_ignored(mut self, stem: impl Into<String>) -> Self {
        self.ignore.insert(stem.into());
        self
    }

    /// Set the priority for a parent-directory name.
    pub fn with_priority(mut self, directory: impl Into<String>, priority: i32) -> Self {
        self.priorities.insert(directory.into(), priority);
        self
    }

    /// Replace the folder sequence.
    pub fn with_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Check the config for values the loader cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.package) {
            return Err(ConfigError::Invalid(format!(
                "package must be a non-empty identifier, got {:?}",
                self.package
            )));
        }
        if self.folders.is_empty() {
            return Err(ConfigError::Invalid("folders must not be empty".into()));
        }
        if let Some(folder) = self.folders.iter().find(|f| !is_identifier(f)) {
            return Err(ConfigError::Invalid(format!("invalid folder name {:?}", folder)));
        }
        if self.suffix.is_empty() || self.suffix.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "suffix must be non-empty and given without a dot, got {:?}",
                self.suffix
            )));
        }
        if !(self.slow_load_threshold_secs.is_finite() && self.slow_load_threshold_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "slow_load_threshold_secs must be positive, got {}",
                self.slow_load_threshold_secs
            )));
        }
        if self.max_error_depth == 0 {
            return Err(ConfigError::Invalid("max_error_depth must be at least 1".into()));
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// ASCII identifier: a letter or `_`, then letters, digits or `_`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::new("/srv/bot", "bot");
        assert_eq!(config.folders, vec!["handlers", "modules", "plugins"]);
        assert_eq!(config.suffix, "toml");
        assert_eq!(config.priorities.get("services"), Some(&90));
        assert_eq!(config.slow_load_threshold_secs, 1.0);
        assert_eq!(config.max_error_depth, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.toml");
        std::fs::write(
            &path,
            r#"
package = "bot"
ignore = ["legacy"]

[priorities]
fun = 5
"#,
        )
        .unwrap();

        let config = LoaderConfig::from_file(&path).unwrap();
        assert_eq!(config.package, "bot");
        assert!(config.ignore.contains("legacy"));
        assert_eq!(config.priorities.get("fun"), Some(&5));
        // a partial table replaces the built-in one
        assert_eq!(config.priorities.get("services"), None);
        assert_eq!(config.folders.len(), 3);
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.json");
        std::fs::write(&path, r#"{"package": "bot", "folders": ["modules"]}"#).unwrap();

        let config = LoaderConfig::from_file(&path).unwrap();
        assert_eq!(config.folders, vec!["modules"]);
    }

    #[test]
    fn test_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.yaml");
        std::fs::write(&path, "package: bot").unwrap();
        assert!(matches!(
            LoaderConfig::from_file(&path),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (env_vars::PACKAGE, "other"),
            (env_vars::IGNORE, "legacy, , old"),
            (env_vars::SLOW_LOAD_SECS, "2.5"),
        ]
        .into_iter()
        .collect();

        let config = LoaderConfig::new("/srv", "bot")
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.package, "other");
        assert_eq!(config.ignore.len(), 2);
        assert!(config.ignore.contains("old"));
        assert_eq!(config.slow_load_threshold_secs, 2.5);
    }

    #[test]
    fn test_bad_override_number() {
        let result = LoaderConfig::new("/srv", "bot").with_overrides(|k| {
            (k == env_vars::MAX_ERROR_DEPTH).then(|| "deep".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects() {
        assert!(LoaderConfig::new(".", "").validate().is_err());
        assert!(LoaderConfig::new(".", "my-bot").validate().is_err());
        assert!(LoaderConfig::new(".", "bot").with_folders(Vec::<String>::new()).validate().is_err());

        let mut config = LoaderConfig::new(".", "bot");
        config.slow_load_threshold_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = LoaderConfig::new(".", "bot");
        config.suffix = ".toml".into();
        assert!(config.validate().is_err());
    }
}
