//! On-disk extension trees
//!
//! Builds a temporary project root with descriptor files laid out the way
//! the loader expects (`<root>/<folder>/<category>/<stem>.toml`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Descriptor declaring a valid `async setup(host)` entry point.
pub const VALID_DESCRIPTOR: &str = r#"[entry]
name = "setup"
async = true
params = ["host"]
"#;

/// Temporary project root holding extension descriptors.
pub struct ExtensionTree {
    dir: TempDir,
    package: String,
}

impl ExtensionTree {
    pub fn new(package: impl Into<String>) -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("create temp project root")?,
            package: package.into(),
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Write a file at `relative` with arbitrary content.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        std::fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Write a valid descriptor at `relative` and return its dotted module path.
    pub fn extension(&self, relative: &str) -> Result<String> {
        self.write(relative, VALID_DESCRIPTOR)?;
        Ok(self.module_path(relative))
    }

    /// Create an empty directory.
    pub fn folder(&self, relative: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(&path).with_context(|| format!("create {}", path.display()))?;
        Ok(path)
    }

    /// Dotted module path for a descriptor at `relative`.
    pub fn module_path(&self, relative: &str) -> String {
        let trimmed = relative
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(relative);
        format!("{}.{}", self.package, trimmed.replace('/', "."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path() {
        let tree = ExtensionTree::new("bot").unwrap();
        assert_eq!(tree.module_path("modules/fun/ping.toml"), "bot.modules.fun.ping");
    }

    #[test]
    fn test_extension_writes_descriptor() {
        let tree = ExtensionTree::new("bot").unwrap();
        let module = tree.extension("handlers/error.toml").unwrap();
        assert_eq!(module, "bot.handlers.error");
        let content = std::fs::read_to_string(tree.root().join("handlers/error.toml")).unwrap();
        assert_eq!(content, VALID_DESCRIPTOR);
    }
}
