//! Extension descriptor files.
//!
//! Every loadable unit on disk is a small TOML descriptor declaring its entry
//! point. The loader never executes anything from the file; it only checks
//! that the declared entry has the shape of an async `setup(host)`.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Entry point every extension must expose.
pub const ENTRY_POINT: &str = "setup";

/// Descriptor errors.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Declared entry point of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    #[serde(rename = "async", default)]
    pub is_async: bool,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Parsed descriptor file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entry: Option<EntryPoint>,
}

impl ExtensionManifest {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a descriptor from disk.
    pub async fn read(path: &Path) -> Result<Self, ManifestError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// True when the descriptor declares `async setup(<at least one param>)`.
    pub fn has_setup_entry(&self) -> bool {
        self.entry
            .as_ref()
            .map(|entry| entry.name == ENTRY_POINT && entry.is_async && !entry.params.is_empty())
            .unwrap_or(false)
    }
}
