//! Candidate discovery and eligibility.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::manifest::ExtensionManifest;
use crate::config::is_identifier;

/// A file that might be an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub stem: String,
    /// Name of the directory containing the file; used for priority lookup.
    pub parent: String,
}

impl Candidate {
    /// Build a candidate from a path. Returns `None` for paths without a UTF-8 stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let stem = path.file_stem()?.to_str()?.to_string();
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Some(Self { path, stem, parent })
    }
}

/// Enumerates files under a root.
#[derive(Debug, Clone)]
pub struct PathScanner {
    suffix: String,
}

impl PathScanner {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// List candidate files.
    ///
    /// A file root is returned as-is. A directory root is walked depth-first,
    /// entries in lexicographic order, returning every file with the
    /// configured suffix. Symlinked directories are not followed.
    pub async fn scan(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let metadata = tokio::fs::metadata(root).await?;
        if !metadata.is_dir() {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut found = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = Vec::new();
            let mut reader = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = reader.next_entry().await? {
                entries.push((entry.path(), entry.file_type().await?));
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut subdirs = Vec::new();
            for (path, file_type) in entries {
                if file_type.is_dir() {
                    subdirs.push(path);
                } else if has_suffix(&path, &self.suffix) {
                    found.push(path);
                }
            }
            // files of a directory come before its subdirectories
            pending.extend(subdirs.into_iter().rev());
        }
        Ok(found)
    }
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(suffix)
}

/// Decides whether a scanned file should be loaded.
#[derive(Debug, Clone)]
pub struct EligibilityValidator {
    ignore: BTreeSet<String>,
    suffix: String,
}

impl EligibilityValidator {
    pub fn new(ignore: BTreeSet<String>, suffix: impl Into<String>) -> Self {
        Self {
            ignore,
            suffix: suffix.into(),
        }
    }

    /// Return the candidate for `path` if it is loadable.
    ///
    /// Never fails: unreadable or malformed descriptors are logged and rejected.
    pub async fn check(&self, path: &Path) -> Option<Candidate> {
        let Some(candidate) = Candidate::from_path(path) else {
            debug!(path = %path.display(), "Skipping path without a usable file stem");
            return None;
        };

        if self.ignore.contains(&candidate.stem) {
            debug!(path = %path.display(), "Skipping ignored extension");
            return None;
        }

        if !has_suffix(path, &self.suffix) || candidate.stem.starts_with('_') {
            debug!(path = %path.display(), "Skipping file outside naming convention");
            return None;
        }

        // a dotted stem would read as an extra package level in the module path
        if !is_identifier(&candidate.stem) {
            debug!(path = %path.display(), "Skipping extension whose stem is not an identifier");
            return None;
        }

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                debug!(path = %path.display(), "Skipping non-regular file");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat extension candidate");
                return None;
            }
        }

        match ExtensionManifest::read(path).await {
            Ok(manifest) if manifest.has_setup_entry() => Some(candidate),
            Ok(_) => {
                debug!(path = %path.display(), "Skipping descriptor without async setup entry");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read extension descriptor");
                None
            }
        }
    }

    /// Convenience wrapper returning `true` for loadable paths.
    pub async fn is_eligible(&self, path: &Path) -> bool {
        self.check(path).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "[entry]\nname = \"setup\"\nasync = true\nparams = [\"host\"]\n";

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_candidate_from_path() {
        let c = Candidate::from_path("/srv/bot/modules/fun/ping.toml").unwrap();
        assert_eq!(c.stem, "ping");
        assert_eq!(c.parent, "fun");
    }

    #[tokio::test]
    async fn test_scan_orders_and_filters_suffix() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.toml", VALID);
        write(dir.path(), "a.toml", VALID);
        write(dir.path(), "notes.md", "x");
        write(dir.path(), "fun/z.toml", VALID);
        write(dir.path(), "admin/y.toml", VALID);

        let found = PathScanner::new("toml").scan(dir.path()).await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.toml", "b.toml", "admin/y.toml", "fun/z.toml"]);
    }

    #[tokio::test]
    async fn test_scan_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "solo.toml", VALID);
        let found = PathScanner::new("toml").scan(&file).await.unwrap();
        assert_eq!(found, vec![file]);
    }

    #[tokio::test]
    async fn test_scan_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PathScanner::new("toml").scan(&dir.path().join("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_eligibility_rules() {
        let dir = tempfile::tempdir().unwrap();
        let validator = EligibilityValidator::new(["legacy".to_string()].into(), "toml");

        let ok = write(dir.path(), "feature.toml", VALID);
        let ignored = write(dir.path(), "legacy.toml", VALID);
        let private = write(dir.path(), "_helpers.toml", VALID);
        let wrong_suffix = write(dir.path(), "feature.json", VALID);
        let no_setup = write(dir.path(), "util.toml", "name = \"util\"\n");
        let broken = write(dir.path(), "broken.toml", "[entry\n");
        std::fs::create_dir_all(dir.path().join("folder.toml")).unwrap();

        assert!(validator.is_eligible(&ok).await);
        assert!(!validator.is_eligible(&ignored).await);
        assert!(!validator.is_eligible(&private).await);
        assert!(!validator.is_eligible(&wrong_suffix).await);
        assert!(!validator.is_eligible(&no_setup).await);
        assert!(!validator.is_eligible(&broken).await);
        assert!(!validator.is_eligible(&dir.path().join("folder.toml")).await);
        assert!(!validator.is_eligible(&dir.path().join("missing.toml")).await);
    }

    #[tokio::test]
    async fn test_non_identifier_stems_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let validator = EligibilityValidator::new(BTreeSet::new(), "toml");

        let dotted = write(dir.path(), "feature.v2.toml", VALID);
        let dashed = write(dir.path(), "my-feature.toml", VALID);
        let leading_digit = write(dir.path(), "2fa.toml", VALID);
        let plain = write(dir.path(), "feature_v2.toml", VALID);

        assert!(!validator.is_eligible(&dotted).await);
        assert!(!validator.is_eligible(&dashed).await);
        assert!(!validator.is_eligible(&leading_digit).await);
        assert!(validator.is_eligible(&plain).await);
    }
}
