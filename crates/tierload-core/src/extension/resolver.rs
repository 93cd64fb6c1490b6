//! File path to dotted module path.

use std::path::{Component, Path, PathBuf};

use crate::config::is_identifier;
use crate::error::{LoaderError, Result};

/// Converts descriptor paths to dotted module paths under a root package.
///
/// `<root>/modules/fun/ping.toml` with package `bot` becomes `bot.modules.fun.ping`.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    package: String,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            package: package.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Dotted prefix shared by every module inside `folder`.
    pub fn folder_prefix(&self, folder: &str) -> String {
        format!("{}.{}", self.package, folder)
    }

    /// Resolve `path` to a module path.
    ///
    /// Fails if `path` is not under the root, or if any directory name or the
    /// file stem is not an identifier.
    pub fn to_module_path(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| LoaderError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })?;

        let mut segments = vec![self.package.clone()];
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            let Component::Normal(part) = component else {
                return Err(LoaderError::InvalidPath(path.to_path_buf()));
            };
            let part = if components.peek().is_none() {
                Path::new(part).file_stem()
            } else {
                Some(part)
            };
            let segment = part
                .and_then(|p| p.to_str())
                .filter(|s| is_identifier(s))
                .ok_or_else(|| LoaderError::InvalidPath(path.to_path_buf()))?;
            segments.push(segment.to_string());
        }

        if segments.len() < 2 {
            return Err(LoaderError::InvalidPath(path.to_path_buf()));
        }
        Ok(segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::guard::is_duplicate;
    use crate::extension::host::StaticHost;

    #[test]
    fn test_module_path() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        let path = Path::new("/srv/bot/modules/fun/ping.toml");
        assert_eq!(resolver.to_module_path(path).unwrap(), "bot.modules.fun.ping");
    }

    #[test]
    fn test_top_level_file() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        let path = Path::new("/srv/bot/plugins/extra.toml");
        assert_eq!(resolver.to_module_path(path).unwrap(), "bot.plugins.extra");
    }

    #[test]
    fn test_outside_root() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        let err = resolver.to_module_path(Path::new("/tmp/ping.toml")).unwrap_err();
        assert!(matches!(err, LoaderError::OutsideRoot { .. }));
    }

    #[test]
    fn test_root_itself_is_invalid() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        let err = resolver.to_module_path(Path::new("/srv/bot")).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidPath(_)));
    }

    #[test]
    fn test_non_identifier_segments_are_invalid() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        for path in [
            "/srv/bot/modules/feature.v2.toml",
            "/srv/bot/modules/my-pack/feature.toml",
            "/srv/bot/modules/v1.0/feature.toml",
        ] {
            let err = resolver.to_module_path(Path::new(path)).unwrap_err();
            assert!(matches!(err, LoaderError::InvalidPath(_)), "accepted: {path}");
        }
    }

    #[test]
    fn test_dotted_stem_cannot_shadow_sibling_package() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        let host = StaticHost::new();
        host.mark_loaded("bot.modules.feature");

        let path = Path::new("/srv/bot/modules/feature_v2.toml");
        let module = resolver.to_module_path(path).unwrap();
        assert_eq!(module, "bot.modules.feature_v2");
        assert!(!is_duplicate(&module, &host));
        assert!(resolver.to_module_path(Path::new("/srv/bot/modules/feature.v2.toml")).is_err());
    }

    #[test]
    fn test_folder_prefix() {
        let resolver = ModuleResolver::new("/srv/bot", "bot");
        assert_eq!(resolver.folder_prefix("handlers"), "bot.handlers");
    }
}
