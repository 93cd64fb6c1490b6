//! Duplicate-load guard.

use tracing::warn;

use super::host::ModuleRegistry;

/// True if `module_path` or any ancestor package of it is already registered.
///
/// Checks the full path first, then each shorter prefix down to two
/// segments. The bare root package is never checked.
pub fn is_duplicate<R>(module_path: &str, registry: &R) -> bool
where
    R: ModuleRegistry + ?Sized,
{
    let segments: Vec<&str> = module_path.split('.').collect();
    for len in (2..=segments.len()).rev() {
        let prefix = segments[..len].join(".");
        if registry.is_loaded(&prefix) {
            if prefix == module_path {
                warn!(module = %module_path, "Skipping extension that is already loaded");
            } else {
                warn!(module = %module_path, ancestor = %prefix, "Skipping extension whose package is already loaded");
            }
            return true;
        }
    }
    false
}
