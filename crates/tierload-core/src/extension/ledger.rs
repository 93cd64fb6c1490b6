//! Per-run record of module load durations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::host::is_within;

/// Module path to load duration.
///
/// Cloning shares the underlying map. Each module is written by at most one
/// task, so concurrent inserts never touch the same key.
#[derive(Debug, Clone, Default)]
pub struct LoadLedger {
    entries: Arc<Mutex<HashMap<String, Duration>>>,
}

impl LoadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, module_path: impl Into<String>, duration: Duration) {
        self.entries.lock().insert(module_path.into(), duration);
    }

    pub fn get(&self, module_path: &str) -> Option<Duration> {
        self.entries.lock().get(module_path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of recorded modules equal to or nested under `prefix`.
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .keys()
            .filter(|path| is_within(path, prefix))
            .count()
    }

    /// Entries under `prefix` that took longer than `threshold`, slowest first.
    pub fn slow_entries(&self, prefix: &str, threshold: Duration) -> Vec<(String, Duration)> {
        let mut slow: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|(path, duration)| is_within(path, prefix) && **duration > threshold)
            .map(|(path, duration)| (path.clone(), *duration))
            .collect();
        slow.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        slow
    }

    /// Copy of every entry, sorted by module path.
    pub fn snapshot(&self) -> Vec<(String, Duration)> {
        let mut all: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(path, duration)| (path.clone(), *duration))
            .collect();
        all.sort();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_count() {
        let ledger = LoadLedger::new();
        ledger.record("bot.modules.fun.ping", Duration::from_millis(5));
        ledger.record("bot.modules.admin.kick", Duration::from_millis(5));
        ledger.record("bot.modules_extra.x", Duration::from_millis(5));
        ledger.record("bot.handlers.error", Duration::from_millis(5));

        assert_eq!(ledger.count_with_prefix("bot.modules"), 2);
        assert_eq!(ledger.count_with_prefix("bot.handlers"), 1);
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_slow_entries_sorted() {
        let ledger = LoadLedger::new();
        ledger.record("bot.modules.a", Duration::from_millis(1500));
        ledger.record("bot.modules.b", Duration::from_millis(900));
        ledger.record("bot.modules.c", Duration::from_secs(3));
        ledger.record("bot.plugins.d", Duration::from_secs(5));

        let slow = ledger.slow_entries("bot.modules", Duration::from_secs(1));
        let names: Vec<_> = slow.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["bot.modules.c", "bot.modules.a"]);
    }

    #[test]
    fn test_clones_share_entries() {
        let ledger = LoadLedger::new();
        let handle = ledger.clone();
        handle.record("bot.modules.a", Duration::ZERO);
        assert_eq!(ledger.get("bot.modules.a"), Some(Duration::ZERO));
    }
}
