//! Directory-based load priority.

use std::collections::{BTreeMap, HashMap};

use super::scanner::Candidate;
use crate::config::defaults;

/// Priority used for directories missing from the table.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Maps a candidate's parent-directory name to a priority. Higher loads first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    entries: HashMap<String, i32>,
}

impl PriorityTable {
    pub fn new(entries: HashMap<String, i32>) -> Self {
        Self { entries }
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        defaults::PRIORITIES
            .iter()
            .map(|(name, priority)| (name.to_string(), *priority))
            .collect()
    }

    pub fn priority(&self, candidate: &Candidate) -> i32 {
        self.priority_of(&candidate.parent)
    }

    pub fn priority_of(&self, directory: &str) -> i32 {
        self.entries.get(directory).copied().unwrap_or(DEFAULT_PRIORITY)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FromIterator<(String, i32)> for PriorityTable {
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<&BTreeMap<String, i32>> for PriorityTable {
    fn from(map: &BTreeMap<String, i32>) -> Self {
        map.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_default() {
        let table = PriorityTable::builtin();
        let admin = Candidate::from_path("/bot/modules/admin/kick.toml").unwrap();
        let misc = Candidate::from_path("/bot/modules/misc/hello.toml").unwrap();

        assert_eq!(table.priority(&admin), 80);
        assert_eq!(table.priority(&misc), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_from_config_map() {
        let map: BTreeMap<String, i32> = [("fun".to_string(), 99)].into();
        let table = PriorityTable::from(&map);
        assert_eq!(table.priority_of("fun"), 99);
        assert_eq!(table.priority_of("services"), 0);
    }
}
