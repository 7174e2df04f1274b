use std::collections::{HashMap, hash_map};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A sanitized channel, keyed by its playable address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Display name, empty when unknown
    pub name: String,
    pub address: String,
}

impl Entry {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// How a name is chosen when the same address is seen more than once.
///
/// An empty stored name is always upgraded by a non-empty one, and an empty incoming
/// name never overwrites anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MergePolicy {
    /// Keep the first non-empty name
    #[default]
    FirstNonEmpty,
    /// Replace the stored name with any newer non-empty name
    LatestNonEmpty,
}

/// Address-keyed accumulator that remembers the order addresses were first seen in
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    policy: MergePolicy,
    index: HashMap<String, usize>,
    entries: Vec<Entry>,
}

impl ResultSet {
    #[must_use]
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Merges an entry in, returning `true` when the set changed
    pub fn merge(&mut self, entry: Entry) -> bool {
        match self.index.entry(entry.address) {
            hash_map::Entry::Vacant(slot) => {
                self.entries.push(Entry {
                    name: entry.name,
                    address: slot.key().clone(),
                });
                slot.insert(self.entries.len() - 1);
                true
            }
            hash_map::Entry::Occupied(slot) => {
                let stored = &mut self.entries[*slot.get()].name;
                let replace = !entry.name.is_empty()
                    && *stored != entry.name
                    && (stored.is_empty() || self.policy == MergePolicy::LatestNonEmpty);
                if replace {
                    *stored = entry.name;
                }
                replace
            }
        }
    }

    /// Name stored for an address, if it has been seen
    #[must_use]
    pub fn get(&self, address: &str) -> Option<&str> {
        self.index
            .get(address)
            .map(|&i| self.entries[i].name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen address order
    #[must_use]
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl Extend<Entry> for ResultSet {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        for entry in iter {
            self.merge(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "http://x/1.m3u8";

    fn merged(policy: MergePolicy, names: &[&str]) -> ResultSet {
        let mut set = ResultSet::new(policy);
        set.extend(names.iter().map(|name| Entry::new(*name, ADDR)));
        set
    }

    #[test]
    fn non_empty_name_upgrades_empty() {
        assert_eq!(merged(MergePolicy::FirstNonEmpty, &["", "Foo"]).get(ADDR), Some("Foo"));
    }

    #[test]
    fn empty_name_never_overwrites() {
        assert_eq!(merged(MergePolicy::FirstNonEmpty, &["Foo", ""]).get(ADDR), Some("Foo"));
        assert_eq!(merged(MergePolicy::LatestNonEmpty, &["Foo", ""]).get(ADDR), Some("Foo"));
    }

    #[test]
    fn first_non_empty_name_wins() {
        assert_eq!(merged(MergePolicy::FirstNonEmpty, &["Foo", "Bar"]).get(ADDR), Some("Foo"));
        assert_eq!(
            merged(MergePolicy::FirstNonEmpty, &["", "Foo", "", "Bar"]).get(ADDR),
            Some("Foo")
        );
    }

    #[test]
    fn latest_policy_prefers_fresh_names() {
        assert_eq!(merged(MergePolicy::LatestNonEmpty, &["Foo", "Bar"]).get(ADDR), Some("Bar"));
    }

    #[test]
    fn merging_twice_is_idempotent() {
        for policy in [MergePolicy::FirstNonEmpty, MergePolicy::LatestNonEmpty] {
            let mut once = ResultSet::new(policy);
            once.merge(Entry::new("", "http://a"));
            let mut twice = once.clone();

            assert!(once.merge(Entry::new("Foo", ADDR)));
            assert!(twice.merge(Entry::new("Foo", ADDR)));
            assert!(!twice.merge(Entry::new("Foo", ADDR)));

            assert_eq!(once.into_entries(), twice.into_entries());
        }
    }

    #[test]
    fn one_key_per_distinct_address() {
        let mut set = ResultSet::default();
        for i in 0..30 {
            set.merge(Entry::new(format!("ch{i}"), format!("http://x/{}", i % 7)));
        }
        assert_eq!(set.len(), 7);
        assert_eq!(set.get("http://x/3"), Some("ch3"));
    }

    #[test]
    fn keeps_first_seen_order() {
        let mut set = ResultSet::default();
        set.extend([
            Entry::new("", "http://b"),
            Entry::new("A", "http://a"),
            Entry::new("B", "http://b"),
            Entry::new("C", "http://c"),
        ]);
        assert_eq!(
            set.into_entries(),
            vec![
                Entry::new("B", "http://b"),
                Entry::new("A", "http://a"),
                Entry::new("C", "http://c"),
            ]
        );
    }
}
