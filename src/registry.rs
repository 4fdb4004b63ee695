//! Pattern-to-subscriber table shared by publishers and subscribers.

use crate::pattern::Pattern;
use crate::subscriber::Subscriber;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Subscribers registered under one pattern string.
struct PatternEntry {
    pattern: Pattern,
    /// Position in first-registration order across patterns.
    order: u64,
    subscribers: Vec<Subscriber>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, PatternEntry>,
    next_order: u64,
}

/// Concurrency-safe mapping from pattern string to an ordered subscriber list.
///
/// Every mutation holds the write lock for its whole read-modify-write, so
/// concurrent registrations are never lost. Readers take the read lock and
/// copy handles out; nothing is ever invoked while the lock is held.
#[derive(Default)]
pub struct Registry {
    table: RwLock<Table>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber under `pattern`, creating the entry if needed.
    pub fn register(&self, pattern: &str, subscriber: Subscriber) {
        let mut table = self.table.write();
        let Table {
            entries,
            next_order,
        } = &mut *table;

        entries
            .entry(pattern.to_string())
            .or_insert_with(|| {
                let order = *next_order;
                *next_order += 1;
                PatternEntry {
                    pattern: Pattern::compile(pattern),
                    order,
                    subscribers: Vec::new(),
                }
            })
            .subscribers
            .push(subscriber);
    }

    /// Remove every subscriber under `pattern`. Returns how many were removed.
    pub fn unregister_all(&self, pattern: &str) -> usize {
        self.table
            .write()
            .entries
            .remove(pattern)
            .map_or(0, |entry| entry.subscribers.len())
    }

    /// Remove the named subscribers under `pattern` whose identity matches
    /// one of `subscribers`. Anonymous subscribers are never removed here.
    pub fn unregister_by_identity(&self, pattern: &str, subscribers: &[Subscriber]) -> usize {
        let names: Vec<&str> = subscribers.iter().filter_map(Subscriber::name).collect();
        self.unregister_names(pattern, &names)
    }

    /// Remove the subscribers under `pattern` whose name is in `names`.
    ///
    /// The entry is dropped once its last subscriber is gone.
    pub fn unregister_names(&self, pattern: &str, names: &[&str]) -> usize {
        if names.is_empty() {
            return 0;
        }

        let mut table = self.table.write();
        let Some(entry) = table.entries.get_mut(pattern) else {
            return 0;
        };

        let before = entry.subscribers.len();
        entry
            .subscribers
            .retain(|sub| !sub.name().is_some_and(|name| names.contains(&name)));
        let removed = before - entry.subscribers.len();

        if entry.subscribers.is_empty() {
            table.entries.remove(pattern);
        }

        removed
    }

    /// Subscribers of every pattern matching `name`, in discovery order:
    /// patterns by first registration, subscribers by insertion.
    ///
    /// A subscriber registered under several matching patterns appears once
    /// per pattern.
    pub fn matching(&self, name: &str) -> Vec<Subscriber> {
        let table = self.table.read();

        let mut hits: Vec<&PatternEntry> = table
            .entries
            .values()
            .filter(|entry| entry.pattern.matches(name))
            .collect();
        hits.sort_by_key(|entry| entry.order);

        hits.into_iter()
            .flat_map(|entry| entry.subscribers.iter().cloned())
            .collect()
    }

    /// Copy of the table for inspection.
    pub fn snapshot(&self) -> HashMap<String, Vec<Subscriber>> {
        self.table
            .read()
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.subscribers.clone()))
            .collect()
    }

    /// Registered patterns in first-registration order.
    pub fn patterns(&self) -> Vec<Pattern> {
        let table = self.table.read();
        let mut entries: Vec<&PatternEntry> = table.entries.values().collect();
        entries.sort_by_key(|entry| entry.order);
        entries.into_iter().map(|entry| entry.pattern.clone()).collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn subscriber_count(&self, pattern: &str) -> usize {
        self.table
            .read()
            .entries
            .get(pattern)
            .map_or(0, |entry| entry.subscribers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn anon() -> Subscriber {
        Subscriber::new(|_e: &Event| Ok(()))
    }

    fn named(name: &str) -> Subscriber {
        Subscriber::named(name, |_e: &Event| Ok(()))
    }

    fn names(subs: &[Subscriber]) -> Vec<Option<&str>> {
        subs.iter().map(Subscriber::name).collect()
    }

    #[test]
    fn test_register_appends_in_order() {
        let registry = Registry::new();
        registry.register("x", named("a"));
        registry.register("x", named("b"));
        registry.register("y", named("c"));

        assert_eq!(registry.pattern_count(), 2);
        assert_eq!(registry.subscriber_count("x"), 2);

        let snapshot = registry.snapshot();
        assert_eq!(names(&snapshot["x"]), vec![Some("a"), Some("b")]);
        assert_eq!(names(&snapshot["y"]), vec![Some("c")]);
    }

    #[test]
    fn test_unregister_all() {
        let registry = Registry::new();
        registry.register("x", anon());
        registry.register("x", named("a"));

        assert_eq!(registry.unregister_all("x"), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.unregister_all("x"), 0);
    }

    #[test]
    fn test_unregister_by_identity_keeps_anonymous() {
        let registry = Registry::new();
        registry.register("x", named("a"));
        registry.register("x", anon());
        registry.register("x", named("b"));
        registry.register("x", named("c"));

        let removed = registry.unregister_by_identity("x", &[named("a"), named("c"), anon()]);
        assert_eq!(removed, 2);

        let snapshot = registry.snapshot();
        assert_eq!(names(&snapshot["x"]), vec![None, Some("b")]);
    }

    #[test]
    fn test_unregister_last_identity_clears_pattern() {
        let registry = Registry::new();
        registry.register("x", named("a"));
        registry.register("x", named("b"));

        registry.unregister_by_identity("x", &[named("a"), named("b")]);
        assert!(!registry.snapshot().contains_key("x"));
        assert_eq!(registry.pattern_count(), 0);
    }

    #[test]
    fn test_unregister_by_identity_noops() {
        let registry = Registry::new();
        registry.register("x", anon());
        registry.register("x", named("a"));

        // Only anonymous subscribers given.
        assert_eq!(registry.unregister_by_identity("x", &[anon()]), 0);
        // Unknown pattern.
        assert_eq!(registry.unregister_by_identity("y", &[named("a")]), 0);
        // Unknown name.
        assert_eq!(registry.unregister_names("x", &["zzz"]), 0);

        assert_eq!(registry.subscriber_count("x"), 2);
    }

    #[test]
    fn test_duplicate_names_all_removed() {
        let registry = Registry::new();
        registry.register("x", named("a"));
        registry.register("x", named("a"));
        registry.register("x", anon());

        assert_eq!(registry.unregister_names("x", &["a"]), 2);
        assert_eq!(registry.subscriber_count("x"), 1);
    }

    #[test]
    fn test_matching_order_and_fanout() {
        let registry = Registry::new();
        registry.register("user.*", named("prefix"));
        registry.register("*.paid", named("suffix"));
        registry.register("order.paid", named("exact"));
        registry.register("*", named("all"));

        let shared = named("shared");
        registry.register("user.paid", shared.clone());
        registry.register("user.*", shared);

        let hits = registry.matching("user.paid");
        assert_eq!(
            names(&hits),
            vec![
                Some("prefix"),
                Some("shared"),
                Some("suffix"),
                Some("all"),
                Some("shared"),
            ]
        );

        assert_eq!(names(&registry.matching("nothing")), vec![Some("all")]);
    }

    #[test]
    fn test_patterns_in_registration_order() {
        let registry = Registry::new();
        registry.register("b", anon());
        registry.register("a", anon());
        registry.register("b", anon());

        let patterns: Vec<String> = registry
            .patterns()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        assert_eq!(patterns, vec!["b", "a"]);
    }
}
