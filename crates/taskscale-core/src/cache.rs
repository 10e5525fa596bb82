//! Caller-owned memoization for reports and comparisons.
//!
//! Nothing in the engine reads this cache. A caller that renders the same
//! selection several times keeps a `ReportCache` next to its task list and
//! invalidates it when the list changes.

use std::collections::HashMap;

use crate::aggregator::Dimension;
use crate::chart::fnv1a;

/// Stable key over (task count, dimensions, period labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u64);

impl CacheKey {
    pub fn new(task_count: usize, dimensions: &[Dimension], period_labels: &[&str]) -> Self {
        let mut parts: Vec<String> = Vec::with_capacity(2 + period_labels.len());
        parts.push(task_count.to_string());
        parts.push(
            dimensions
                .iter()
                .map(Dimension::as_str)
                .collect::<Vec<_>>()
                .join(","),
        );
        parts.extend(period_labels.iter().map(|l| l.to_string()));

        // Two independent 32-bit hashes; the separator keeps ("a", "bc") and ("ab", "c") apart
        let joined = parts.join("\u{1f}");
        let high = fnv1a(&joined) as u64;
        let low = fnv1a(&format!("{}\u{1e}", joined)) as u64;
        CacheKey((high << 32) | low)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ReportCache<V> {
    entries: HashMap<CacheKey, V>,
    hits: u64,
    misses: u64,
}

impl<V> Default for ReportCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V> ReportCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        self.entries.insert(key, value);
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: CacheKey, compute: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        use std::collections::hash_map::Entry;

        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                let value = compute()?;
                Ok(entry.insert(value))
            }
        }
    }

    pub fn get_or_insert_with<F>(&mut self, key: CacheKey, compute: F) -> &V
    where
        F: FnOnce() -> V,
    {
        match self.get_or_try_insert_with::<std::convert::Infallible, _>(key, || Ok(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
