//! The process-wide memoization cache, keyed by `(type, name, version)`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::node::CacheKey;

/// Memoized node outputs, keyed by [`CacheKey`].
///
/// Owned by whichever coordinator is currently running; a caller that wants
/// memoization to span multiple [`crate::Scheduler::execute`] calls within
/// the same process keeps the [`ResultCache`] returned by one run and hands
/// it to the next, rather than this type being a shared, lock-guarded
/// singleton.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: BTreeMap<CacheKey, Value>,
}

impl ResultCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a memoized result.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Records a node's output.
    pub fn insert(&mut self, key: CacheKey, value: Value) {
        self.entries.insert(key, value);
    }

    /// Drops every memoized entry for `name`, regardless of kind or
    /// version. Called when a module's source paths or dependency versions
    /// change (observed via file-watch or an explicit invalidation from the
    /// module configurator), which changes its version and so would orphan
    /// entries keyed under the old one, but a caller may also want to evict
    /// proactively.
    pub fn invalidate(&mut self, name: &str) {
        self.entries.retain(|key, _| key.name != name);
    }

    /// The number of memoized entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn round_trips_and_invalidates_by_name() {
        let mut cache = ResultCache::new();
        let key = CacheKey { kind: NodeKind::Build, name: "web".to_string(), version: "v-1".to_string() };
        cache.insert(key.clone(), json!({ "ok": true }));
        assert_eq!(cache.get(&key), Some(&json!({ "ok": true })));

        cache.invalidate("web");
        assert_eq!(cache.get(&key), None);
    }
}
