//! Opt-in memoization of idempotent reads.
//!
//! An explicit capability object, created once per client and passed in —
//! not a module-level singleton. Each cached resource family carries a
//! generation counter; `invalidate` bumps it atomically, so a reader that
//! starts after a write observes the bump (happens-before via the atomic).
//! Entries stamped with an older generation are treated as absent.
//!
//! Default is disabled: every read goes to the collaborator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFamily {
    Profile,
    VaultContext,
    Membership,
}

impl CacheFamily {
    fn index(self) -> usize {
        match self {
            CacheFamily::Profile => 0,
            CacheFamily::VaultContext => 1,
            CacheFamily::Membership => 2,
        }
    }
}

const FAMILY_COUNT: usize = 3;

struct Entry {
    family: CacheFamily,
    generation: u64,
    value: Value,
}

struct Inner {
    enabled: AtomicBool,
    generations: [AtomicU64; FAMILY_COUNT],
    entries: Mutex<HashMap<String, Entry>>,
}

/// Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

impl Cache {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                enabled: AtomicBool::new(enabled),
                generations: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn get(&self, family: CacheFamily, key: &str) -> Option<Value> {
        if !self.is_enabled() {
            return None;
        }
        let current = self.inner.generations[family.index()].load(Ordering::SeqCst);
        let entries = self.inner.entries.lock().expect("cache lock poisoned");
        entries
            .get(key)
            .filter(|e| e.family == family && e.generation == current)
            .map(|e| e.value.clone())
    }

    pub fn set(&self, family: CacheFamily, key: &str, value: Value) {
        if !self.is_enabled() {
            return;
        }
        let generation = self.inner.generations[family.index()].load(Ordering::SeqCst);
        let mut entries = self.inner.entries.lock().expect("cache lock poisoned");
        entries.insert(key.to_string(), Entry { family, generation, value });
    }

    /// Bust every entry of a family. Safe to call from any write path.
    pub fn invalidate(&self, family: CacheFamily) {
        self.inner.generations[family.index()].fetch_add(1, Ordering::SeqCst);
        tracing::debug!(?family, "cache family invalidated");
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = Cache::default();
        cache.set(CacheFamily::Profile, "profile:a", json!({"name": "Ada"}));
        assert_eq!(cache.get(CacheFamily::Profile, "profile:a"), None);
    }

    #[test]
    fn enabled_cache_round_trips() {
        let cache = Cache::new(true);
        cache.set(CacheFamily::VaultContext, "vault-context:v1", json!({"id": "v1"}));
        assert_eq!(
            cache.get(CacheFamily::VaultContext, "vault-context:v1"),
            Some(json!({"id": "v1"}))
        );
    }

    #[test]
    fn invalidation_is_family_scoped() {
        let cache = Cache::new(true);
        cache.set(CacheFamily::Profile, "profile:a", json!(1));
        cache.set(CacheFamily::VaultContext, "vault-context:v1", json!(2));

        cache.invalidate(CacheFamily::Profile);

        assert_eq!(cache.get(CacheFamily::Profile, "profile:a"), None);
        assert_eq!(cache.get(CacheFamily::VaultContext, "vault-context:v1"), Some(json!(2)));
    }

    #[test]
    fn stale_generation_never_resurfaces() {
        let cache = Cache::new(true);
        cache.set(CacheFamily::Membership, "membership:m1", json!("old"));
        cache.invalidate(CacheFamily::Membership);
        cache.set(CacheFamily::Membership, "membership:m1", json!("new"));
        assert_eq!(cache.get(CacheFamily::Membership, "membership:m1"), Some(json!("new")));
    }

    #[test]
    fn clones_share_state() {
        let cache = Cache::new(true);
        let clone = cache.clone();
        cache.set(CacheFamily::Profile, "profile:a", json!(1));
        assert_eq!(clone.get(CacheFamily::Profile, "profile:a"), Some(json!(1)));
        clone.invalidate(CacheFamily::Profile);
        assert_eq!(cache.get(CacheFamily::Profile, "profile:a"), None);
    }
}
