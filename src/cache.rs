use std::time::Duration;

use moka::sync::Cache;

const TTL_SECONDS: u64 = 60 * 60 * 24;
const MAX_CAPACITY: u64 = 100_000;

/// TTL cache over `(symbol, timestamp)` keys that have already been written.
///
/// Owned by one `Ingestor` rather than shared globally, so concurrent or
/// repeated runs stay independent of each other.
pub struct TtlCache {
    inner: Cache<String, ()>,
}

impl TtlCache {
    pub fn new() -> Self {
        TtlCache {
            inner: Cache::builder()
                .max_capacity(MAX_CAPACITY)
                .time_to_live(Duration::from_secs(TTL_SECONDS))
                .build(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn set(&self, key: String) {
        self.inner.insert(key, ());
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
