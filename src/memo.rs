// src/memo.rs
//! Time-boxed in-memory memoization (absolute TTL, no sliding refresh).

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, Local};

#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (DateTime<Local>, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Value stored under `key` if it was inserted less than `ttl` ago.
    /// Expired entries are evicted on access.
    pub fn get(&mut self, key: &K, now: DateTime<Local>) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some((at, _)) => now.signed_duration_since(*at) >= self.ttl,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(_, v)| v.clone())
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Local>) {
        self.entries.insert(key, (now, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hit_inside_ttl_miss_after() {
        let mut c: TtlCache<&str, u32> = TtlCache::new(Duration::minutes(5));
        let t0 = Local.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        c.insert("work", 14, t0);

        assert_eq!(c.get(&"work", t0 + Duration::seconds(299)), Some(14));
        assert_eq!(c.get(&"work", t0 + Duration::minutes(5)), None);
        // evicted
        assert!(c.is_empty());
    }

    #[test]
    fn reinsert_refreshes_timestamp() {
        let mut c: TtlCache<String, u32> = TtlCache::new(Duration::minutes(5));
        let t0 = Local.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        c.insert("k".into(), 1, t0);
        c.insert("k".into(), 2, t0 + Duration::minutes(4));
        assert_eq!(c.get(&"k".to_string(), t0 + Duration::minutes(8)), Some(2));
        assert_eq!(c.len(), 1);
    }
}
