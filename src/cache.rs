//! TTL-bounded caches kept in the durable local store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::normalize::normalize_whitespace;
use crate::record::{valid_pages, ProductRecord};
use crate::store::{get_json, set_json, KeyValueStore};

pub const PAGES_CACHE_KEY: &str = "sy_pages_cache_v1";
pub const FX_CACHE_KEY: &str = "fx:jpy_eur:v1";

const MAX_CACHE_KEY_CHARS: usize = 220;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagesEntry {
    pub pages: u32,
    pub ts: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxEntry {
    pub rate: f64,
    pub ts: i64,
}

/// Composite key `t:<title>|a:<author>|m:<maker>`; empty when there is no title
pub fn pages_cache_key(record: &ProductRecord) -> String {
    let title = if record.title_jp.trim().is_empty() {
        &record.title_raw
    } else {
        &record.title_jp
    };
    let t = normalize_whitespace(&title.to_lowercase());
    if t.is_empty() {
        return String::new();
    }
    let a = normalize_whitespace(&record.author.as_deref().unwrap_or_default().to_lowercase());
    let m = normalize_whitespace(&record.maker.as_deref().unwrap_or_default().to_lowercase());
    format!("t:{}|a:{}|m:{}", t, a, m)
        .chars()
        .take(MAX_CACHE_KEY_CHARS)
        .collect()
}

/// Page-count resolutions keyed by [`pages_cache_key`]
#[derive(Clone)]
pub struct PagesCache {
    store: Arc<dyn KeyValueStore>,
    ttl_ms: i64,
}

impl PagesCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_ms: i64) -> Self {
        Self { store, ttl_ms }
    }

    fn load(&self) -> Result<HashMap<String, PagesEntry>> {
        Ok(get_json(self.store.as_ref(), PAGES_CACHE_KEY)?.unwrap_or_default())
    }

    /// Cached count for a key, unless older than the TTL
    pub fn get(&self, key: &str, now_ms: i64) -> Result<Option<u32>> {
        if key.is_empty() {
            return Ok(None);
        }
        let hit = self.load()?.get(key).copied();
        Ok(hit
            .filter(|e| now_ms - e.ts <= self.ttl_ms)
            .map(|e| e.pages)
            .filter(|&n| valid_pages(n)))
    }

    pub fn put(&self, key: &str, pages: u32, now_ms: i64) -> Result<()> {
        if key.is_empty() || !valid_pages(pages) {
            return Ok(());
        }
        // re-read right before writing; another render may have added entries
        let mut cache = self.load()?;
        cache.insert(key.to_string(), PagesEntry { pages, ts: now_ms });
        set_json(self.store.as_ref(), PAGES_CACHE_KEY, &cache)
    }
}

/// The single JPY→EUR rate slot
#[derive(Clone)]
pub struct FxCache {
    store: Arc<dyn KeyValueStore>,
    max_age_ms: i64,
}

impl FxCache {
    pub fn new(store: Arc<dyn KeyValueStore>, max_age_ms: i64) -> Self {
        Self { store, max_age_ms }
    }

    pub fn get(&self, now_ms: i64) -> Result<Option<f64>> {
        let entry: Option<FxEntry> = get_json(self.store.as_ref(), FX_CACHE_KEY)?;
        Ok(entry
            .filter(|e| e.rate.is_finite() && e.rate > 0.0)
            .filter(|e| now_ms - e.ts < self.max_age_ms)
            .map(|e| e.rate))
    }

    pub fn put(&self, rate: f64, now_ms: i64) -> Result<()> {
        set_json(self.store.as_ref(), FX_CACHE_KEY, &FxEntry { rate, ts: now_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn record(title: &str, jp: &str) -> ProductRecord {
        ProductRecord {
            title_raw: title.into(),
            title_jp: jp.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_key_shape() {
        assert_eq!(pages_cache_key(&record("Foo", "")), "t:foo|a:|m:");
        let mut r = record("Foo", " バー  本 ");
        r.author = Some("Ito  Jun".into());
        r.maker = Some("Kadokawa".into());
        assert_eq!(pages_cache_key(&r), "t:バー 本|a:ito jun|m:kadokawa");
        assert_eq!(pages_cache_key(&record("  ", "")), "");
        assert_eq!(pages_cache_key(&record(&"x".repeat(500), "")).chars().count(), 220);
    }

    #[test]
    fn test_pages_ttl() {
        let cache = PagesCache::new(Arc::new(MemoryStore::new()), 30 * DAY_MS);
        cache.put("t:foo|a:|m:", 160, 0).unwrap();
        assert_eq!(cache.get("t:foo|a:|m:", 29 * DAY_MS).unwrap(), Some(160));
        assert_eq!(cache.get("t:foo|a:|m:", 31 * DAY_MS).unwrap(), None);
        assert_eq!(cache.get("t:bar|a:|m:", 0).unwrap(), None);
    }

    #[test]
    fn test_pages_put_keeps_other_entries() {
        let cache = PagesCache::new(Arc::new(MemoryStore::new()), DAY_MS);
        cache.put("a", 10, 0).unwrap();
        cache.put("b", 20, 0).unwrap();
        cache.put("c", 0, 0).unwrap();
        assert_eq!(cache.get("a", 1).unwrap(), Some(10));
        assert_eq!(cache.get("b", 1).unwrap(), Some(20));
        assert_eq!(cache.get("c", 1).unwrap(), None);
    }

    #[test]
    fn test_fx_ttl() {
        let cache = FxCache::new(Arc::new(MemoryStore::new()), DAY_MS);
        assert_eq!(cache.get(0).unwrap(), None);
        cache.put(0.0061, 100).unwrap();
        assert_eq!(cache.get(100 + DAY_MS - 1).unwrap(), Some(0.0061));
        assert_eq!(cache.get(100 + DAY_MS).unwrap(), None);
    }
}
