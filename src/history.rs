use std::sync::Arc;

use crate::error::Result;
use crate::record::{HistoryEntry, ProductRecord};
use crate::store::{get_json, set_json, KeyValueStore};

pub const HISTORY_KEY: &str = "searchHistory:v1";

/// Newest-first, URL-unique, bounded search history
#[derive(Clone)]
pub struct History {
    store: Arc<dyn KeyValueStore>,
    limit: usize,
}

impl History {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    pub fn load(&self) -> Result<Vec<HistoryEntry>> {
        Ok(get_json(self.store.as_ref(), HISTORY_KEY)?.unwrap_or_default())
    }

    fn save(&self, mut entries: Vec<HistoryEntry>) -> Result<Vec<HistoryEntry>> {
        entries.truncate(self.limit);
        set_json(self.store.as_ref(), HISTORY_KEY, &entries)?;
        Ok(entries)
    }

    /// Put a record's entry at the front, replacing any entry with the same URL
    pub fn push(&self, record: &ProductRecord) -> Result<Vec<HistoryEntry>> {
        if record.url.is_empty() {
            return self.load();
        }
        let entry = HistoryEntry::from(record);
        let mut next = vec![entry];
        next.extend(
            self.load()?
                .into_iter()
                .filter(|e| !e.url.is_empty() && e.url != record.url),
        );
        self.save(next)
    }

    pub fn remove(&self, url: &str) -> Result<Vec<HistoryEntry>> {
        let next = self.load()?.into_iter().filter(|e| e.url != url).collect();
        self.save(next)
    }

    pub fn clear(&self) -> Result<()> {
        set_json(self.store.as_ref(), HISTORY_KEY, &Vec::<HistoryEntry>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(url: &str, title: &str) -> ProductRecord {
        ProductRecord {
            url: url.into(),
            title_raw: title.into(),
            cover_url: "https://c/x.jpg".into(),
            detected_at: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_dedup_moves_to_front() {
        let history = History::new(Arc::new(MemoryStore::new()), 10);
        history.push(&record("a", "A")).unwrap();
        history.push(&record("b", "B")).unwrap();
        let entries = history.push(&record("a", "A2")).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "a");
        assert_eq!(entries[0].title_raw, "A2");
        assert_eq!(entries[1].url, "b");
        assert_eq!(history.load().unwrap(), entries);
    }

    #[test]
    fn test_capped_length() {
        let history = History::new(Arc::new(MemoryStore::new()), 3);
        for i in 0..5 {
            history.push(&record(&format!("u{i}"), "T")).unwrap();
        }
        let entries = history.load().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].url, "u4");
        assert_eq!(entries[2].url, "u2");
    }

    #[test]
    fn test_remove_and_clear() {
        let history = History::new(Arc::new(MemoryStore::new()), 10);
        history.push(&record("a", "A")).unwrap();
        history.push(&record("b", "B")).unwrap();
        history.push(&record("c", "C")).unwrap();

        let entries = history.remove("b").unwrap();
        let urls: Vec<_> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["c", "a"]);

        history.clear().unwrap();
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn test_empty_url_ignored() {
        let history = History::new(Arc::new(MemoryStore::new()), 10);
        assert!(history.push(&record("", "A")).unwrap().is_empty());
    }
}
