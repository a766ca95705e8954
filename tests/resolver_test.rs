//! Page-count resolution against canned catalog responses.

use std::sync::{Arc, Mutex};

use artbook_lens::cache::{pages_cache_key, PagesCache, PAGES_CACHE_KEY};
use artbook_lens::error::{LensError, Result};
use artbook_lens::fetch::{FetchedBytes, Fetcher};
use artbook_lens::record::ProductRecord;
use artbook_lens::resolve::PageCountResolver;
use artbook_lens::store::{KeyValueStore, MemoryStore};

const NOW: i64 = 1_700_000_000_000;
const TTL: i64 = 30 * 24 * 60 * 60 * 1000;

const NO_VOLUMES: &str = r#"{"kind":"books#volumes","totalItems":0}"#;
const NO_ENTITIES: &str = r#"{"search":[]}"#;

/// Answers by URL substring, in table order; records every request
struct CannedFetcher {
    responses: Vec<(&'static str, &'static str)>,
    requested: Mutex<Vec<String>>,
}

impl CannedFetcher {
    fn new(responses: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            responses,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for CannedFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses
            .iter()
            .find(|(needle, _)| url.contains(needle))
            .map(|(_, body)| body.to_string())
            .ok_or_else(|| LensError::HostError("offline".into()))
    }

    fn get_bytes(&self, _url: &str, _limit: u64) -> Result<FetchedBytes> {
        Err(LensError::HostError("offline".into()))
    }
}

fn record(title: &str, author: Option<&str>, maker: Option<&str>) -> ProductRecord {
    ProductRecord {
        url: "https://www.suruga-ya.com/en/product/1".into(),
        cover_url: "https://cdn.suruga-ya.jp/cover/1.jpg".into(),
        title_raw: title.into(),
        author: author.map(String::from),
        maker: maker.map(String::from),
        ..Default::default()
    }
}

fn resolver(fetcher: Arc<CannedFetcher>) -> (PageCountResolver, PagesCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let cache = PagesCache::new(store.clone(), TTL);
    (PageCountResolver::new(cache.clone(), fetcher), cache, store)
}

#[test]
fn test_best_scoring_volume_wins_and_is_cached() {
    let volumes = r#"{"items":[
        {"volumeInfo":{"title":"Starlight","pageCount":100}},
        {"volumeInfo":{"title":"Starlight Memories","authors":["Aoi Ito"],
                       "publisher":"Foo Works","pageCount":192}},
        {"volumeInfo":{"title":"Starlight Memories Deluxe"}}
    ]}"#;
    let fetcher = Arc::new(CannedFetcher::new(vec![("googleapis.com/books", volumes)]));
    let (resolver, cache, store) = resolver(fetcher.clone());
    let rec = record("Starlight Memories", Some("Aoi Ito"), Some("Foo Works"));

    assert_eq!(resolver.resolve(&rec, NOW), Some(192));
    assert!(fetcher.requested().iter().all(|u| !u.contains("wikidata")));

    assert_eq!(cache.get(&pages_cache_key(&rec), NOW + 1).unwrap(), Some(192));
    let stored = store.get(PAGES_CACHE_KEY).unwrap().expect("cache written");
    assert_eq!(stored[pages_cache_key(&rec)]["pages"], 192);
    assert_eq!(stored[pages_cache_key(&rec)]["ts"], NOW);
}

#[test]
fn test_weak_volume_match_rejected() {
    // 1 of 4 title tokens shared: 0.25 * 0.65 is under the acceptance threshold
    let volumes = r#"{"items":[{"volumeInfo":{"title":"Starlight","pageCount":100}}]}"#;
    let fetcher = Arc::new(CannedFetcher::new(vec![
        ("googleapis.com/books", volumes),
        ("wbsearchentities", NO_ENTITIES),
    ]));
    let (resolver, _, store) = resolver(fetcher.clone());
    let rec = record("Starlight Memories Art Works", None, None);

    assert_eq!(resolver.resolve(&rec, NOW), None);
    assert!(fetcher.requested().iter().any(|u| u.contains("wbsearchentities")));
    assert!(store.get(PAGES_CACHE_KEY).unwrap().is_none());
}

#[test]
fn test_author_lifts_partial_title_over_threshold() {
    // title 2/4 * 0.65 + author 1.0 * 0.25 = 0.575
    let volumes = r#"{"items":[{"volumeInfo":{"title":"Starlight Memories",
        "authors":["Aoi Ito"],"pageCount":160}}]}"#;
    let fetcher = Arc::new(CannedFetcher::new(vec![("googleapis.com/books", volumes)]));
    let (resolver, _, _) = resolver(fetcher);
    let rec = record("Starlight Memories Art Works", Some("Aoi Ito"), None);

    assert_eq!(resolver.resolve(&rec, NOW), Some(160));
}

#[test]
fn test_entity_fallback_takes_first_valid_page_claim() {
    let search = r#"{"search":[{"id":"Q1"},{"id":"Q2"},{"id":"Q3"}]}"#;
    let q1 = r#"{"entities":{"Q1":{"claims":{"P1104":[
        {"mainsnak":{"datavalue":{"value":{"amount":"+60000"}}}}]}}}}"#;
    let q2 = r#"{"entities":{"Q2":{"claims":{"P1104":[
        {"mainsnak":{"datavalue":{"value":{"amount":"+224","unit":"1"}}}}]}}}}"#;
    let q3 = r#"{"entities":{"Q3":{"claims":{"P1104":[
        {"mainsnak":{"datavalue":{"value":{"amount":"+96"}}}}]}}}}"#;
    let fetcher = Arc::new(CannedFetcher::new(vec![
        ("googleapis.com/books", NO_VOLUMES),
        ("wbsearchentities", search),
        ("ids=Q1", q1),
        ("ids=Q2", q2),
        ("ids=Q3", q3),
    ]));
    let (resolver, cache, _) = resolver(fetcher.clone());
    let rec = record("Starlight Memories", None, None);

    assert_eq!(resolver.resolve(&rec, NOW), Some(224));
    assert_eq!(cache.get(&pages_cache_key(&rec), NOW).unwrap(), Some(224));

    let requested = fetcher.requested();
    assert!(requested[0].contains("googleapis.com/books"));
    assert!(requested.iter().all(|u| !u.contains("ids=Q3")));
}

#[test]
fn test_entity_without_page_claim_is_skipped() {
    let search = r#"{"search":[{"id":"Q1"},{"id":"Q2"}]}"#;
    let q1 = r#"{"entities":{"Q1":{"claims":{"P31":[]}}}}"#;
    let q2 = r#"{"entities":{"Q2":{"claims":{"P1104":[
        {"mainsnak":{"datavalue":{"value":{"amount":"+128"}}}}]}}}}"#;
    let fetcher = Arc::new(CannedFetcher::new(vec![
        ("googleapis.com/books", NO_VOLUMES),
        ("wbsearchentities", search),
        ("ids=Q1", q1),
        ("ids=Q2", q2),
    ]));
    let (resolver, _, _) = resolver(fetcher);

    assert_eq!(resolver.resolve(&record("Starlight Memories", None, None), NOW), Some(128));
}

#[test]
fn test_native_title_drives_queries() {
    let fetcher = Arc::new(CannedFetcher::new(vec![]));
    let (resolver, _, store) = resolver(fetcher.clone());
    let mut rec = record("Starlight Memories", None, None);
    rec.title_jp = "スターライト".into();

    assert_eq!(resolver.resolve(&rec, NOW), None);

    // both sources were tried, each with the native title
    let encoded = urlencoding::encode("スターライト").into_owned();
    let requested = fetcher.requested();
    assert_eq!(requested.len(), 2);
    assert!(requested.iter().all(|u| u.contains(&encoded)));
    assert!(store.get(PAGES_CACHE_KEY).unwrap().is_none());
}

#[test]
fn test_cached_value_skips_network_until_expiry() {
    let volumes = r#"{"items":[{"volumeInfo":{"title":"Starlight Memories","pageCount":150}}]}"#;
    let fetcher = Arc::new(CannedFetcher::new(vec![("googleapis.com/books", volumes)]));
    let (resolver, cache, _) = resolver(fetcher.clone());
    let rec = record("Starlight Memories", None, None);
    cache.put(&pages_cache_key(&rec), 88, NOW).unwrap();

    assert_eq!(resolver.resolve(&rec, NOW + TTL), Some(88));
    assert!(fetcher.requested().is_empty());

    assert_eq!(resolver.resolve(&rec, NOW + TTL + 1), Some(150));
    assert_eq!(fetcher.requested().len(), 1);
}
