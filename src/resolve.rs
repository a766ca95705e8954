//! Page-count resolution for records whose page does not state it.
//!
//! Order: local cache, then a bibliographic volume search scored by token overlap,
//! then knowledge-graph entities carrying a "number of pages" claim. Lookups are
//! best-effort; any network or decode failure moves on to the next source.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::{pages_cache_key, PagesCache};
use crate::error::Result;
use crate::fetch::{get_json, Fetcher};
use crate::normalize::normalize_whitespace;
use crate::record::{valid_pages, ProductRecord};

/// Minimum weighted overlap for a volume to be trusted
pub const MIN_MATCH_SCORE: f64 = 0.35;

const TITLE_WEIGHT: f64 = 0.65;
const AUTHOR_WEIGHT: f64 = 0.25;
const PUBLISHER_WEIGHT: f64 = 0.10;

/// Wikidata property "number of pages"
const NUMBER_OF_PAGES: &str = "P1104";

const BOOKS_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";
const WIKIDATA_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";

#[derive(Debug, Default, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Default, Deserialize)]
struct Volume {
    #[serde(default, rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    page_count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct EntitySearch {
    #[serde(default)]
    search: Vec<EntityHit>,
}

#[derive(Debug, Deserialize)]
struct EntityHit {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
}

#[derive(Debug, Default, Deserialize)]
struct Entity {
    #[serde(default)]
    claims: HashMap<String, Vec<serde_json::Value>>,
}

/// Ratio of shared case-insensitive whitespace tokens to the larger token set
pub fn token_overlap_score(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> {
        normalize_whitespace(s)
            .to_lowercase()
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    };
    let (a, b) = (tokens(a), tokens(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    shared as f64 / a.len().max(b.len()) as f64
}

/// Weighted match score of one volume against the record's title, author and maker
fn score_volume(title: &str, author: &str, maker: &str, info: &VolumeInfo) -> f64 {
    let t = token_overlap_score(title, &info.title);
    let authors = info.authors.join(" ");
    let a = if author.is_empty() || authors.is_empty() {
        0.0
    } else {
        token_overlap_score(author, &authors)
    };
    let m = if maker.is_empty() || info.publisher.is_empty() {
        0.0
    } else {
        token_overlap_score(maker, &info.publisher)
    };
    t * TITLE_WEIGHT + a * AUTHOR_WEIGHT + m * PUBLISHER_WEIGHT
}

/// Parse a Wikidata quantity amount like "+160"
fn parse_amount(value: &serde_json::Value) -> Option<u32> {
    let amount = value.pointer("/mainsnak/datavalue/value/amount")?;
    let raw = match amount {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().ok().filter(|&n| valid_pages(n))
}

/// Resolves missing page counts through the cache and external sources
#[derive(Clone)]
pub struct PageCountResolver {
    cache: PagesCache,
    fetcher: Arc<dyn Fetcher>,
}

impl PageCountResolver {
    pub fn new(cache: PagesCache, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Resolve a page count for `record`; `None` when nothing trustworthy is found
    pub fn resolve(&self, record: &ProductRecord, now_ms: i64) -> Option<u32> {
        if let Some(pages) = record.pages.filter(|&n| valid_pages(n)) {
            return Some(pages);
        }

        let key = pages_cache_key(record);
        match self.cache.get(&key, now_ms) {
            Ok(Some(pages)) => return Some(pages),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "page cache read failed"),
        }

        let resolved = self
            .lookup_volumes(record)
            .or_else(|| self.lookup_entities(record))?;

        if let Err(e) = self.cache.put(&key, resolved, now_ms) {
            tracing::debug!(error = %e, "page cache write failed");
        }
        Some(resolved)
    }

    fn query_title(record: &ProductRecord) -> String {
        let title = if record.title_jp.trim().is_empty() {
            &record.title_raw
        } else {
            &record.title_jp
        };
        normalize_whitespace(title)
    }

    fn lookup_volumes(&self, record: &ProductRecord) -> Option<u32> {
        let title = Self::query_title(record);
        if title.is_empty() {
            return None;
        }
        let author = normalize_whitespace(record.author.as_deref().unwrap_or_default());
        let maker = normalize_whitespace(record.maker.as_deref().unwrap_or_default());

        let mut parts = vec![format!("intitle:\"{}\"", title.replace('"', ""))];
        if !author.is_empty() {
            parts.push(format!("inauthor:\"{}\"", author.replace('"', "")));
        }
        let url = format!(
            "{}?q={}&maxResults=5&printType=books",
            BOOKS_ENDPOINT,
            urlencoding::encode(&parts.join(" "))
        );

        let response: VolumesResponse = match get_json(self.fetcher.as_ref(), &url) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "volume search failed");
                return None;
            }
        };

        let mut best: Option<(u32, f64)> = None;
        for volume in &response.items {
            let info = &volume.volume_info;
            let Some(pages) = info
                .page_count
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| valid_pages(n))
            else {
                continue;
            };
            let score = score_volume(&title, &author, &maker, info);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pages, score));
            }
        }

        let (pages, score) = best?;
        tracing::debug!(pages, score, "best volume match");
        (score >= MIN_MATCH_SCORE).then_some(pages)
    }

    fn lookup_entities(&self, record: &ProductRecord) -> Option<u32> {
        let title = Self::query_title(record);
        if title.is_empty() {
            return None;
        }
        let search_url = format!(
            "{}?action=wbsearchentities&search={}&language=ja&format=json&limit=5&origin=*",
            WIKIDATA_ENDPOINT,
            urlencoding::encode(&title)
        );
        let search: EntitySearch = match get_json(self.fetcher.as_ref(), &search_url) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(error = %e, "entity search failed");
                return None;
            }
        };

        search
            .search
            .iter()
            .filter(|hit| !hit.id.is_empty())
            .find_map(|hit| self.entity_pages(&hit.id).ok().flatten())
    }

    fn entity_pages(&self, id: &str) -> Result<Option<u32>> {
        let url = format!(
            "{}?action=wbgetentities&ids={}&format=json&props=claims&origin=*",
            WIKIDATA_ENDPOINT,
            urlencoding::encode(id)
        );
        let response: EntitiesResponse = get_json(self.fetcher.as_ref(), &url)?;
        Ok(response
            .entities
            .get(id)
            .and_then(|e| e.claims.get(NUMBER_OF_PAGES))
            .and_then(|claims| claims.first())
            .and_then(parse_amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_overlap() {
        assert_eq!(token_overlap_score("Foo Bar", "foo bar"), 1.0);
        assert_eq!(token_overlap_score("Foo Bar", "Foo Baz Qux"), 1.0 / 3.0);
        assert_eq!(token_overlap_score("", "Foo"), 0.0);
    }

    #[test]
    fn test_score_weights() {
        let info = VolumeInfo {
            title: "Foo Bar".into(),
            authors: vec!["Ito".into()],
            publisher: "Kadokawa".into(),
            page_count: Some(100),
        };
        let full = score_volume("Foo Bar", "Ito", "Kadokawa", &info);
        assert!((full - 1.0).abs() < 1e-9);
        let title_only = score_volume("Foo Bar", "", "", &info);
        assert!((title_only - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_parse_amount() {
        let claim = json!({"mainsnak": {"datavalue": {"value": {"amount": "+160"}}}});
        assert_eq!(parse_amount(&claim), Some(160));
        let claim = json!({"mainsnak": {"datavalue": {"value": {"amount": "+60000"}}}});
        assert_eq!(parse_amount(&claim), None);
        assert_eq!(parse_amount(&json!({})), None);
    }
}
