use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pages counts at or above this are treated as parse noise
pub const MAX_PAGES: u32 = 50_000;

/// Host-assigned tab identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structured metadata extracted from one product page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Page identity
    pub url: String,
    /// Absolute cover image URL
    #[serde(default)]
    pub cover_url: String,
    /// Cover inlined as a data: URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_data_url: Option<String>,
    /// Normalized display title
    #[serde(default)]
    pub title_raw: String,
    /// Native-language title, empty when absent
    #[serde(default)]
    pub title_jp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maker: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub price_yen: Option<f64>,
    #[serde(default)]
    pub price_eur: Option<f64>,
    #[serde(default)]
    pub out_of_stock: bool,
    /// Epoch milliseconds, stamped by the coordinator
    #[serde(default)]
    pub detected_at: i64,
}

impl ProductRecord {
    /// A record may only be emitted when it has both a title and a cover
    pub fn is_valid(&self) -> bool {
        !self.title_raw.trim().is_empty() && !self.cover_url.trim().is_empty()
    }

    /// Drop out-of-range numbers so every stored record satisfies the invariants
    pub fn sanitized(mut self) -> Self {
        self.pages = self.pages.filter(|&n| valid_pages(n));
        self.price_yen = self.price_yen.filter(|&v| valid_amount(v));
        self.price_eur = self.price_eur.filter(|&v| valid_amount(v));
        self
    }

    pub fn stamp_now(&mut self) {
        self.detected_at = Utc::now().timestamp_millis();
    }
}

pub fn valid_pages(n: u32) -> bool {
    n > 0 && n < MAX_PAGES
}

pub fn valid_amount(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Reduced projection of a record kept in the search history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub url: String,
    #[serde(default)]
    pub title_raw: String,
    #[serde(default)]
    pub title_jp: String,
    /// Inlined cover if available, otherwise the cover URL
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub price_yen: Option<f64>,
    #[serde(default)]
    pub price_eur: Option<f64>,
    #[serde(default)]
    pub out_of_stock: bool,
    #[serde(default)]
    pub detected_at: i64,
}

impl From<&ProductRecord> for HistoryEntry {
    fn from(p: &ProductRecord) -> Self {
        Self {
            url: p.url.clone(),
            title_raw: crate::normalize::normalize_whitespace(&p.title_raw),
            title_jp: crate::normalize::normalize_whitespace(&p.title_jp),
            cover: p
                .cover_data_url
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| p.cover_url.clone()),
            price_yen: p.price_yen.filter(|&v| valid_amount(v)),
            price_eur: p.price_eur.filter(|&v| valid_amount(v)),
            out_of_stock: p.out_of_stock,
            detected_at: if p.detected_at > 0 {
                p.detected_at
            } else {
                Utc::now().timestamp_millis()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProductRecord {
        ProductRecord {
            url: "https://www.suruga-ya.com/en/product/1".into(),
            cover_url: "https://cdn.example/1.jpg".into(),
            title_raw: "Foo".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validity_requires_title_and_cover() {
        assert!(record().is_valid());
        assert!(!ProductRecord { title_raw: "  ".into(), ..record() }.is_valid());
        assert!(!ProductRecord { cover_url: String::new(), ..record() }.is_valid());
    }

    #[test]
    fn test_sanitized_drops_out_of_range_values() {
        let r = ProductRecord {
            pages: Some(50_000),
            price_yen: Some(0.0),
            price_eur: Some(f64::NAN),
            ..record()
        }
        .sanitized();
        assert_eq!(r.pages, None);
        assert_eq!(r.price_yen, None);
        assert_eq!(r.price_eur, None);

        let r = ProductRecord { pages: Some(49_999), ..record() }.sanitized();
        assert_eq!(r.pages, Some(49_999));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let r = ProductRecord { price_yen: Some(5106.0), ..record() };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["titleRaw"], "Foo");
        assert_eq!(json["priceYen"], 5106.0);
        assert!(json.get("coverDataUrl").is_none());

        let back: ProductRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_history_entry_prefers_inlined_cover() {
        let mut r = record();
        r.cover_data_url = Some("data:image/jpeg;base64,AAAA".into());
        r.detected_at = 42;
        let entry = HistoryEntry::from(&r);
        assert_eq!(entry.cover, "data:image/jpeg;base64,AAAA");
        assert_eq!(entry.detected_at, 42);
    }
}
