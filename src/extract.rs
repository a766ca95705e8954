//! Product-page extraction.
//!
//! Every field is found by an ordered list of independent matchers; the first one
//! that yields a value wins. More specific phrasing sits earlier in each list.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SiteConfig;
use crate::normalize::{normalize_title, normalize_whitespace};
use crate::page_facts::PageSnapshot;
use crate::price::{
    parse_euro_number, parse_yen_number, parse_yen_text, YEN_SYMBOL_RE, YEN_UNIT_RE,
};
use crate::record::{valid_pages, ProductRecord};

type Matcher<T> = fn(&PageSnapshot) -> Option<T>;

static JP_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Japanese\s*title\s*[:：]\s*([^\n]+)").expect("Invalid Japanese title regex")
});

/// Page-count phrasings, most reliable first
static PAGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(\d{1,5})\s*page\s*specification\b",
        r"(?i)\bpages?\s*[:\-]?\s*(\d{1,5})\b",
        r"(?i)\b(\d{1,5})\s*pages?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid page pattern"))
    .collect()
});

static MAKER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^\s*(?:maker|manufacturer|publisher)\s*[:：]\s*(.+)$",
        r"(?m)^\s*(?:メーカー|出版社)\s*[:：]?\s*(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid maker pattern"))
    .collect()
});

static AUTHOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^\s*(?:author|writer|illustrator)\s*[:：]\s*(.+)$",
        r"(?m)^\s*(?:著者|作者)\s*[:：]?\s*(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid author pattern"))
    .collect()
});

static OUT_OF_STOCK_PHRASES: &[&str] = &[
    "out of stock",
    "sold out",
    "currently unavailable",
    "no stock",
    "品切れ",
    "在庫なし",
    "売り切れ",
];

static USED_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUsed\b[\s\S]{0,80}?(\d[\d,]*)\s*(?:JPY|yen|円)")
        .expect("Invalid used regex")
});

static USED_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUsed\b[\s\S]{0,80}?[¥￥]\s*(\d[\d,]*)").expect("Invalid used symbol regex")
});

/// "price", "sale price", "selling price"; the preceding word is captured so a
/// "listed price" can be told apart
static SALE_PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(\w+)\s+)?\bprice\s*[:：]?\s*[¥￥]?\s*(\d[\d,]*)")
        .expect("Invalid sale price regex")
});

static SALE_PRICE_JP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"販売価格\s*[:：]?\s*[¥￥]?\s*(\d[\d,]*)").expect("Invalid sale price regex")
});

const LISTED_QUALIFIERS: &[&str] = &["listed", "list"];

static LISTED_PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:listed\s+price|list\s+price|定価)\s*[:：]?\s*[¥￥]?\s*(\d[\d,]*)")
        .expect("Invalid listed price regex")
});

static REFERENCE_EURO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Reference\s*[:：]?\s*(\d[\d.,]*)[\s\S]{0,40}?Euro\s*\(?\s*EUR\s*\)?")
        .expect("Invalid reference euro regex")
});

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Reference\s*[:：]?\s*(\d[\d.,]*)").expect("Invalid reference regex")
});

static EURO_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"€\s*(\d[\d.,]*)|(\d[\d.,]*)\s*€").expect("Invalid euro symbol regex")
});

/// Product-page detection and field extraction for one catalog site
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    site: SiteConfig,
}

impl Extractor {
    pub fn new(site: SiteConfig) -> Self {
        Self { site }
    }

    /// Product path plus non-blank og:title and og:image
    pub fn is_product_page(&self, page: &PageSnapshot) -> bool {
        self.site.is_product_path(&page.path())
            && page.meta("og:title").is_some()
            && page.meta("og:image").is_some()
    }

    /// Build a record, or `None` when the page is not an emittable product page
    pub fn extract(&self, page: &PageSnapshot) -> Option<ProductRecord> {
        if !self.is_product_page(page) {
            return None;
        }

        let title = extract_title(page).map(|t| normalize_title(&t)).unwrap_or_default();
        let cover_url = extract_cover_url(page);
        if title.is_empty() || cover_url.is_empty() {
            return None;
        }

        Some(ProductRecord {
            url: page.url.clone(),
            cover_url,
            cover_data_url: None,
            title_raw: title,
            title_jp: extract_title_jp(&page.body_text).unwrap_or_default(),
            author: first_labeled(&AUTHOR_PATTERNS, &page.body_text),
            maker: first_labeled(&MAKER_PATTERNS, &page.body_text),
            pages: find_pages_in_text(&page.body_text),
            price_yen: extract_price_yen(page),
            price_eur: extract_price_eur(page),
            out_of_stock: is_out_of_stock(page),
            detected_at: 0,
        })
    }
}

/// Rewrite protocol-relative URLs to https
pub fn absolutize_url(u: &str) -> String {
    let u = u.trim();
    if let Some(rest) = u.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        u.to_string()
    }
}

/// Heading, then og:title, then the document title
pub fn extract_title(page: &PageSnapshot) -> Option<String> {
    page.heading
        .as_deref()
        .or_else(|| page.meta("og:title"))
        .or(page.document_title.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

pub fn extract_cover_url(page: &PageSnapshot) -> String {
    page.meta("og:image").map(absolutize_url).unwrap_or_default()
}

/// First "Japanese title: ..." line
pub fn extract_title_jp(text: &str) -> Option<String> {
    JP_TITLE_RE
        .captures(text)
        .map(|c| normalize_whitespace(&c[1]))
        .filter(|s| !s.is_empty())
}

/// First pattern, in priority order, that yields a count in (0, 50000)
pub fn find_pages_in_text(text: &str) -> Option<u32> {
    PAGE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(text)?;
        caps[1].parse::<u32>().ok().filter(|&n| valid_pages(n))
    })
}

fn first_labeled(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .map(|c| normalize_whitespace(&c[1]))
            .filter(|s| !s.is_empty())
    })
}

pub fn extract_maker(text: &str) -> Option<String> {
    first_labeled(&MAKER_PATTERNS, text)
}

pub fn extract_author(text: &str) -> Option<String> {
    first_labeled(&AUTHOR_PATTERNS, text)
}

pub fn is_out_of_stock(page: &PageSnapshot) -> bool {
    let lower = page.body_text.to_lowercase();
    OUT_OF_STOCK_PHRASES.iter().any(|p| lower.contains(p)) || page.cart_disabled
}

/// Yen price strategies, in priority order
const YEN_MATCHERS: &[Matcher<f64>] = &[
    yen_from_price_containers,
    yen_near_used_unit,
    yen_near_used_symbol,
    yen_sale_price,
    yen_listed_price,
    yen_bare_symbol,
    yen_bare_unit,
];

/// Euro price strategies, in priority order
const EUR_MATCHERS: &[Matcher<f64>] = &[euro_reference_qualified, euro_reference, euro_from_symbol];

pub fn extract_price_yen(page: &PageSnapshot) -> Option<f64> {
    YEN_MATCHERS.iter().find_map(|m| m(page))
}

pub fn extract_price_eur(page: &PageSnapshot) -> Option<f64> {
    EUR_MATCHERS.iter().find_map(|m| m(page))
}

fn yen_from_price_containers(page: &PageSnapshot) -> Option<f64> {
    page.price_texts.iter().find_map(|t| parse_yen_text(t))
}

// The used-item price is the one that matters on this catalog
fn yen_near_used_unit(page: &PageSnapshot) -> Option<f64> {
    capture_number(&USED_UNIT_RE, &page.body_text, parse_yen_number)
}

fn yen_near_used_symbol(page: &PageSnapshot) -> Option<f64> {
    capture_number(&USED_SYMBOL_RE, &page.body_text, parse_yen_number)
}

fn yen_sale_price(page: &PageSnapshot) -> Option<f64> {
    SALE_PRICE_RE
        .captures_iter(&page.body_text)
        .filter(|caps| {
            caps.get(1).map_or(true, |w| {
                !LISTED_QUALIFIERS.contains(&w.as_str().to_lowercase().as_str())
            })
        })
        .find_map(|caps| parse_yen_number(&caps[2]))
        .or_else(|| capture_number(&SALE_PRICE_JP_RE, &page.body_text, parse_yen_number))
}

fn yen_listed_price(page: &PageSnapshot) -> Option<f64> {
    capture_number(&LISTED_PRICE_RE, &page.body_text, parse_yen_number)
}

fn yen_bare_symbol(page: &PageSnapshot) -> Option<f64> {
    capture_number(&YEN_SYMBOL_RE, &page.body_text, parse_yen_number)
}

fn yen_bare_unit(page: &PageSnapshot) -> Option<f64> {
    capture_number(&YEN_UNIT_RE, &page.body_text, parse_yen_number)
}

fn euro_reference_qualified(page: &PageSnapshot) -> Option<f64> {
    capture_number(&REFERENCE_EURO_RE, &page.body_text, parse_euro_number)
}

fn euro_reference(page: &PageSnapshot) -> Option<f64> {
    capture_number(&REFERENCE_RE, &page.body_text, parse_euro_number)
}

fn euro_from_symbol(page: &PageSnapshot) -> Option<f64> {
    let caps = EURO_SYMBOL_RE.captures(&page.body_text)?;
    let number = caps.get(1).or_else(|| caps.get(2))?;
    parse_euro_number(number.as_str())
}

fn capture_number(re: &Regex, text: &str, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    let caps = re.captures(text)?;
    parse(caps.get(1)?.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> PageSnapshot {
        PageSnapshot {
            url: "https://www.suruga-ya.com/en/product/1".into(),
            body_text: body.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pages_priority_order() {
        // "specification" phrasing beats the earlier bare count
        assert_eq!(find_pages_in_text("12 pages of extras\n160 page specification"), Some(160));
        assert_eq!(find_pages_in_text("Pages: 96"), Some(96));
        assert_eq!(find_pages_in_text("A4 / 128 pages"), Some(128));
        assert_eq!(find_pages_in_text("no count"), None);
    }

    #[test]
    fn test_pages_out_of_range_rejected() {
        assert_eq!(find_pages_in_text("0 pages"), None);
        assert_eq!(find_pages_in_text("pages: 99999"), None);
        // an out-of-range match does not stop the next pattern
        assert_eq!(find_pages_in_text("60000 page specification\nPages: 200"), Some(200));
    }

    #[test]
    fn test_title_jp_first_line() {
        let text = "Foo\nJapanese title :  フー  バー \nMaker: Bar";
        assert_eq!(extract_title_jp(text).as_deref(), Some("フー バー"));
        assert_eq!(extract_title_jp("nothing"), None);
    }

    #[test]
    fn test_maker_and_author_locales() {
        assert_eq!(extract_maker("Maker: Kadokawa\nAuthor: Ito").as_deref(), Some("Kadokawa"));
        assert_eq!(extract_maker("メーカー：角川書店").as_deref(), Some("角川書店"));
        assert_eq!(extract_author("Author: Ito").as_deref(), Some("Ito"));
        assert_eq!(extract_author("著者: 伊藤").as_deref(), Some("伊藤"));
        assert_eq!(extract_author("nothing"), None);
    }

    #[test]
    fn test_out_of_stock() {
        assert!(is_out_of_stock(&page("Status: Sold Out")));
        assert!(is_out_of_stock(&page("在庫なし")));
        assert!(!is_out_of_stock(&page("In stock")));
        let mut p = page("In stock");
        p.cart_disabled = true;
        assert!(is_out_of_stock(&p));
    }

    #[test]
    fn test_yen_used_anchor() {
        assert_eq!(extract_price_yen(&page("Used\n5,106JPY")), Some(5106.0));
        assert_eq!(extract_price_yen(&page("Condition\nUsed\n¥ 3,300")), Some(3300.0));
    }

    #[test]
    fn test_yen_container_wins() {
        let mut p = page("Used\n5,106JPY");
        p.price_texts = vec!["¥4,000".into()];
        assert_eq!(extract_price_yen(&p), Some(4000.0));
    }

    #[test]
    fn test_yen_labeled_fallbacks() {
        assert_eq!(extract_price_yen(&page("Selling price: 2,980")), Some(2980.0));
        assert_eq!(extract_price_yen(&page("Listed price 3,080")), Some(3080.0));
        assert_eq!(extract_price_yen(&page("only ¥700 today")), Some(700.0));
        assert_eq!(extract_price_yen(&page("costs 900円")), Some(900.0));
        assert_eq!(extract_price_yen(&page("free")), None);
    }

    #[test]
    fn test_selling_price_beats_earlier_listed_price() {
        let p = page("Listed price: 3,080\nSelling price: 2,980");
        assert_eq!(extract_price_yen(&p), Some(2980.0));
        assert_eq!(extract_price_yen(&page("定価 3,080\n販売価格 2,500")), Some(2500.0));
        assert_eq!(extract_price_yen(&page("Price: 1,200")), Some(1200.0));
        assert_eq!(extract_price_yen(&page("List price 4,400")), Some(4400.0));
    }

    #[test]
    fn test_pages_specification_phrasing() {
        assert_eq!(find_pages_in_text("144 page specification"), Some(144));
        // plural falls through to the bare count pattern
        assert_eq!(find_pages_in_text("144 pages specification"), Some(144));
    }

    #[test]
    fn test_euro_reference_forms() {
        assert_eq!(
            extract_price_eur(&page("Reference 28,07 approx. Euro(EUR)")),
            Some(28.07)
        );
        assert_eq!(extract_price_eur(&page("Reference: 1.234,56")), Some(1234.56));
        assert_eq!(extract_price_eur(&page("about € 12.50")), Some(12.5));
        assert_eq!(extract_price_eur(&page("about 12,50 €")), Some(12.5));
        assert_eq!(extract_price_eur(&page("no euro")), None);
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize_url("//cdn.x/a.jpg"), "https://cdn.x/a.jpg");
        assert_eq!(absolutize_url("https://cdn.x/a.jpg"), "https://cdn.x/a.jpg");
        assert_eq!(absolutize_url(""), "");
    }

    #[test]
    fn test_requires_product_path_and_meta() {
        let extractor = Extractor::default();
        let mut p = page("");
        p.heading = Some("Foo".into());
        assert!(extractor.extract(&p).is_none());

        p.meta_tags.insert("og:title".into(), "Foo".into());
        p.meta_tags.insert("og:image".into(), "//cdn.x/a.jpg".into());
        let record = extractor.extract(&p).unwrap();
        assert_eq!(record.cover_url, "https://cdn.x/a.jpg");
        assert_eq!(record.title_raw, "Foo");

        p.url = "https://www.suruga-ya.com/en/search?q=foo".into();
        assert!(extractor.extract(&p).is_none());
    }
}
