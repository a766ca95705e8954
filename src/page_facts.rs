//! PageSnapshot - one read of a page's DOM and visible text
//!
//! The extractor never touches the DOM directly. A snapshot captures everything it
//! needs in one pass: the location, a handful of meta fields, heading and document
//! titles, the visible text laid out one text node per line, the texts of known
//! price containers and whether any add-to-cart control is disabled.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Containers that hold the listed price on catalog product pages
pub const PRICE_SELECTORS: &[&str] = &[
    ".price-buy",
    ".text-price-detail",
    ".price_group .text-red",
    "[itemprop=\"price\"]",
    "#price",
    ".price",
];

/// Elements whose text never reaches the reader
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// A snapshot of the page the observer is running on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Current location (href)
    pub url: String,
    /// Meta tags (name/property -> content)
    pub meta_tags: HashMap<String, String>,
    /// Text of the first <h1>
    pub heading: Option<String>,
    /// Document <title>
    pub document_title: Option<String>,
    /// Visible text, one text node per line
    pub body_text: String,
    /// Texts of known price containers, in selector priority order
    pub price_texts: Vec<String>,
    /// True when an add-to-cart style control is present and disabled
    pub cart_disabled: bool,
}

impl PageSnapshot {
    /// Create a snapshot from a location and its HTML
    pub fn from_html(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut snapshot = Self {
            url: url.to_string(),
            ..Default::default()
        };

        snapshot.extract_meta_tags(&document);
        snapshot.extract_titles(&document);
        snapshot.extract_body_text(&document);
        snapshot.extract_price_texts(&document);
        snapshot.detect_disabled_cart(&document);
        snapshot
    }

    /// Meta content by name or property, trimmed and non-blank
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta_tags
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Path part of the location
    pub fn path(&self) -> String {
        url::Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| self.url.clone())
    }

    fn extract_meta_tags(&mut self, document: &Html) {
        if let Ok(selector) = Selector::parse("meta[name], meta[property]") {
            for element in document.select(&selector) {
                let key = element
                    .value()
                    .attr("property")
                    .or_else(|| element.value().attr("name"))
                    .map(String::from);
                let content = element.value().attr("content").map(String::from);

                if let (Some(k), Some(c)) = (key, content) {
                    self.meta_tags.entry(k).or_insert(c);
                }
            }
        }
    }

    fn extract_titles(&mut self, document: &Html) {
        if let Ok(selector) = Selector::parse("h1") {
            self.heading = document
                .select(&selector)
                .next()
                .map(|h| collapse(&h.text().collect::<String>()))
                .filter(|s| !s.is_empty());
        }
        if let Ok(selector) = Selector::parse("title") {
            self.document_title = document
                .select(&selector)
                .next()
                .map(|t| collapse(&t.text().collect::<String>()))
                .filter(|s| !s.is_empty());
        }
    }

    /// Approximate innerText: every visible text node on its own line
    fn extract_body_text(&mut self, document: &Html) {
        let root = Selector::parse("body")
            .ok()
            .and_then(|s| document.select(&s).next())
            .unwrap_or_else(|| document.root_element());

        let mut lines = Vec::new();
        collect_visible_lines(root, &mut lines);
        self.body_text = lines.join("\n");
    }

    fn extract_price_texts(&mut self, document: &Html) {
        for css in PRICE_SELECTORS {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for element in document.select(&selector) {
                let text = element
                    .value()
                    .attr("content")
                    .map(String::from)
                    .unwrap_or_else(|| collapse(&element.text().collect::<Vec<_>>().join(" ")));
                if !text.is_empty() {
                    self.price_texts.push(text);
                }
            }
        }
    }

    fn detect_disabled_cart(&mut self, document: &Html) {
        let css = "button, input[type=submit], input[type=button], a.btn";
        let Ok(selector) = Selector::parse(css) else {
            return;
        };
        self.cart_disabled = document
            .select(&selector)
            .filter(|el| is_cart_control(el))
            .any(|el| is_disabled(&el));
    }
}

fn collect_visible_lines(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let line = collapse(text);
            if !line.is_empty() {
                lines.push(line);
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if HIDDEN_TAGS.contains(&name) || child_el.value().attr("hidden").is_some() {
                continue;
            }
            collect_visible_lines(child_el, lines);
        }
    }
}

fn is_cart_control(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    let mut haystack = el.text().collect::<String>();
    for attr in ["value", "id", "class", "name"] {
        if let Some(a) = v.attr(attr) {
            haystack.push(' ');
            haystack.push_str(a);
        }
    }
    let lower = haystack.to_lowercase();
    lower.contains("cart") || haystack.contains("カート")
}

fn is_disabled(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    v.attr("disabled").is_some()
        || v.attr("aria-disabled").is_some_and(|a| a.eq_ignore_ascii_case("true"))
        || v.classes().any(|c| c.eq_ignore_ascii_case("disabled"))
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
