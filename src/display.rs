//! Display controller for the companion panel.
//!
//! Turns a record into a [`PanelView`]: formatted prices, a resolved page count,
//! outbound lookup links and the search history. Rendering the same URL twice is a
//! no-op.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use crate::cache::{FxCache, PagesCache};
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::extract::absolutize_url;
use crate::fetch::Fetcher;
use crate::fx::FxRates;
use crate::history::History;
use crate::host::Host;
use crate::messages::{Message, Response};
use crate::price::{format_eur, format_yen};
use crate::record::{valid_amount, HistoryEntry, ProductRecord, TabId};
use crate::resolve::PageCountResolver;
use crate::store::KeyValueStore;

const PLACEHOLDER: &str = "—";

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/watch\?v=([a-zA-Z0-9_-]{11})").expect("Invalid video id regex")
});

/// The display's request channel to the coordinator
pub trait CoordinatorLink {
    fn request(&mut self, msg: Message) -> Result<Response>;
}

impl<H: Host> CoordinatorLink for Coordinator<H> {
    fn request(&mut self, msg: Message) -> Result<Response> {
        Ok(self.handle(msg, None))
    }
}

/// Outbound lookup links for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Links {
    pub amazon_en: String,
    pub ebay_en: String,
    pub amazon_jp: String,
    pub ebay_jp: String,
    pub lens: String,
    pub video: String,
}

impl Links {
    fn build(record: &ProductRecord, video: String) -> Self {
        let q_en = record.title_raw.trim();
        let q_jp = record.title_jp.trim();
        let q_jp = if q_jp.is_empty() { q_en } else { q_jp };
        let lens_img = absolutize_url(&record.cover_url);

        Self {
            amazon_en: format!("https://www.amazon.com/s?k={}", urlencoding::encode(q_en)),
            ebay_en: format!("https://www.ebay.com/sch/i.html?_nkw={}", urlencoding::encode(q_en)),
            amazon_jp: format!("https://www.amazon.co.jp/s?k={}", urlencoding::encode(q_jp)),
            ebay_jp: format!(
                "https://www.ebay.com/sch/i.html?_nkw={}&LH_PrefLoc=2",
                urlencoding::encode(q_jp)
            ),
            lens: format!(
                "https://lens.google.com/uploadbyurl?url={}",
                urlencoding::encode(&lens_img)
            ),
            video,
        }
    }
}

/// Everything the panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub status: String,
    pub title: String,
    pub title_href: Option<String>,
    pub title_jp: Option<String>,
    pub cover_src: Option<String>,
    pub pages: String,
    pub price_eur: String,
    pub price_yen: String,
    pub links: Option<Links>,
    pub history: Vec<HistoryEntry>,
}

impl Default for PanelView {
    fn default() -> Self {
        Self {
            status: String::new(),
            title: String::new(),
            title_href: None,
            title_jp: None,
            cover_src: None,
            pages: PLACEHOLDER.to_string(),
            price_eur: PLACEHOLDER.to_string(),
            price_yen: format!("({})", PLACEHOLDER),
            links: None,
            history: Vec::new(),
        }
    }
}

pub fn video_search_url(query: &str, suffix: &str) -> String {
    let q = format!("{}{}", query, suffix);
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(q.trim())
    )
}

/// First video link on a search results page
pub fn find_first_video(html: &str) -> Option<String> {
    VIDEO_ID_RE
        .captures(html)
        .map(|c| format!("https://www.youtube.com/watch?v={}", &c[1]))
}

pub struct DisplayController {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    resolver: PageCountResolver,
    fx: FxRates,
    history: History,
    last_url: Option<String>,
    view: PanelView,
}

impl DisplayController {
    pub fn new(config: Config, local: Arc<dyn KeyValueStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        let pages_cache = PagesCache::new(local.clone(), config.pages_cache_ttl_ms());
        let fx_cache = FxCache::new(local.clone(), config.fx_max_age_ms());
        Self {
            resolver: PageCountResolver::new(pages_cache, fetcher.clone()),
            fx: FxRates::new(fx_cache, fetcher.clone(), config.fx_endpoint.clone()),
            history: History::new(local, config.history_limit),
            fetcher,
            config,
            last_url: None,
            view: PanelView::default(),
        }
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Load history, then show the focused tab's record or the last-active one
    pub fn init(&mut self, link: &mut dyn CoordinatorLink, tab: Option<TabId>) -> &PanelView {
        match self.history.load() {
            Ok(entries) => self.view.history = entries,
            Err(e) => {
                self.clear(&format!("Init error: {}", e));
                return &self.view;
            }
        }

        match link.request(Message::GetLastProduct { tab_id: tab }) {
            Ok(Response { payload: Some(record), .. }) => {
                self.render(&record);
                return &self.view;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "last product request failed");
                self.clear("");
                return &self.view;
            }
        }

        match link.request(Message::GetLastActiveProduct) {
            Ok(Response { payload: Some(record), .. }) => {
                self.render(&record);
            }
            Ok(_) => self.clear(""),
            Err(e) => tracing::debug!(error = %e, "last active request failed"),
        }
        &self.view
    }

    /// React to a pushed message; a null update never blanks the panel
    pub fn on_message(&mut self, msg: &Message) -> Option<&PanelView> {
        match msg {
            Message::SidepanelUpdate { payload: Some(record), .. } => {
                self.render(record)?;
                Some(&self.view)
            }
            _ => None,
        }
    }

    /// Reset the record part of the view and show a status line
    pub fn clear(&mut self, message: &str) {
        let history = std::mem::take(&mut self.view.history);
        self.view = PanelView {
            status: message.to_string(),
            history,
            ..PanelView::default()
        };
    }

    /// Render a record unless its URL is the one already shown
    pub fn render(&mut self, record: &ProductRecord) -> Option<&PanelView> {
        if !record.url.is_empty() && self.last_url.as_deref() == Some(record.url.as_str()) {
            return None;
        }
        self.last_url = (!record.url.is_empty()).then(|| record.url.clone());
        let now = Utc::now().timestamp_millis();

        let mut view = PanelView {
            title: record.title_raw.clone(),
            title_href: (!record.url.is_empty()).then(|| record.url.clone()),
            title_jp: (!record.title_jp.is_empty()).then(|| record.title_jp.clone()),
            history: std::mem::take(&mut self.view.history),
            ..PanelView::default()
        };

        let cover = record
            .cover_data_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&record.cover_url);
        view.cover_src = Some(absolutize_url(cover)).filter(|s| !s.is_empty());

        if let Some(pages) = self.resolver.resolve(record, now) {
            view.pages = pages.to_string();
        }

        let mut price_yen = record.price_yen.filter(|&v| valid_amount(v));
        // an in-page euro price beats any conversion
        let mut price_eur = record.price_eur.filter(|&v| valid_amount(v)).or_else(|| {
            let yen = price_yen?;
            self.fx.jpy_to_eur(now).map(|rate| yen * rate)
        });

        if record.out_of_stock {
            view.price_eur = "Out of stock".to_string();
            view.price_yen = String::new();
            price_eur = None;
            price_yen = None;
        } else {
            view.price_eur = format_eur(price_eur);
            view.price_yen = format!("({})", format_yen(price_yen));
        }

        let query = if record.title_raw.trim().is_empty() {
            record.title_jp.trim()
        } else {
            record.title_raw.trim()
        };
        let search_url = video_search_url(query, &self.config.video_query_suffix);
        let video = self.first_video(&search_url).unwrap_or(search_url);
        view.links = Some(Links::build(record, video));

        let shown = ProductRecord {
            price_yen,
            price_eur,
            ..record.clone()
        };
        match self.history.push(&shown) {
            Ok(entries) => view.history = entries,
            Err(e) => tracing::debug!(error = %e, "history push failed"),
        }

        self.view = view;
        Some(&self.view)
    }

    pub fn remove_history(&mut self, url: &str) -> Result<&[HistoryEntry]> {
        self.view.history = self.history.remove(url)?;
        Ok(&self.view.history)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()?;
        self.view.history.clear();
        Ok(())
    }

    fn first_video(&self, search_url: &str) -> Option<String> {
        match self.fetcher.get_text(search_url) {
            Ok(html) => find_first_video(&html),
            Err(e) => {
                tracing::debug!(error = %e, "video search failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_search_url() {
        assert_eq!(
            video_search_url("Foo Bar", " flipthrough"),
            "https://www.youtube.com/results?search_query=Foo%20Bar%20flipthrough"
        );
        assert_eq!(
            video_search_url("", " flipthrough"),
            "https://www.youtube.com/results?search_query=flipthrough"
        );
    }

    #[test]
    fn test_find_first_video() {
        let html = r#"<a href="/watch?v=abcDEF_1234">x</a><a href="/watch?v=zzzzzzzzzzz">"#;
        assert_eq!(
            find_first_video(html).as_deref(),
            Some("https://www.youtube.com/watch?v=abcDEF_1234")
        );
        assert_eq!(find_first_video("no videos"), None);
    }

    #[test]
    fn test_links_fall_back_to_english_title() {
        let record = ProductRecord {
            title_raw: "Foo Bar".into(),
            cover_url: "//cdn.x/a.jpg".into(),
            ..Default::default()
        };
        let links = Links::build(&record, "v".into());
        assert_eq!(links.amazon_en, "https://www.amazon.com/s?k=Foo%20Bar");
        assert_eq!(links.amazon_jp, "https://www.amazon.co.jp/s?k=Foo%20Bar");
        assert_eq!(
            links.ebay_jp,
            "https://www.ebay.com/sch/i.html?_nkw=Foo%20Bar&LH_PrefLoc=2"
        );
        assert_eq!(
            links.lens,
            "https://lens.google.com/uploadbyurl?url=https%3A%2F%2Fcdn.x%2Fa.jpg"
        );
    }
}
