//! In-page observer.
//!
//! Re-runs extraction when the page loads, settles, mutates or navigates, and emits
//! a detection only for a location it has not reported yet.

use std::time::Duration;

use crate::config::{Config, SiteConfig};
use crate::extract::Extractor;
use crate::messages::{Message, Response};
use crate::page_facts::PageSnapshot;
use crate::record::ProductRecord;

/// What woke the observer up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverEvent {
    Load,
    /// Fired once, `settle_delay` after load
    Settle,
    Mutation,
    PopState,
}

/// The document the observer runs in
pub trait Page {
    fn href(&self) -> String;
    fn snapshot(&self) -> PageSnapshot;
}

/// A page backed by a fixed location and HTML body
#[derive(Debug, Clone)]
pub struct StaticPage {
    pub url: String,
    pub html: String,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

impl Page for StaticPage {
    fn href(&self) -> String {
        self.url.clone()
    }

    fn snapshot(&self) -> PageSnapshot {
        PageSnapshot::from_html(&self.url, &self.html)
    }
}

pub struct PageObserver {
    extractor: Extractor,
    last_seen_href: Option<String>,
    last_sent_href: Option<String>,
    fab_visible: bool,
    panel_open: bool,
    settle_delay: Duration,
}

impl PageObserver {
    pub fn new(site: SiteConfig) -> Self {
        Self {
            extractor: Extractor::new(site),
            last_seen_href: None,
            last_sent_href: None,
            fab_visible: false,
            panel_open: false,
            settle_delay: Config::default().settle_delay(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            ..Self::new(config.site.clone())
        }
    }

    pub fn fab_visible(&self) -> bool {
        self.fab_visible
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    /// Handle a page event; returns a detection to send, if any
    pub fn on_event(&mut self, event: ObserverEvent, page: &dyn Page) -> Option<Message> {
        let href = page.href();
        if event == ObserverEvent::Mutation && self.last_seen_href.as_deref() == Some(href.as_str())
        {
            return None;
        }
        self.last_seen_href = Some(href);

        let record = self.run(page)?;
        if self.last_sent_href.as_deref() == Some(record.url.as_str()) {
            return None;
        }
        tracing::debug!(url = %record.url, ?event, "emitting detection");
        self.last_sent_href = Some(record.url.clone());
        Some(Message::ProductDetected { payload: record })
    }

    /// Load pass, then a second pass once late-rendered content has settled
    pub fn on_page_load(
        &mut self,
        page: &dyn Page,
        sleep: impl FnOnce(Duration),
    ) -> Vec<Message> {
        let mut sent: Vec<Message> =
            self.on_event(ObserverEvent::Load, page).into_iter().collect();
        sleep(self.settle_delay);
        sent.extend(self.on_event(ObserverEvent::Settle, page));
        sent
    }

    /// Answer messages addressed to the observer
    pub fn on_message(&mut self, msg: &Message, page: &dyn Page) -> Option<Response> {
        match msg {
            Message::ScanNow => Some(Response::with_payload(self.run(page))),
            Message::SidepanelState { is_open } => {
                self.panel_open = *is_open;
                Some(Response::ack())
            }
            _ => None,
        }
    }

    /// The floating control asks the coordinator to flip the panel
    pub fn fab_clicked(&self) -> Message {
        Message::ToggleSidepanel
    }

    fn run(&mut self, page: &dyn Page) -> Option<ProductRecord> {
        let snapshot = page.snapshot();
        self.fab_visible = self.extractor.is_product_page(&snapshot);
        self.extractor.extract(&snapshot)
    }
}
