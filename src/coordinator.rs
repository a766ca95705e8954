//! Background coordinator.
//!
//! Owns the per-tab record map and the last-active slot, mediates between page
//! observers and the display, and decides when the display should change. Host
//! failures are logged and treated as no-ops; nothing here returns an error to the
//! caller.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::fetch::{inline_cover, Fetcher};
use crate::host::{Host, TabChange, TabInfo};
use crate::messages::{Message, Response};
use crate::record::{ProductRecord, TabId};
use crate::store::{get_json, set_json, KeyValueStore};

pub const LAST_ACTIVE_KEY: &str = "lastActiveProduct";

pub fn tab_key(tab: TabId) -> String {
    format!("lastProduct:{}", tab)
}

/// Session-scoped record map: one slot per tab plus the global last-active slot
#[derive(Clone)]
pub struct TabRecords {
    store: Arc<dyn KeyValueStore>,
}

impl TabRecords {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, tab: TabId) -> Result<Option<ProductRecord>> {
        get_json(self.store.as_ref(), &tab_key(tab))
    }

    pub fn set(&self, tab: TabId, record: &ProductRecord) -> Result<()> {
        set_json(self.store.as_ref(), &tab_key(tab), record)
    }

    /// Explicit clear back to the no-record state
    pub fn clear(&self, tab: TabId) -> Result<()> {
        self.store.remove(&tab_key(tab))
    }

    pub fn last_active(&self) -> Result<Option<ProductRecord>> {
        get_json(self.store.as_ref(), LAST_ACTIVE_KEY)
    }

    pub fn promote(&self, record: &ProductRecord) -> Result<()> {
        set_json(self.store.as_ref(), LAST_ACTIVE_KEY, record)
    }
}

/// What a focused-tab sync ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The host reported no focused tab
    NoFocusedTab,
    /// A stored record was pushed to the display
    Displayed(TabId),
    /// Not a product-area tab; the display keeps what it shows
    Preserved,
    /// A scan on the tab succeeded
    Scanned(TabId),
    /// Every scan attempt came back empty
    GaveUp,
}

pub struct Coordinator<H: Host> {
    host: H,
    records: TabRecords,
    fetcher: Arc<dyn Fetcher>,
    config: Config,
    panel_open: HashMap<TabId, bool>,
}

impl<H: Host> Coordinator<H> {
    pub fn new(
        host: H,
        session: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn Fetcher>,
        config: Config,
    ) -> Self {
        Self {
            host,
            records: TabRecords::new(session),
            fetcher,
            config,
            panel_open: HashMap::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn records(&self) -> &TabRecords {
        &self.records
    }

    /// Parse a raw message at the boundary, then dispatch it
    pub fn handle_raw(&mut self, raw: &str, sender: Option<TabId>) -> Response {
        match Message::parse(raw) {
            Ok(msg) => self.handle(msg, sender),
            Err(e) => Response::error(e.to_string()),
        }
    }

    /// Dispatch one message; `sender` is the tab the message came from, if any
    pub fn handle(&mut self, msg: Message, sender: Option<TabId>) -> Response {
        debug!(kind = msg.kind(), ?sender, "message");
        match msg {
            Message::ProductDetected { payload } => self.on_product_detected(sender, payload),
            Message::OpenSidepanel => self.on_open_panel(sender),
            Message::ToggleSidepanel => self.on_toggle_panel(sender),
            Message::GetLastProduct { tab_id } => self.last_product(tab_id),
            Message::GetLastActiveProduct => self.last_active_product(),
            Message::SidepanelState { is_open } => {
                if let Some(tab) = sender.or_else(|| self.focused().map(|t| t.id)) {
                    self.panel_open.insert(tab, is_open);
                }
                Response::ack()
            }
            Message::SidepanelUpdate { .. } | Message::ScanNow => {
                Response::error("Unknown message type")
            }
        }
    }

    /// Store a detection; promote and push it when it came from the focused tab
    pub fn on_product_detected(&mut self, tab: Option<TabId>, record: ProductRecord) -> Response {
        let Some(tab) = tab else {
            return Response::error("No sender tabId");
        };
        let record = record.sanitized();
        if !record.is_valid() {
            return Response::error("Payload lacks title or cover");
        }

        let record = self.accept(tab, record);
        self.best_effort("enable panel", self.host.enable_panel(tab));

        let active = self.focused().is_some_and(|t| t.id == tab);
        if active {
            self.show(tab, &record);
        }
        info!(%tab, active, url = %record.url, "product detected");

        Response {
            ok: true,
            payload: Some(record),
            tab_id: Some(tab),
            active: Some(active),
            ..Default::default()
        }
    }

    pub fn on_tab_activated(&mut self, tab: TabId) -> SyncOutcome {
        debug!(%tab, "tab activated");
        self.sync_focused_tab()
    }

    pub fn on_tab_updated(&mut self, tab: TabId, change: TabChange) -> SyncOutcome {
        if !change.is_relevant() {
            return SyncOutcome::Preserved;
        }
        match self.focused() {
            Some(focused) if focused.id == tab => self.sync_focused_tab(),
            _ => SyncOutcome::Preserved,
        }
    }

    /// Bring the display in line with the focused tab.
    ///
    /// A stored record is shown at once. A tab outside the product area leaves the
    /// display untouched. Otherwise the tab's observer is asked to scan a bounded
    /// number of times.
    pub fn sync_focused_tab(&mut self) -> SyncOutcome {
        let Some(tab) = self.focused() else {
            return SyncOutcome::NoFocusedTab;
        };

        match self.records.get(tab.id) {
            Ok(Some(record)) => {
                self.show(tab.id, &record);
                return SyncOutcome::Displayed(tab.id);
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "session read failed"),
        }

        if !self.config.site.is_product_area(&tab.url) {
            debug!(url = %tab.url, "not a product tab, keeping current display");
            return SyncOutcome::Preserved;
        }

        self.scan_with_retry(tab)
    }

    fn scan_with_retry(&mut self, tab: TabInfo) -> SyncOutcome {
        let attempts = self.config.retry_attempts.max(1);
        for attempt in 1..=attempts {
            match self.host.scan_now(tab.id).map(|r| r.map(ProductRecord::sanitized)) {
                Ok(Some(record)) if record.is_valid() => {
                    let record = self.accept(tab.id, record);
                    // the user may have moved on while we were scanning
                    if self.focused().is_some_and(|t| t.id == tab.id) {
                        self.show(tab.id, &record);
                    }
                    info!(tab = %tab.id, attempt, "scan succeeded");
                    return SyncOutcome::Scanned(tab.id);
                }
                Ok(_) => debug!(tab = %tab.id, attempt, "scan returned nothing"),
                Err(e) => debug!(tab = %tab.id, attempt, error = %e, "scan failed"),
            }
            if attempt < attempts {
                self.host.sleep(self.config.retry_delay());
            }
        }
        SyncOutcome::GaveUp
    }

    pub fn on_open_panel(&mut self, sender: Option<TabId>) -> Response {
        let Some(tab) = sender.or_else(|| self.focused().map(|t| t.id)) else {
            return Response::error("No sender tabId (OPEN_SIDEPANEL)");
        };

        self.best_effort("enable panel", self.host.enable_panel(tab));
        if let Err(e) = self.host.open_panel(tab) {
            return Response {
                ok: false,
                opened: Some(false),
                error: Some(e.to_string()),
                ..Default::default()
            };
        }
        self.panel_open.insert(tab, true);

        self.sync_focused_tab();

        let in_product_area = match self.host.get_tab(tab) {
            Ok(Some(info)) => self.config.site.is_product_area(&info.url),
            _ => false,
        };
        if !in_product_area {
            match self.records.last_active() {
                Ok(Some(record)) => self.broadcast(tab, &record),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "session read failed"),
            }
        }

        Response {
            ok: true,
            opened: Some(true),
            ..Default::default()
        }
    }

    pub fn on_toggle_panel(&mut self, sender: Option<TabId>) -> Response {
        let Some(tab) = sender.or_else(|| self.focused().map(|t| t.id)) else {
            return Response::error("No sender tabId (TOGGLE_SIDEPANEL)");
        };
        if self.panel_open.get(&tab).copied().unwrap_or(false) {
            self.best_effort("close panel", self.host.request_panel_close(tab));
            self.panel_open.insert(tab, false);
            return Response {
                ok: true,
                opened: Some(false),
                ..Default::default()
            };
        }
        self.on_open_panel(Some(tab))
    }

    /// GET_LAST_PRODUCT: the stored record for a tab, or null
    pub fn last_product(&self, tab: Option<TabId>) -> Response {
        let payload = tab.and_then(|t| self.records.get(t).unwrap_or_default());
        Response {
            tab_id: tab,
            ..Response::with_payload(payload)
        }
    }

    /// GET_LAST_ACTIVE_PRODUCT: the global fallback record
    pub fn last_active_product(&self) -> Response {
        Response::with_payload(self.records.last_active().unwrap_or_default())
    }

    /// Stamp, inline the cover and store a record under its tab
    fn accept(&self, tab: TabId, mut record: ProductRecord) -> ProductRecord {
        record.stamp_now();
        if record.cover_data_url.is_none() {
            record.cover_data_url =
                inline_cover(self.fetcher.as_ref(), &record.cover_url, self.config.max_cover_bytes);
        }
        self.best_effort("store record", self.records.set(tab, &record));
        record
    }

    /// Promote to last-active and push to the display
    fn show(&self, tab: TabId, record: &ProductRecord) {
        self.best_effort("promote record", self.records.promote(record));
        self.broadcast(tab, record);
    }

    fn broadcast(&self, tab: TabId, record: &ProductRecord) {
        let msg = Message::SidepanelUpdate {
            payload: Some(record.clone()),
            tab_id: Some(tab),
        };
        self.best_effort("display update", self.host.send_to_display(msg));
    }

    fn focused(&self) -> Option<TabInfo> {
        self.host.focused_tab().unwrap_or_else(|e| {
            debug!(error = %e, "focused tab query failed");
            None
        })
    }

    fn best_effort(&self, what: &str, result: Result<()>) {
        if let Err(e) = result {
            debug!(error = %e, "{} failed", what);
        }
    }
}
