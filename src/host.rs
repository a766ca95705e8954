//! The browser host, as the coordinator sees it.

use std::time::Duration;

use crate::error::Result;
use crate::messages::Message;
use crate::record::{ProductRecord, TabId};

/// A tab as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// Why a tab-updated event fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabChange {
    pub url_changed: bool,
    pub load_complete: bool,
}

impl TabChange {
    pub fn is_relevant(&self) -> bool {
        self.url_changed || self.load_complete
    }
}

/// Tab, side-panel and messaging capabilities provided by the browser
pub trait Host {
    /// The tab active in the current window
    fn focused_tab(&self) -> Result<Option<TabInfo>>;

    fn get_tab(&self, id: TabId) -> Result<Option<TabInfo>>;

    /// SCAN_NOW round trip to a tab's observer
    fn scan_now(&self, id: TabId) -> Result<Option<ProductRecord>>;

    fn enable_panel(&self, id: TabId) -> Result<()>;

    fn open_panel(&self, id: TabId) -> Result<()>;

    /// Ask the display to close itself
    fn request_panel_close(&self, id: TabId) -> Result<()>;

    /// Push a message to the display
    fn send_to_display(&self, msg: Message) -> Result<()>;

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
