//! Cross-context message protocol.
//!
//! Every message is a JSON object discriminated by its `type` field. Payloads are
//! validated when a message is parsed, before anything is dispatched.

use serde::{Deserialize, Serialize};

use crate::error::{LensError, Result};
use crate::record::{ProductRecord, TabId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// observer → coordinator
    ProductDetected { payload: ProductRecord },
    /// observer/UI → coordinator
    OpenSidepanel,
    /// observer → coordinator
    ToggleSidepanel,
    /// display → coordinator
    GetLastProduct {
        #[serde(default, rename = "tabId")]
        tab_id: Option<TabId>,
    },
    /// display → coordinator
    GetLastActiveProduct,
    /// coordinator → display (push)
    SidepanelUpdate {
        payload: Option<ProductRecord>,
        #[serde(default, rename = "tabId")]
        tab_id: Option<TabId>,
    },
    /// coordinator → observer
    ScanNow,
    /// observer ↔ display
    SidepanelState {
        #[serde(rename = "isOpen")]
        is_open: bool,
    },
}

impl Message {
    /// Parse and validate a raw message
    pub fn parse(raw: &str) -> Result<Self> {
        let msg: Message = serde_json::from_str(raw)
            .map_err(|e| LensError::ProtocolError(e.to_string()))?;
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Message::ProductDetected { payload } if payload.url.trim().is_empty() => Err(
                LensError::ProtocolError("PRODUCT_DETECTED payload has no url".into()),
            ),
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::ProductDetected { .. } => "PRODUCT_DETECTED",
            Message::OpenSidepanel => "OPEN_SIDEPANEL",
            Message::ToggleSidepanel => "TOGGLE_SIDEPANEL",
            Message::GetLastProduct { .. } => "GET_LAST_PRODUCT",
            Message::GetLastActiveProduct => "GET_LAST_ACTIVE_PRODUCT",
            Message::SidepanelUpdate { .. } => "SIDEPANEL_UPDATE",
            Message::ScanNow => "SCAN_NOW",
            Message::SidepanelState { .. } => "SIDEPANEL_STATE",
        }
    }
}

/// Reply to a request message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ProductRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ack() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn with_payload(payload: Option<ProductRecord>) -> Self {
        Self {
            ok: true,
            payload,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}
