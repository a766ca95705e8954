use base64::Engine as _;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::error::{LensError, Result};

/// Default HTTP request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; artbook-lens/0.1)";

/// Shared HTTP agent for connection pooling
static HTTP_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
        .build()
        .into()
});

/// A binary response body
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Network access as seen by the extension
pub trait Fetcher: Send + Sync {
    /// GET a URL and return its body as text; non-2xx responses are errors
    fn get_text(&self, url: &str) -> Result<String>;

    /// GET a URL, reading at most `limit` bytes of body
    fn get_bytes(&self, url: &str, limit: u64) -> Result<FetchedBytes>;
}

/// Fetch and deserialize a JSON document
pub fn get_json<T: serde::de::DeserializeOwned>(fetcher: &dyn Fetcher, url: &str) -> Result<T> {
    let body = fetcher.get_text(url)?;
    Ok(serde_json::from_str(&body)?)
}

/// Fetcher over the shared ureq agent
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn get_text(&self, url: &str) -> Result<String> {
        let response = HTTP_AGENT.get(url).header("User-Agent", USER_AGENT).call()?;
        Ok(response.into_body().read_to_string()?)
    }

    fn get_bytes(&self, url: &str, limit: u64) -> Result<FetchedBytes> {
        let mut response = HTTP_AGENT.get(url).header("User-Agent", USER_AGENT).call()?;
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.body_mut().with_config().limit(limit).read_to_vec()?;
        Ok(FetchedBytes { content_type, bytes })
    }
}

/// Load HTML from a URL or a local file
pub fn load_html(fetcher: &dyn Fetcher, source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return fetcher.get_text(source);
    }
    std::fs::read_to_string(source).map_err(|e| {
        LensError::ExtractionError(format!("Could not read '{}': {}", source, e))
    })
}

/// Inline an image as a `data:` URL.
///
/// Returns `None` on any fetch failure or when the body exceeds `max_bytes`;
/// callers keep using the original URL in that case.
pub fn inline_cover(fetcher: &dyn Fetcher, url: &str, max_bytes: u64) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let fetched = match fetcher.get_bytes(url, max_bytes.saturating_add(1)) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(url, error = %e, "cover inlining skipped");
            return None;
        }
    };
    if fetched.bytes.len() as u64 > max_bytes {
        tracing::debug!(url, size = fetched.bytes.len(), "cover too large to inline");
        return None;
    }
    let content_type = fetched
        .content_type
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "image/jpeg".to_string());
    let encoded = base64::engine::general_purpose::STANDARD.encode(&fetched.bytes);
    Some(format!("data:{};base64,{}", content_type, encoded))
}
