use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::FxCache;
use crate::fetch::{get_json, Fetcher};

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Best-effort JPY→EUR conversion rate
#[derive(Clone)]
pub struct FxRates {
    cache: FxCache,
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
}

impl FxRates {
    pub fn new(cache: FxCache, fetcher: Arc<dyn Fetcher>, endpoint: impl Into<String>) -> Self {
        Self {
            cache,
            fetcher,
            endpoint: endpoint.into(),
        }
    }

    /// Cached rate if fresh, otherwise a fetched one; `None` when unavailable
    pub fn jpy_to_eur(&self, now_ms: i64) -> Option<f64> {
        match self.cache.get(now_ms) {
            Ok(Some(rate)) => return Some(rate),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "fx cache read failed"),
        }

        let response: RatesResponse = match get_json(self.fetcher.as_ref(), &self.endpoint) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "fx fetch failed");
                return None;
            }
        };
        let rate = response
            .rates
            .get("EUR")
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)?;

        if let Err(e) = self.cache.put(rate, now_ms) {
            tracing::debug!(error = %e, "fx cache write failed");
        }
        Some(rate)
    }
}
