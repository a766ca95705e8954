use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{LensError, Result};

/// Global artbook-lens configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How many times the coordinator asks a freshly focused tab to scan
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between scan attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Delay before the observer's second detection pass
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Maximum number of history entries kept
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Page-count cache TTL in seconds
    #[serde(default = "default_pages_cache_ttl")]
    pub pages_cache_ttl_secs: u64,

    /// FX rate cache TTL in seconds
    #[serde(default = "default_fx_max_age")]
    pub fx_max_age_secs: u64,

    /// Covers larger than this are not inlined
    #[serde(default = "default_max_cover_bytes")]
    pub max_cover_bytes: u64,

    /// JPY base, EUR symbol exchange-rate endpoint
    #[serde(default = "default_fx_endpoint")]
    pub fx_endpoint: String,

    /// Appended to video search queries
    #[serde(default = "default_video_suffix")]
    pub video_query_suffix: String,

    /// The catalog site being observed
    #[serde(default)]
    pub site: SiteConfig,
}

/// Which pages of which site count as product pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Host suffix of the catalog (e.g. "suruga-ya.com")
    pub host: String,
    /// Case-insensitive regex matched against the URL path
    pub product_path_pattern: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: "suruga-ya.com".to_string(),
            product_path_pattern: r"/en/product/".to_string(),
        }
    }
}

impl SiteConfig {
    fn path_regex(&self) -> Option<Regex> {
        Regex::new(&format!("(?i){}", self.product_path_pattern)).ok()
    }

    /// True when a URL path looks like a product page, regardless of host
    pub fn is_product_path(&self, path: &str) -> bool {
        self.path_regex().is_some_and(|re| re.is_match(path))
    }

    /// True when a tab URL is on the catalog host and inside its product area
    pub fn is_product_area(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let on_site = parsed.host_str().is_some_and(|h| {
            let h = h.to_ascii_lowercase();
            h == self.host || h.ends_with(&format!(".{}", self.host))
        });
        on_site && self.is_product_path(parsed.path())
    }
}

fn default_retry_attempts() -> u32 {
    4
}

fn default_retry_delay_ms() -> u64 {
    450
}

fn default_settle_delay_ms() -> u64 {
    900
}

fn default_history_limit() -> usize {
    200
}

fn default_pages_cache_ttl() -> u64 {
    60 * 60 * 24 * 30 // 30 days
}

fn default_fx_max_age() -> u64 {
    60 * 60 * 24
}

fn default_max_cover_bytes() -> u64 {
    6_000_000
}

fn default_fx_endpoint() -> String {
    "https://api.exchangerate.host/latest?base=JPY&symbols=EUR".to_string()
}

fn default_video_suffix() -> String {
    " flipthrough".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            history_limit: default_history_limit(),
            pages_cache_ttl_secs: default_pages_cache_ttl(),
            fx_max_age_secs: default_fx_max_age(),
            max_cover_bytes: default_max_cover_bytes(),
            fx_endpoint: default_fx_endpoint(),
            video_query_suffix: default_video_suffix(),
            site: SiteConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn pages_cache_ttl_ms(&self) -> i64 {
        (self.pages_cache_ttl_secs as i64).saturating_mul(1000)
    }

    pub fn fx_max_age_ms(&self) -> i64 {
        (self.fx_max_age_secs as i64).saturating_mul(1000)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "artbook-lens")
            .ok_or_else(|| LensError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "artbook-lens")
            .ok_or_else(|| LensError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports ARTBOOK_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("ARTBOOK_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("artbook.db"))
    }
}
