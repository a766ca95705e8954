use thiserror::Error;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Extraction failed: {0}")]
    ExtractionError(String),

    #[error("Not a product page: {0}")]
    NotAProductPage(String),

    #[error("Host call failed: {0}")]
    HostError(String),

    #[error("Invalid message: {0}")]
    ProtocolError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LensError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            LensError::HttpError(_) => Some(
                "Check your internet connection, or inspect a saved copy:\n  artbook inspect page.html --url <product-url>"
            ),
            LensError::NotAProductPage(_) => Some(
                "Only catalog product pages (…/en/product/…) with a title and cover image are recognised"
            ),
            LensError::ExtractionError(_) => Some(
                "Save the page from your browser and run `artbook inspect <file> --url <product-url>`"
            ),
            LensError::DatabaseError(_) | LensError::MigrationError(_) => Some(
                "Run `artbook config path` to locate the database, or set ARTBOOK_DB to a fresh file"
            ),
            LensError::ConfigError(_) | LensError::TomlError(_) => Some(
                "Check the config file shown by `artbook config path`"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LensError>;
