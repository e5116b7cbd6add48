//! Engine configuration loaded from environment variables.

use booking_store::{PostgresStore, StoreError};
use common::PageRequest;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Booking engine configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BOOKING_PAGE_SIZE`: default page size for paginated queries (default: `10`)
/// - `BOOKING_LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL for [`connect_postgres`](Self::connect_postgres);
///   unset means the in-memory stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub page_size: usize,
    pub log_format: LogFormat,
    pub log_level: String,
    pub database_url: Option<String>,
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            page_size: lookup("BOOKING_PAGE_SIZE")
                .and_then(|size| size.trim().parse().ok())
                .filter(|&size| size > 0)
                .unwrap_or(defaults.page_size),
            log_format: lookup("BOOKING_LOG_FORMAT")
                .and_then(|format| LogFormat::parse(&format))
                .unwrap_or(defaults.log_format),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        }
    }

    /// Connects to `database_url` and applies the migrations.
    ///
    /// Returns `None` when no URL is configured.
    pub async fn connect_postgres(&self) -> Result<Option<PostgresStore>, StoreError> {
        let Some(url) = self.database_url.as_deref() else {
            return Ok(None);
        };
        let store = PostgresStore::connect(url).await?;
        store.run_migrations().await?;
        tracing::info!("connected to postgres and applied migrations");
        Ok(Some(store))
    }

    /// Builds a request for `page` using the configured page size.
    pub fn page(&self, page: usize) -> PageRequest {
        PageRequest::of(page, self.page_size)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
            database_url: None,
        }
    }
}
