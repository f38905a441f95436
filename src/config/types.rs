use serde::Deserialize;

/// Main configuration structure for Livetide
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Identity and endpoints of the platform being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Short machine code for the site (e.g. "douyu")
    pub code: String,

    /// Human-readable site name
    pub name: String,

    /// Base URL of the site, used for Host/Referer headers and for
    /// resolving relative room URLs
    pub url: String,

    /// Channel list endpoint
    #[serde(rename = "channel-list-url")]
    pub channel_list_url: String,

    /// Paginated room list endpoint; `{channel}` is replaced by the
    /// channel office id, offset/limit are appended as query parameters
    #[serde(rename = "room-list-url")]
    pub room_list_url: String,

    /// Room detail endpoint; `{room}` is replaced by the room office id
    #[serde(rename = "room-detail-url")]
    pub room_detail_url: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent crawl tasks per cycle
    pub concurrency: usize,

    /// Page size for the paginated room list endpoint
    #[serde(rename = "page-limit")]
    pub page_limit: usize,

    /// Attempts per room list page before the scan task gives up
    #[serde(rename = "fetch-retries")]
    pub fetch_retries: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            page_limit: 100,
            fetch_retries: 3,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
