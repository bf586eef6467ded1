use serde::Deserialize;

/// Main configuration structure for Gallery-Harvest
///
/// Every section is optional in the TOML file; missing keys take the defaults
/// below, so a run without any config file behaves like the reference setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Page fetching configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Maximum attempts per page request (including the first)
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// First backoff delay; doubles after every failed attempt (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    /// Status codes that are retried instead of failing immediately
    #[serde(rename = "retry-statuses")]
    pub retry_statuses: Vec<u16>,

    /// Whole-request timeout for page fetches (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Most pages walked per category or album, whatever the page count says
    #[serde(rename = "max-pages")]
    pub max_pages: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("gallery-harvest/{}", env!("CARGO_PKG_VERSION")),
            max_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            retry_statuses: vec![500, 502, 503, 504],
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_pages: 1_000,
        }
    }
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Number of images downloaded in parallel
    pub workers: u32,

    /// Attempts per image before it is skipped
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed pause between two attempts of the same image (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Timeout for a single image request, body included (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Referer pinned on image requests; defaults to the seed's origin
    pub referer: Option<String>,

    /// Leave files that already exist untouched instead of downloading again
    #[serde(rename = "skip-existing")]
    pub skip_existing: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            max_attempts: 3,
            retry_delay_ms: 2_000,
            timeout_secs: 120,
            referer: None,
            skip_existing: false,
        }
    }
}

/// Output layout configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root folder that receives one sub-folder per category
    pub root: String,

    /// Extension given to every downloaded image
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "Images".to_string(),
            extension: "jpg".to_string(),
        }
    }
}
