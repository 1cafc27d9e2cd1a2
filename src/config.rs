use clap::Parser;
use std::env;
use std::fmt::Debug;
use thiserror::Error;

pub const CONSUMER_KEY_ENV: &str = "SENTIBOT_CONSUMER_KEY";
pub const CONSUMER_SECRET_ENV: &str = "SENTIBOT_CONSUMER_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "SENTIBOT_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_ENV: &str = "SENTIBOT_ACCESS_TOKEN_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Auth tokens are not set as environment variables: {}", .0.join(", "))]
    AuthConfigMissing(Vec<String>),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "A bot that replies to mentions with sentiment analysis charts"
)]
pub struct AppSettings {
    /// Total run time budget (in seconds)
    #[arg(default_value_t = 300)]
    pub run_seconds: u64,

    /// How often to poll for new mentions (in seconds)
    #[arg(long, env = "SENTIBOT_POLL_INTERVAL_SECONDS", default_value_t = 60)]
    pub poll_interval_seconds: u64,

    /// Maximum number of mentions fetched per poll
    #[arg(long, env = "SENTIBOT_MENTION_BATCH_SIZE", default_value_t = 100)]
    pub mention_batch_size: u32,

    /// Number of timeline pages fetched for each analyzed user
    #[arg(long, env = "SENTIBOT_TIMELINE_PAGES", default_value_t = 1)]
    pub timeline_pages: u32,

    /// Number of posts requested per timeline page
    #[arg(long, env = "SENTIBOT_TIMELINE_PAGE_SIZE", default_value_t = 100)]
    pub timeline_page_size: u32,

    /// File holding the id of the last processed mention
    #[arg(long, env = "SENTIBOT_CURSOR_FILE", default_value = "since.id")]
    pub cursor_file: String,

    /// Folder the analysis charts are saved to
    #[arg(long, env = "SENTIBOT_CHART_DIR", default_value = "Analyses")]
    pub chart_dir: String,

    /// REST API base URL
    #[arg(
        long,
        env = "SENTIBOT_API_BASE_URL",
        default_value = "https://api.twitter.com/1.1/"
    )]
    pub api_base_url: String,

    /// Media upload API base URL
    #[arg(
        long,
        env = "SENTIBOT_UPLOAD_BASE_URL",
        default_value = "https://upload.twitter.com/1.1/"
    )]
    pub upload_base_url: String,

    /// HTTP request timeout (in seconds)
    #[arg(long, env = "SENTIBOT_REQUEST_TIMEOUT_SECONDS", default_value_t = 30)]
    pub request_timeout_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SENTIBOT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// OAuth credentials, populated from the environment only
    #[arg(skip)]
    pub consumer_key: Option<String>,
    #[arg(skip)]
    pub consumer_secret: Option<String>,
    #[arg(skip)]
    pub access_token: Option<String>,
    #[arg(skip)]
    pub access_token_secret: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            run_seconds: 300,
            poll_interval_seconds: 60,
            mention_batch_size: 100,
            timeline_pages: 1,
            timeline_page_size: 100,
            cursor_file: "since.id".to_string(),
            chart_dir: "Analyses".to_string(),
            api_base_url: "https://api.twitter.com/1.1/".to_string(),
            upload_base_url: "https://upload.twitter.com/1.1/".to_string(),
            request_timeout_seconds: 30,
            log_level: "info".to_string(),
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
        }
    }
}

/// OAuth 1.0a user-context credentials.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl AppSettings {
    /// Returns the four credentials or lists every one that is missing.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let fields = [
            (CONSUMER_KEY_ENV, &self.consumer_key),
            (CONSUMER_SECRET_ENV, &self.consumer_secret),
            (ACCESS_TOKEN_ENV, &self.access_token),
            (ACCESS_TOKEN_SECRET_ENV, &self.access_token_secret),
        ];
        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::AuthConfigMissing(missing));
        }

        let take = |value: &Option<String>| value.clone().unwrap_or_default();
        Ok(Credentials {
            consumer_key: take(&self.consumer_key),
            consumer_secret: take(&self.consumer_secret),
            access_token: take(&self.access_token),
            access_token_secret: take(&self.access_token_secret),
        })
    }
}

/// Validate that the timeline page count is within the platform's paging limits
pub(crate) fn validate_timeline_pages(value: u32) -> Result<u32, String> {
    const MIN_PAGES: u32 = 1;
    const MAX_PAGES: u32 = 16;

    if !(MIN_PAGES..=MAX_PAGES).contains(&value) {
        Err(format!(
            "timeline_pages must be between {MIN_PAGES} and {MAX_PAGES}, got {value}"
        ))
    } else {
        Ok(value)
    }
}

/// Validate that the timeline page size is within what one request may return
pub(crate) fn validate_timeline_page_size(value: u32) -> Result<u32, String> {
    const MAX_PAGE_SIZE: u32 = 200;

    if value == 0 || value > MAX_PAGE_SIZE {
        Err(format!(
            "timeline_page_size must be between 1 and {MAX_PAGE_SIZE}, got {value}"
        ))
    } else {
        Ok(value)
    }
}

pub(crate) fn validate_mention_batch_size(value: u32) -> Result<u32, String> {
    const MAX_BATCH_SIZE: u32 = 100;

    if value == 0 || value > MAX_BATCH_SIZE {
        Err(format!(
            "mention_batch_size must be between 1 and {MAX_BATCH_SIZE}, got {value}"
        ))
    } else {
        Ok(value)
    }
}

pub(crate) fn validate_poll_interval(value: u64) -> Result<u64, String> {
    if value == 0 {
        Err("poll_interval_seconds must be at least 1, got 0".to_string())
    } else {
        Ok(value)
    }
}

/// Checks every bounded setting, then the credentials.
pub fn validate_settings(app_settings: &mut AppSettings) -> Result<Credentials, ConfigError> {
    app_settings.timeline_pages =
        validate_timeline_pages(app_settings.timeline_pages).map_err(ConfigError::Invalid)?;
    app_settings.timeline_page_size = validate_timeline_page_size(app_settings.timeline_page_size)
        .map_err(ConfigError::Invalid)?;
    app_settings.mention_batch_size = validate_mention_batch_size(app_settings.mention_batch_size)
        .map_err(ConfigError::Invalid)?;
    app_settings.poll_interval_seconds =
        validate_poll_interval(app_settings.poll_interval_seconds).map_err(ConfigError::Invalid)?;

    app_settings.credentials()
}

pub fn load_config() -> Result<(AppSettings, Credentials), ConfigError> {
    // Parse command line arguments and environment variables
    let mut app_settings = AppSettings::parse();

    // Credentials come from the environment only (no CLI argument for security)
    app_settings.consumer_key = env::var(CONSUMER_KEY_ENV).ok();
    app_settings.consumer_secret = env::var(CONSUMER_SECRET_ENV).ok();
    app_settings.access_token = env::var(ACCESS_TOKEN_ENV).ok();
    app_settings.access_token_secret = env::var(ACCESS_TOKEN_SECRET_ENV).ok();

    let credentials = validate_settings(&mut app_settings)?;
    Ok((app_settings, credentials))
}
