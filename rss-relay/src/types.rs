use chrono::{DateTime, Utc};
pub use interfaces::defs::{MediaAttachment, MediaKind, ParseMode, RawEntry, RenderedPost};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Relay/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
    /// Non-fatal problems noticed while parsing, logged by the caller.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedEntry {
    pub id: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub media: Vec<MediaAttachment>,
}

impl ParsedEntry {
    pub fn to_raw_entry(&self, feed_title: &str) -> RawEntry {
        RawEntry {
            title: self.title.clone(),
            author: self.author.clone(),
            summary: self.summary.clone(),
            link: self.link.clone(),
            content: self.content.clone(),
            feed_title: Some(feed_title.to_string()),
            published_at: self.published_at,
            media_attachments: self.media.clone(),
        }
    }
}

/// How the monitor treats an error: skip and carry on, or abort the cycle
/// and cool down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    Recoverable,
    CycleFatal,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    pub fn fetch(url: &str, message: impl Into<String>) -> Self {
        RelayError::Fetch {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn tier(&self) -> ErrorTier {
        match self {
            RelayError::Fetch { .. }
            | RelayError::Parse(_)
            | RelayError::Delivery(_)
            | RelayError::Generation(_)
            | RelayError::Http(_) => ErrorTier::Recoverable,
            RelayError::Config(_)
            | RelayError::InvalidUrl(_)
            | RelayError::Io(_)
            | RelayError::Serialization(_) => ErrorTier::CycleFatal,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.tier() == ErrorTier::Recoverable
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
