use crate::traits::FeedSource;
use crate::types::{FetchConfig, ParsedFeed, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{info, warn};

/// Feed source backed by HTTP: download with [`Fetcher`], parse with
/// [`FeedParser`].
pub struct HttpFeedSource {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl HttpFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        info!("Pulling RSS feed: {}", url);

        let content = self.fetcher.fetch_feed(url).await?;
        let parsed_feed = self.parser.parse_feed(&content)?;

        for warning in &parsed_feed.warnings {
            warn!("Feed parsing warning for {}: {}", url, warning);
        }

        Ok(parsed_feed)
    }
}
