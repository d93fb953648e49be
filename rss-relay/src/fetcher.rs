use crate::types::{FetchConfig, RelayError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Download one feed document. One attempt; the monitor's next pass is
    /// the retry.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RelayError::fetch(url, format!("unsupported scheme: {}", parsed.scheme())));
        }

        debug!("Fetching feed: {}", url);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| RelayError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::fetch(
                url,
                format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown")),
            ));
        }

        let max_bytes = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > max_bytes {
                return Err(RelayError::fetch(
                    url,
                    format!("feed too large: {} bytes (max {} bytes)", content_length, max_bytes),
                ));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::fetch(url, format!("failed to read response: {}", e)))?;

        if bytes.len() > max_bytes {
            return Err(RelayError::fetch(
                url,
                format!("feed too large: {} bytes (max {} bytes)", bytes.len(), max_bytes),
            ));
        }

        info!(
            "Fetched feed: {} ({} bytes in {}ms)",
            url,
            bytes.len(),
            start_time.elapsed().as_millis()
        );
        Ok(bytes.to_vec())
    }
}
