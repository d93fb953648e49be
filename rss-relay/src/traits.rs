use crate::types::{ParsedFeed, RenderedPost, Result};
use async_trait::async_trait;

/// Something that can produce the current document of a feed URL.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed. Entries come back in document order.
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}

/// Sends rendered posts to one destination channel.
#[async_trait]
pub trait ChannelDelivery: Send + Sync {
    /// Check credentials against the platform. Logs the bot identity.
    async fn test_connection(&self) -> bool;

    /// Deliver one post. Never fails past this boundary: transport and API
    /// errors come back as `false`.
    async fn send_post(&self, chat_id: &str, post: &RenderedPost) -> bool;
}
