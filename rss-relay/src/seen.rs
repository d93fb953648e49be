use std::collections::{HashMap, HashSet};

/// In-memory record of entry identifiers already handled, one set per feed
/// URL. Lives as long as the monitor that owns it; nothing is ever removed.
#[derive(Debug, Default, Clone)]
pub struct SeenStore {
    feeds: HashMap<String, HashSet<String>>,
}

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a feed has a (possibly empty) set.
    pub fn register_feed(&mut self, feed_url: &str) {
        self.feeds.entry(feed_url.to_string()).or_default();
    }

    pub fn is_new(&self, feed_url: &str, id: &str) -> bool {
        self.feeds
            .get(feed_url)
            .map_or(true, |ids| !ids.contains(id))
    }

    /// Returns `true` if the id was not seen before.
    pub fn mark_seen(&mut self, feed_url: &str, id: &str) -> bool {
        self.feeds
            .entry(feed_url.to_string())
            .or_default()
            .insert(id.to_string())
    }

    pub fn seen_count(&self, feed_url: &str) -> usize {
        self.feeds.get(feed_url).map_or(0, HashSet::len)
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }
}
