//! The polling loop: initialise seen-sets, then check every feed in order,
//! deliver what is new, sleep, repeat until shut down.

use crate::config::{BotConfig, FeedConfig};
use crate::formatter::{FormatOptions, PostFormatter};
use crate::openai::TextGenerator;
use crate::parser::entry_id;
use crate::seen::SeenStore;
use crate::traits::{ChannelDelivery, FeedSource};
use crate::types::{ParsedEntry, RelayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Fixed pauses of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    /// After each send to one destination.
    pub send_delay: Duration,
    /// After each feed.
    pub feed_delay: Duration,
    /// After a cycle aborted by a cycle-fatal error.
    pub error_cooldown: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            send_delay: Duration::from_secs(1),
            feed_delay: Duration::from_secs(2),
            error_cooldown: Duration::from_secs(60),
        }
    }
}

impl MonitorTiming {
    pub fn immediate() -> Self {
        Self {
            send_delay: Duration::ZERO,
            feed_delay: Duration::ZERO,
            error_cooldown: Duration::ZERO,
        }
    }
}

/// Stops a running [`Monitor`] from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        // The monitor keeps a receiver alive, so this only fails once it is gone
        let _ = self.tx.send(true);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub entries_found: usize,
    pub new_entries: usize,
    pub sends_ok: usize,
    pub sends_failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub feeds_checked: usize,
    pub feeds_failed: usize,
    pub new_entries: usize,
    pub sends_ok: usize,
    pub sends_failed: usize,
    pub interrupted: bool,
}

pub struct Monitor {
    feeds: Vec<FeedConfig>,
    poll_interval: Duration,
    skip_existing_on_start: bool,
    seen: SeenStore,
    source: Arc<dyn FeedSource>,
    delivery: Arc<dyn ChannelDelivery>,
    formatters: HashMap<String, PostFormatter>,
    timing: MonitorTiming,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Monitor {
    pub fn new(
        config: &BotConfig,
        seen: SeenStore,
        source: Arc<dyn FeedSource>,
        delivery: Arc<dyn ChannelDelivery>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let mut seen = seen;
        let mut formatters = HashMap::new();

        for feed in &config.feeds {
            seen.register_feed(&feed.url);
            formatters.insert(
                feed.url.clone(),
                PostFormatter::new(FormatOptions::from(feed), generator.clone()),
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            feeds: config.feeds.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs()),
            skip_existing_on_start: config.skip_existing_on_start,
            seen,
            source,
            delivery,
            formatters,
            timing: MonitorTiming::default(),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    pub fn with_timing(mut self, timing: MonitorTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Sleep unless shut down first. Returns `true` if shutdown was requested.
    async fn pause(&self, duration: Duration) -> bool {
        if self.shutdown_requested() {
            return true;
        }
        if duration.is_zero() {
            return false;
        }
        let mut shutdown = self.shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        }
    }

    /// Sleep between full passes: the shortest feed interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Mark everything currently in every feed as seen without delivering it.
    /// Returns the number of identifiers recorded.
    pub async fn initialize_feeds(&mut self) -> usize {
        info!("Initializing feeds (marking existing entries as seen)...");
        let mut total = 0;

        for feed in self.feeds.clone() {
            match self.source.fetch(&feed.url).await {
                Ok(parsed) => {
                    for entry in &parsed.entries {
                        if self.seen.mark_seen(&feed.url, &entry_id(entry)) {
                            total += 1;
                        }
                    }
                    info!(
                        "Initialized {} with {} existing entries",
                        feed.name,
                        self.seen.seen_count(&feed.url)
                    );
                }
                Err(e) => {
                    error!("Error initializing feed {}: {}", feed.name, e);
                }
            }
        }

        total
    }

    /// Fetch one feed, record its unseen entries and deliver them oldest
    /// first to every destination of the feed.
    pub async fn check_feed(&mut self, feed: &FeedConfig) -> Result<FeedReport> {
        info!("Checking feed: {} ({})", feed.name, feed.url);

        if !self.formatters.contains_key(&feed.url) {
            return Err(RelayError::Config(format!(
                "feed {} is not part of this monitor's configuration",
                feed.url
            )));
        }

        let parsed = self.source.fetch(&feed.url).await?;
        let mut report = FeedReport {
            entries_found: parsed.entries.len(),
            ..Default::default()
        };

        if parsed.entries.is_empty() {
            warn!("No entries found in feed: {}", feed.name);
            return Ok(report);
        }

        // Recorded before delivery, so a failed send is never retried
        let new_entries: Vec<&ParsedEntry> = parsed
            .entries
            .iter()
            .filter(|entry| self.seen.mark_seen(&feed.url, &entry_id(entry)))
            .collect();
        report.new_entries = new_entries.len();

        if new_entries.is_empty() {
            info!("No new entries in {}", feed.name);
            return Ok(report);
        }

        info!("Found {} new entries in {}", new_entries.len(), feed.name);
        let feed_title = parsed.title.clone().unwrap_or_else(|| feed.name.clone());
        let formatter = self
            .formatters
            .get(&feed.url)
            .ok_or_else(|| RelayError::Config(format!("no formatter for {}", feed.url)))?;

        // Feeds list newest first; deliver in chronological order
        for entry in new_entries.into_iter().rev() {
            let raw = entry.to_raw_entry(&feed_title);
            let post = formatter.format_post(&raw).await;
            let title = raw.title.as_deref().unwrap_or("Untitled");

            for chat_id in &feed.chat_ids {
                if self.delivery.send_post(chat_id, &post).await {
                    info!("Sent post to {}: {}", chat_id, title);
                    report.sends_ok += 1;
                } else {
                    error!("Failed to send post to {}: {}", chat_id, title);
                    report.sends_failed += 1;
                }

                if self.pause(self.timing.send_delay).await {
                    debug!("Shutdown requested during delivery of {}", feed.name);
                    return Ok(report);
                }
            }
        }

        Ok(report)
    }

    /// One pass over all feeds. Recoverable errors are logged per feed;
    /// a cycle-fatal error aborts the pass and is returned.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for feed in self.feeds.clone() {
            if self.shutdown_requested() {
                report.interrupted = true;
                return Ok(report);
            }

            match self.check_feed(&feed).await {
                Ok(feed_report) => {
                    report.feeds_checked += 1;
                    report.new_entries += feed_report.new_entries;
                    report.sends_ok += feed_report.sends_ok;
                    report.sends_failed += feed_report.sends_failed;
                }
                Err(e) if e.is_recoverable() => {
                    error!("Error checking feed {}: {}", feed.name, e);
                    report.feeds_failed += 1;
                }
                Err(e) => return Err(e),
            }

            if self.pause(self.timing.feed_delay).await {
                report.interrupted = true;
                return Ok(report);
            }
        }

        Ok(report)
    }

    /// Verify the bot connection, list the feeds and seed the seen-sets.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting RSS to Telegram relay");

        if !self.delivery.test_connection().await {
            return Err(RelayError::Delivery("failed to connect to Telegram".to_string()));
        }

        info!("Monitoring {} feeds", self.feeds.len());
        for feed in &self.feeds {
            info!("  - {}: {}", feed.name, feed.url);
        }

        if self.skip_existing_on_start {
            self.initialize_feeds().await;
        } else {
            info!("skip_existing_on_start is off, entries present now will be delivered");
        }
        Ok(())
    }

    /// Start, then run exactly one cycle.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.start().await?;
        self.run_cycle().await
    }

    /// Start, then loop until shutdown. Only a failed start is returned as an
    /// error; failures inside the loop are logged and followed by a cooldown.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;
        info!("Starting monitoring loop...");

        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    if report.interrupted {
                        break;
                    }
                    info!(
                        "Cycle done: {} feeds checked, {} failed, {} new entries, {} sends ok, {} sends failed",
                        report.feeds_checked,
                        report.feeds_failed,
                        report.new_entries,
                        report.sends_ok,
                        report.sends_failed
                    );

                    let interval = self.poll_interval();
                    info!("Sleeping for {} seconds...", interval.as_secs());
                    if self.pause(interval).await {
                        break;
                    }
                }
                Err(e) => {
                    error!("Error in main loop: {}", e);
                    if self.pause(self.timing.error_cooldown).await {
                        break;
                    }
                }
            }
        }

        info!("Shutting down gracefully...");
        Ok(())
    }
}
