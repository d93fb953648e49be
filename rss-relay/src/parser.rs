use crate::types::{MediaAttachment, ParsedEntry, ParsedFeed, RelayError, Result};
use crate::utils::text::strip_html;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

/// Stable identity of an entry: its id, else its link, else its title.
pub fn entry_id(entry: &ParsedEntry) -> String {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if !entry.id.trim().is_empty() {
        return entry.id.clone();
    }
    non_empty(&entry.link)
        .or_else(|| non_empty(&entry.title))
        .unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &[u8]) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // Keep only ids the document carries, so `entry_id` can fall back to
        // the link instead of a hash that changes with every title edit
        let feed = parser::Builder::new()
            .id_generator(|_, _, _| String::new())
            .build()
            .parse(content)
            .map_err(|e| RelayError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let mut warnings = Vec::new();

        let mut entries = Vec::with_capacity(feed.entries.len());
        for (index, entry) in feed.entries.into_iter().enumerate() {
            let parsed = self.parse_entry(entry);
            if parsed.link.is_none() {
                warnings.push(format!("entry {} has no link", index));
            }
            if parsed.title.is_none() && parsed.summary.is_none() && parsed.content.is_none() {
                warnings.push(format!("entry {} has no title or text", index));
            }
            if entry_id(&parsed).is_empty() {
                warnings.push(format!(
                    "entry {} has no id, link or title and is indistinguishable from others like it",
                    index
                ));
            }
            entries.push(parsed);
        }

        if entries.is_empty() {
            warnings.push("feed has no entries".to_string());
        }

        info!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed {
            title,
            entries,
            warnings,
        })
    }

    fn parse_entry(&self, entry: feed_rs::model::Entry) -> ParsedEntry {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty());

        // Prefer an alternate link, then whatever comes first
        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        let summary = entry
            .summary
            .map(|s| strip_html(&s.content))
            .filter(|s| !s.is_empty());

        let content = entry
            .content
            .and_then(|c| c.body)
            .map(|body| strip_html(&body))
            .filter(|c| !c.is_empty());

        let author = entry.authors.first().map(|a| a.name.clone());
        let published_at = entry.published.or(entry.updated);

        let mut media = Vec::new();
        let mut seen_urls = HashSet::new();

        for link in entry.links.iter().filter(|l| l.rel.as_deref() == Some("enclosure")) {
            if seen_urls.insert(link.href.clone()) {
                media.push(MediaAttachment::new(
                    link.href.clone(),
                    link.media_type.clone().unwrap_or_default(),
                ));
            }
        }

        for object in &entry.media {
            for item in &object.content {
                let Some(url) = &item.url else { continue };
                if seen_urls.insert(url.to_string()) {
                    let media_type = item
                        .content_type
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_default();
                    media.push(MediaAttachment::new(url.to_string(), media_type));
                }
            }
            // Thumbnails only stand in when the object carries no content
            if object.content.is_empty() {
                for thumbnail in &object.thumbnails {
                    if seen_urls.insert(thumbnail.image.uri.clone()) {
                        media.push(MediaAttachment::new(thumbnail.image.uri.clone(), "image"));
                    }
                }
            }
        }

        ParsedEntry {
            id: entry.id,
            title,
            link,
            summary,
            content,
            author,
            published_at,
            media,
        }
    }
}
