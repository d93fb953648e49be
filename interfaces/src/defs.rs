use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One media object attached to a feed entry (enclosure or Media RSS).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    /// MIME type as announced by the feed, e.g. `image/jpeg`. May be empty.
    #[serde(default, rename = "type")]
    pub media_type: String,
}

impl MediaAttachment {
    pub fn new(url: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_type: media_type.into(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        let media_type = self.media_type.to_lowercase();
        if media_type.contains("image") || media_type.contains("photo") {
            MediaKind::Photo
        } else if media_type.contains("video") {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

/// Read-only view of one feed item as parsed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawEntry {
    pub title: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub feed_title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub media_attachments: Vec<MediaAttachment>,
}

impl RawEntry {
    /// Body text for rewriting: content when present, else summary.
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(self.summary.as_deref())
            .unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    Markdown,
    #[serde(rename = "HTML")]
    Html,
    Plain,
}

impl ParseMode {
    /// Value for the `parse_mode` field of a send call, `None` for plain text.
    pub fn as_api_str(&self) -> Option<&'static str> {
        match self {
            ParseMode::Markdown => Some("Markdown"),
            ParseMode::Html => Some("HTML"),
            ParseMode::Plain => None,
        }
    }
}

/// Platform-ready message produced from a raw entry. Built fresh per entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPost {
    pub text: String,
    pub media: Vec<MediaAttachment>,
    pub link_preview: Option<String>,
    pub parse_mode: ParseMode,
}

impl RenderedPost {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

// Object style note:
// These are plain values passed between the poller, the rewriter and the
// delivery client. None of them hold connections or caches; anything with
// state lives in the service crate.
