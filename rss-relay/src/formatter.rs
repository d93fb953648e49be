//! Turns raw feed entries into Telegram-ready posts.
//!
//! The AI path asks a [`TextGenerator`] to rewrite the entry; whenever that
//! fails (or AI rewriting is switched off for the feed) the deterministic
//! fallback format is used, so an entry always yields a non-empty post.

use crate::config::FeedConfig;
use crate::openai::TextGenerator;
use crate::types::{ParseMode, RawEntry, RenderedPost, Result};
use crate::utils::text::{hashtag, take_chars, truncate_chars};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

pub const MAX_TELEGRAM_LENGTH: usize = 4096;
pub const MAX_TELEGRAM_WITH_MEDIA: usize = 1024;
pub const PROMPT_CONTENT_LIMIT: usize = 1000;
pub const FALLBACK_SUMMARY_LIMIT: usize = 300;

const SYSTEM_PROMPT: &str =
    "You are a professional copywriter for a Telegram news channel with experience writing engaging posts.";

/// Per-feed rendering switches, taken from [`FeedConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    pub enable_emojis: bool,
    pub custom_hashtags: Vec<String>,
    pub enable_link_preview: bool,
    pub enable_media: bool,
    pub show_author: bool,
    pub ai_enhance: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            enable_emojis: false,
            custom_hashtags: Vec::new(),
            enable_link_preview: true,
            enable_media: true,
            show_author: true,
            ai_enhance: true,
        }
    }
}

impl From<&FeedConfig> for FormatOptions {
    fn from(feed: &FeedConfig) -> Self {
        Self {
            enable_emojis: feed.enable_emojis,
            custom_hashtags: feed.custom_hashtags.clone(),
            enable_link_preview: feed.enable_link_preview,
            enable_media: feed.enable_media,
            show_author: feed.show_author,
            ai_enhance: feed.ai_enhance,
        }
    }
}

pub struct PostFormatter {
    options: FormatOptions,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl PostFormatter {
    pub fn new(options: FormatOptions, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { options, generator }
    }

    /// Render one entry. Uses the generator when AI rewriting is on and one is
    /// available, the fallback format otherwise or on any generation error.
    pub async fn format_post(&self, entry: &RawEntry) -> RenderedPost {
        let media = if self.options.enable_media {
            entry.media_attachments.clone()
        } else {
            Vec::new()
        };
        let limit = if media.is_empty() {
            MAX_TELEGRAM_LENGTH
        } else {
            MAX_TELEGRAM_WITH_MEDIA
        };

        let body = match (&self.generator, self.options.ai_enhance) {
            (Some(generator), true) => match self.generate(generator.as_ref(), entry).await {
                Ok(text) => {
                    info!("Post generated with {}. Length: {} characters", generator.generator_name(), text.chars().count());
                    text
                }
                Err(e) => {
                    error!("Post generation failed, using fallback format: {}", e);
                    self.fallback_body(entry)
                }
            },
            _ => self.fallback_body(entry),
        };

        RenderedPost {
            text: self.finish(body, entry.link.as_deref(), limit),
            media,
            link_preview: if self.options.enable_link_preview {
                entry.link.clone()
            } else {
                None
            },
            parse_mode: ParseMode::Markdown,
        }
    }

    async fn generate(&self, generator: &dyn TextGenerator, entry: &RawEntry) -> Result<String> {
        info!("Generating post for: {}", entry.title.as_deref().unwrap_or("Untitled"));

        let prompt = self.build_prompt(entry);
        generator.generate(SYSTEM_PROMPT, &prompt).await
    }

    pub fn build_prompt(&self, entry: &RawEntry) -> String {
        let emoji_rule = if self.options.enable_emojis {
            "Add 1-3 relevant emoji, without overdoing it"
        } else {
            "Do not use emoji"
        };
        let author = match (&entry.author, self.options.show_author) {
            (Some(author), true) => format!("AUTHOR: {}\n", author),
            _ => String::new(),
        };

        format!(
            "Write an engaging, informative Telegram post based on the following news item.\n\n\
             TITLE: {title}\n\
             SOURCE: {source}\n\
             {author}\
             CONTENT: {content}\n\
             LINK: {link}\n\n\
             Requirements:\n\
             1. Make the text vivid and attention-grabbing\n\
             2. {emoji_rule}\n\
             3. Structure: headline, main text, call to action\n\
             4. Add 2-4 relevant hashtags at the end\n\
             5. Maximum length is {max} characters\n\
             6. Keep the key facts from the source text\n\
             7. Include the source link at the end\n\
             8. Write in the language of the source text, professional but friendly\n\
             9. Use Telegram Markdown: *bold* for emphasis, _italic_ for examples",
            title = entry.title.as_deref().unwrap_or("Untitled"),
            source = entry.feed_title.as_deref().unwrap_or("Unknown source"),
            author = author,
            content = take_chars(entry.body(), PROMPT_CONTENT_LIMIT),
            link = entry.link.as_deref().unwrap_or(""),
            emoji_rule = emoji_rule,
            max = PROMPT_CONTENT_LIMIT,
        )
    }

    /// Title, summary and author of the deterministic format. Never empty.
    fn fallback_body(&self, entry: &RawEntry) -> String {
        let mut parts = Vec::new();

        let title = entry
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled");
        parts.push(format!("📰 {}", title));

        if let Some(summary) = entry.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(truncate_chars(summary.trim(), FALLBACK_SUMMARY_LIMIT));
        }

        if self.options.show_author {
            if let Some(author) = entry.author.as_deref().filter(|a| !a.trim().is_empty()) {
                parts.push(format!("✍️ {}", author.trim()));
            }
        }

        parts.join("\n\n")
    }

    /// Append the source link and the missing hashtags, cutting only the body
    /// so the result fits `limit` with both suffixes intact.
    fn finish(&self, body: String, link: Option<&str>, limit: usize) -> String {
        let tags = self.missing_hashtags(&body);
        let tag_line = if tags.is_empty() {
            String::new()
        } else {
            format!("\n\n{}", tags.join(" "))
        };

        // A link the body already carries only counts if it survives the cut
        let link_line = match link {
            Some(link) if !link.trim().is_empty() => {
                let fits = body.chars().count() + tag_line.chars().count() <= limit;
                if fits && body.contains(link) {
                    String::new()
                } else {
                    format!("\n\n🔗 {}", link)
                }
            }
            _ => String::new(),
        };

        let budget = limit.saturating_sub(link_line.chars().count() + tag_line.chars().count());
        format!("{}{}{}", truncate_chars(&body, budget), link_line, tag_line)
    }

    /// Configured tags not already present as whole `#tag` tokens.
    fn missing_hashtags(&self, text: &str) -> Vec<String> {
        let present: HashSet<String> = text
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '#'))
            .filter(|token| token.starts_with('#'))
            .map(str::to_lowercase)
            .collect();

        let mut tags: Vec<String> = Vec::new();
        for tag in self.options.custom_hashtags.iter().filter_map(|t| hashtag(t)) {
            if !present.contains(&tag.to_lowercase()) && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaAttachment;

    fn entry() -> RawEntry {
        RawEntry {
            title: Some("Rust 2.0 announced".to_string()),
            author: Some("Ferris".to_string()),
            summary: Some("A".repeat(400)),
            link: Some("https://example.com/rust".to_string()),
            feed_title: Some("Example News".to_string()),
            ..Default::default()
        }
    }

    struct LongGenerator;

    #[async_trait::async_trait]
    impl TextGenerator for LongGenerator {
        fn generator_name(&self) -> String {
            "long".to_string()
        }

        async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
            Ok("A".repeat(1000))
        }
    }

    #[tokio::test]
    async fn test_fallback_layout() {
        let formatter = PostFormatter::new(FormatOptions::default(), None);
        let post = formatter.format_post(&entry()).await;
        let parts: Vec<&str> = post.text.split("\n\n").collect();

        assert_eq!(parts[0], "📰 Rust 2.0 announced");
        assert_eq!(parts[1].chars().count(), FALLBACK_SUMMARY_LIMIT);
        assert!(parts[1].ends_with("..."));
        assert_eq!(parts[2], "✍️ Ferris");
        assert_eq!(parts[3], "🔗 https://example.com/rust");
    }

    #[tokio::test]
    async fn test_fallback_never_empty() {
        let options = FormatOptions {
            show_author: false,
            ..Default::default()
        };
        let formatter = PostFormatter::new(options, None);
        let post = formatter.format_post(&RawEntry::default()).await;
        assert_eq!(post.text, "📰 Untitled");
    }

    #[tokio::test]
    async fn test_long_caption_keeps_link_and_tags() {
        let options = FormatOptions {
            custom_hashtags: vec!["rust".to_string()],
            ..Default::default()
        };
        let formatter = PostFormatter::new(options, Some(Arc::new(LongGenerator)));
        let mut raw = entry();
        raw.media_attachments = vec![MediaAttachment::new("https://example.com/a.jpg", "image/jpeg")];

        let post = formatter.format_post(&raw).await;
        assert_eq!(post.text.chars().count(), MAX_TELEGRAM_WITH_MEDIA);
        assert!(post.text.ends_with("\n\n🔗 https://example.com/rust\n\n#rust"));
        assert!(post.text.contains("A..."));
    }

    #[test]
    fn test_link_already_in_body_is_not_repeated() {
        let formatter = PostFormatter::new(FormatOptions::default(), None);
        let text = formatter.finish(
            "Read more: https://example.com/rust".to_string(),
            Some("https://example.com/rust"),
            MAX_TELEGRAM_LENGTH,
        );
        assert_eq!(text, "Read more: https://example.com/rust");
    }

    #[test]
    fn test_hashtags_match_whole_tokens() {
        let options = FormatOptions {
            custom_hashtags: vec!["rust".to_string(), "#news".to_string(), "lang".to_string()],
            ..Default::default()
        };
        let formatter = PostFormatter::new(options, None);
        assert_eq!(
            formatter.missing_hashtags("Hello #rustlang, more #News."),
            vec!["#rust".to_string(), "#lang".to_string()]
        );
        assert!(formatter.missing_hashtags("Post #rust #news #lang").is_empty());
    }

    #[test]
    fn test_prompt_mentions_entry() {
        let formatter = PostFormatter::new(FormatOptions::default(), None);
        let prompt = formatter.build_prompt(&entry());
        assert!(prompt.contains("TITLE: Rust 2.0 announced"));
        assert!(prompt.contains("SOURCE: Example News"));
        assert!(prompt.contains("AUTHOR: Ferris"));
        assert!(prompt.contains("Do not use emoji"));
    }
}
