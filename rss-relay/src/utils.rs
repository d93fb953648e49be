/// Text processing utilities
pub mod text {
    use html2text::render::text_renderer::TrivialDecorator;

    /// Truncate to at most `max_chars` characters, ending with `...` when cut.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let keep = max_chars.saturating_sub(3);
        let truncated: String = text.chars().take(keep).collect();
        format!("{}...", truncated.trim_end())
    }

    /// Cut to `max_chars` characters without adding a marker.
    pub fn take_chars(text: &str, max_chars: usize) -> String {
        text.chars().take(max_chars).collect()
    }

    /// Wrap width handed to the renderer; wide enough that paragraphs stay
    /// on one line.
    const RENDER_WIDTH: usize = 4096;

    /// Reduce an HTML fragment to plain text: drop markup, decode entities,
    /// collapse blank runs.
    pub fn strip_html(html: &str) -> String {
        let rendered = html2text::from_read_with_decorator(html.as_bytes(), RENDER_WIDTH, TrivialDecorator::new());
        let rendered = rendered.replace('\u{a0}', " ");

        let mut lines: Vec<&str> = Vec::new();
        for line in rendered.lines().map(str::trim) {
            if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
                continue;
            }
            lines.push(line);
        }
        lines.join("\n").trim().to_string()
    }

    /// Normalise a configured hashtag to `#tag` form; `None` if nothing is left.
    pub fn hashtag(tag: &str) -> Option<String> {
        let cleaned: String = tag
            .trim()
            .trim_start_matches('#')
            .chars()
            .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(format!("#{}", cleaned))
        }
    }

}

/// URL utilities
pub mod url {
    use url::Url;

    /// Check the URL is absolute http(s)
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}
