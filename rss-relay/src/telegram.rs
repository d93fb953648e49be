use crate::traits::ChannelDelivery;
use crate::types::{MediaAttachment, MediaKind, ParseMode, RelayError, RenderedPost, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw Bot API transport: method name and JSON body in, `result` out.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn call(&self, method: &str, payload: Value) -> Result<Value>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

/// Bot API over HTTPS.
pub struct HttpBotApi {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBotApi {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn call(&self, method: &str, payload: Value) -> Result<Value> {
        debug!("Calling Bot API method {}", method);

        // reqwest errors carry the URL, which contains the token
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RelayError::Delivery(format!("{} request failed: {}", method, e.without_url())))?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Delivery(format!("{} returned an unreadable response: {}", method, e.without_url())))?;

        if !body.ok {
            return Err(RelayError::Delivery(format!(
                "{} failed ({}): {}",
                method,
                body.error_code.unwrap_or_default(),
                body.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

pub struct TelegramBot<A: BotApi = HttpBotApi> {
    api: A,
}

impl TelegramBot<HttpBotApi> {
    pub fn from_token(api_url: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(RelayError::Config("telegram bot token is empty".to_string()));
        }
        Ok(Self::new(HttpBotApi::new(api_url, token)?))
    }
}

impl<A: BotApi> TelegramBot<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// `getMe`; returns the bot username.
    pub async fn get_me(&self) -> Result<String> {
        let result = self.api.call("getMe", json!({})).await?;
        Ok(result
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: ParseMode,
        link_preview: Option<&str>,
    ) -> bool {
        let mut payload = base_payload(chat_id, parse_mode);
        payload.insert("text".to_string(), json!(text));
        let preview = match link_preview {
            Some(url) => json!({ "url": url }),
            None => json!({ "is_disabled": true }),
        };
        payload.insert("link_preview_options".to_string(), preview);

        match self.api.call("sendMessage", Value::Object(payload)).await {
            Ok(_) => {
                info!("Message sent to {}", chat_id);
                true
            }
            Err(e) => {
                error!("Failed to send message to {}: {}", chat_id, e);
                false
            }
        }
    }

    /// Send the first attachment with the text as caption and the rest as an
    /// album. Any failure falls back to a plain text message.
    pub async fn send_message_with_media(
        &self,
        chat_id: &str,
        text: &str,
        media: &[MediaAttachment],
        parse_mode: ParseMode,
    ) -> bool {
        if media.is_empty() {
            return self.send_message(chat_id, text, parse_mode, None).await;
        }

        match self.send_media(chat_id, text, media, parse_mode).await {
            Ok(()) => {
                info!("Message with media sent to {}", chat_id);
                true
            }
            Err(e) => {
                warn!("Failed to send message with media to {}: {}; retrying as text", chat_id, e);
                self.send_message(chat_id, text, parse_mode, None).await
            }
        }
    }

    async fn send_media(
        &self,
        chat_id: &str,
        caption: &str,
        media: &[MediaAttachment],
        parse_mode: ParseMode,
    ) -> Result<()> {
        let first = &media[0];
        let (method, field) = match first.kind() {
            MediaKind::Photo => ("sendPhoto", "photo"),
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Document => ("sendDocument", "document"),
        };

        let mut payload = base_payload(chat_id, parse_mode);
        payload.insert(field.to_string(), json!(first.url));
        payload.insert("caption".to_string(), json!(caption));
        self.api.call(method, Value::Object(payload)).await?;

        let group = media_group(&media[1..]);
        if !group.is_empty() {
            self.api
                .call("sendMediaGroup", json!({ "chat_id": chat_id, "media": group }))
                .await?;
        }
        Ok(())
    }
}

fn base_payload(chat_id: &str, parse_mode: ParseMode) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("chat_id".to_string(), json!(chat_id));
    if let Some(mode) = parse_mode.as_api_str() {
        payload.insert("parse_mode".to_string(), json!(mode));
    }
    payload
}

/// Album items for the remaining attachments. Only photos and videos can be
/// grouped; documents are dropped.
pub fn media_group(media: &[MediaAttachment]) -> Vec<Value> {
    media
        .iter()
        .filter_map(|m| match m.kind() {
            MediaKind::Photo => Some(json!({ "type": "photo", "media": m.url })),
            MediaKind::Video => Some(json!({ "type": "video", "media": m.url })),
            MediaKind::Document => None,
        })
        .collect()
}

#[async_trait]
impl<A: BotApi> ChannelDelivery for TelegramBot<A> {
    async fn test_connection(&self) -> bool {
        match self.get_me().await {
            Ok(username) => {
                info!("Bot connected: @{}", username);
                true
            }
            Err(e) => {
                error!("Failed to connect to Telegram: {}", e);
                false
            }
        }
    }

    async fn send_post(&self, chat_id: &str, post: &RenderedPost) -> bool {
        if post.has_media() {
            self.send_message_with_media(chat_id, &post.text, &post.media, post.parse_mode)
                .await
        } else {
            self.send_message(chat_id, &post.text, post.parse_mode, post.link_preview.as_deref())
                .await
        }
    }
}
