#![allow(dead_code)]

use async_trait::async_trait;
use rss_relay::{
    BotApi, ChannelDelivery, FeedSource, ParsedEntry, ParsedFeed, RelayError, RenderedPost, Result,
    ShutdownHandle, TextGenerator,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn entry(id: &str, title: &str) -> ParsedEntry {
    ParsedEntry {
        id: id.to_string(),
        title: Some(title.to_string()),
        link: Some(format!("https://news.example.com/{}", id)),
        summary: Some(format!("Summary of {}", title)),
        ..Default::default()
    }
}

pub fn feed(title: &str, entries: Vec<ParsedEntry>) -> ParsedFeed {
    ParsedFeed {
        title: Some(title.to_string()),
        entries,
        warnings: Vec::new(),
    }
}

#[derive(Clone)]
pub enum Poll {
    Feed(ParsedFeed),
    Fail,
    /// Fails with an error that aborts the whole cycle.
    Broken,
}

/// Scripted feed source: each URL answers from a queue of polls, the last
/// poll repeats once the queue is down to one.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Poll>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: &str, polls: Vec<Poll>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), polls.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts
            .get_mut(url)
            .ok_or_else(|| RelayError::fetch(url, "no script for url"))?;
        let poll = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match poll {
            Some(Poll::Feed(feed)) => Ok(feed),
            Some(Poll::Fail) | None => Err(RelayError::fetch(url, "HTTP 503: Service Unavailable")),
            Some(Poll::Broken) => Err(RelayError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk went away",
            ))),
        }
    }
}

/// Delivery fake that records every send and fails for chosen chats.
#[derive(Default)]
pub struct RecordingDelivery {
    pub connected: bool,
    failing_chats: HashSet<String>,
    sent: Mutex<Vec<(String, RenderedPost)>>,
    stop_after: Mutex<Option<(usize, ShutdownHandle)>>,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, chat_id: &str) -> Self {
        self.failing_chats.insert(chat_id.to_string());
        self
    }

    /// Trigger shutdown once `sends` attempts have been made.
    pub fn stop_after(&self, sends: usize, handle: ShutdownHandle) {
        *self.stop_after.lock().unwrap() = Some((sends, handle));
    }

    pub fn sent(&self) -> Vec<(String, RenderedPost)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts_to(&self, chat_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(chat, _)| chat == chat_id)
            .map(|(_, post)| post.text)
            .collect()
    }
}

#[async_trait]
impl ChannelDelivery for RecordingDelivery {
    async fn test_connection(&self) -> bool {
        self.connected
    }

    async fn send_post(&self, chat_id: &str, post: &RenderedPost) -> bool {
        let attempts = {
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat_id.to_string(), post.clone()));
            sent.len()
        };

        if let Some((limit, handle)) = self.stop_after.lock().unwrap().as_ref() {
            if attempts >= *limit {
                handle.trigger();
            }
        }

        !self.failing_chats.contains(chat_id)
    }
}

pub struct StaticGenerator(pub String);

#[async_trait]
impl TextGenerator for StaticGenerator {
    fn generator_name(&self) -> String {
        "static".to_string()
    }

    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn generator_name(&self) -> String {
        "failing".to_string()
    }

    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Err(RelayError::Generation("HTTP 429: rate limited".to_string()))
    }
}

/// Bot API fake: records calls, fails chosen methods.
#[derive(Default)]
pub struct FakeBotApi {
    failing_methods: HashSet<String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeBotApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, method: &str) -> Self {
        self.failing_methods.insert(method.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl BotApi for FakeBotApi {
    async fn call(&self, method: &str, payload: Value) -> Result<Value> {
        self.calls.lock().unwrap().push((method.to_string(), payload));

        if self.failing_methods.contains(method) {
            return Err(RelayError::Delivery(format!(
                "{} failed (400): Bad Request: wrong file identifier/HTTP URL specified",
                method
            )));
        }

        match method {
            "getMe" => Ok(json!({ "id": 42, "is_bot": true, "username": "relay_test_bot" })),
            _ => Ok(json!({ "message_id": 1 })),
        }
    }
}
