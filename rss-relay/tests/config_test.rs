use rss_relay::config::{DEFAULT_OPENAI_MODEL, DEFAULT_TELEGRAM_API_URL};
use rss_relay::{load_config, BotConfig, FeedConfig, RelayError};
use std::collections::HashMap;
use std::io::Write;

const MINIMAL_CONFIG: &str = r#"{
    "telegram_bot_token": "123456:ABC-DEF",
    "openai_api_key": "sk-test-key",
    "feeds": [
        {
            "url": "https://news.example.com/rss",
            "name": "Example News",
            "chat_ids": ["@example_channel"]
        },
        {
            "url": "https://blog.example.com/atom.xml",
            "name": "Example Blog",
            "chat_ids": ["@example_channel", "-1001234567890"],
            "check_interval": 120,
            "enable_emojis": true,
            "custom_hashtags": ["blog"],
            "ai_enhance": false
        }
    ]
}"#;

#[test]
fn test_json_defaults() {
    let config = BotConfig::from_json_str(MINIMAL_CONFIG).unwrap();

    assert_eq!(config.default_check_interval, 300);
    assert_eq!(config.openai_model, DEFAULT_OPENAI_MODEL);
    assert_eq!(config.telegram_api_url, DEFAULT_TELEGRAM_API_URL);
    assert!(config.skip_existing_on_start);

    let news = &config.feeds[0];
    assert_eq!(news.check_interval, 300);
    assert!(!news.enable_emojis);
    assert!(news.custom_hashtags.is_empty());
    assert!(news.enable_link_preview && news.enable_media && news.show_author && news.ai_enhance);

    let blog = &config.feeds[1];
    assert_eq!(blog.check_interval, 120);
    assert!(blog.enable_emojis);
    assert!(!blog.ai_enhance);

    assert_eq!(config.poll_interval_secs(), 120);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_file_and_write_back() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL_CONFIG.as_bytes()).unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.feeds.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("config.json");
    config.to_json_file(&out).unwrap();
    assert_eq!(BotConfig::from_json_file(&out).unwrap(), config);
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();

    let err = BotConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, RelayError::Serialization(_)));
}

#[test]
fn test_from_environment_lookup() {
    let mut env = HashMap::new();
    env.insert("TELEGRAM_BOT_TOKEN", "123:env");
    env.insert("OPENAI_API_KEY", "sk-env");
    env.insert("DEFAULT_CHECK_INTERVAL", "600");
    env.insert(
        "RSS_FEEDS",
        r#"[{"url": "https://news.example.com/rss", "name": "News", "chat_ids": ["@news"]}]"#,
    );

    let config = BotConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.telegram_bot_token, "123:env");
    assert_eq!(config.default_check_interval, 600);
    assert_eq!(config.feeds.len(), 1);
    assert_eq!(config.feeds[0].check_interval, 300);
}

#[test]
fn test_bad_environment_values_fall_back() {
    let config = BotConfig::from_lookup(|key| match key {
        "RSS_FEEDS" => Some("[not json".to_string()),
        "DEFAULT_CHECK_INTERVAL" => Some("soon".to_string()),
        _ => None,
    });
    assert!(config.feeds.is_empty());
    assert_eq!(config.default_check_interval, 300);
    assert_eq!(config.poll_interval_secs(), 300);
}

#[test]
fn test_validation() {
    let feed = FeedConfig::new("https://news.example.com/rss", "News", vec!["@news".to_string()]);

    let missing_token = BotConfig {
        feeds: vec![feed.clone()],
        openai_api_key: "sk".to_string(),
        ..Default::default()
    };
    assert!(matches!(missing_token.validate(), Err(RelayError::Config(_))));

    let missing_key = BotConfig {
        telegram_bot_token: "123:abc".to_string(),
        feeds: vec![feed.clone()],
        ..Default::default()
    };
    assert!(missing_key.validate().is_err());

    let mut plain = feed.clone();
    plain.ai_enhance = false;
    let no_ai = BotConfig {
        telegram_bot_token: "123:abc".to_string(),
        feeds: vec![plain],
        ..Default::default()
    };
    assert!(no_ai.validate().is_ok());

    let mut bad_url = feed;
    bad_url.url = "ftp://news.example.com/rss".to_string();
    let bad = BotConfig {
        telegram_bot_token: "123:abc".to_string(),
        openai_api_key: "sk".to_string(),
        feeds: vec![bad_url],
        ..Default::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn test_redacted_hides_secrets() {
    let config = BotConfig::from_json_str(MINIMAL_CONFIG).unwrap();
    let redacted = config.redacted();
    assert_eq!(redacted.telegram_bot_token, "1234***");
    assert_eq!(redacted.openai_api_key, "sk-t***");
    assert_eq!(redacted.feeds, config.feeds);
}
