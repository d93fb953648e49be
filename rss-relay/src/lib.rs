pub mod config;
pub mod fetcher;
pub mod formatter;
pub mod logging;
pub mod monitor;
pub mod openai;
pub mod parser;
pub mod seen;
pub mod sources;
pub mod telegram;
pub mod traits;
pub mod types;
pub mod utils;

pub use types::*;
pub use config::{load_config, BotConfig, FeedConfig};
pub use fetcher::Fetcher;
pub use parser::{entry_id, FeedParser};
pub use formatter::{FormatOptions, PostFormatter};
pub use monitor::{CycleReport, FeedReport, Monitor, MonitorTiming, ShutdownHandle};
pub use openai::{OpenAiGenerator, TextGenerator};
pub use seen::SeenStore;
pub use sources::HttpFeedSource;
pub use telegram::{BotApi, HttpBotApi, TelegramBot};
pub use traits::{ChannelDelivery, FeedSource};
