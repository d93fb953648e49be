use anyhow::{bail, Context, Result};
use clap::Parser;
use rss_relay::{
    load_config, logging, ChannelDelivery, FetchConfig, HttpFeedSource, Monitor, OpenAiGenerator,
    SeenStore, TelegramBot, TextGenerator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Relay new RSS/Atom entries to Telegram channels", long_about = None)]
struct Args {
    /// JSON configuration file (defaults to ./config.json, then the environment)
    config: Option<PathBuf>,

    /// Run initialization and a single cycle, then exit
    #[arg(long)]
    once: bool,

    /// Only verify the Telegram bot connection
    #[arg(long)]
    check: bool,

    /// Print the resolved configuration with secrets masked, then exit
    #[arg(long)]
    print_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("failed to load configuration")?;
    logging::init(args.log_level.as_deref().unwrap_or(&config.log_level));

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    config.validate()?;

    let bot = Arc::new(TelegramBot::from_token(&config.telegram_api_url, &config.telegram_bot_token)?);
    if args.check {
        if bot.test_connection().await {
            info!("Telegram bot is ready");
            return Ok(());
        }
        bail!("could not connect to the Telegram bot");
    }

    let generator: Option<Arc<dyn TextGenerator>> = if config.openai_api_key.trim().is_empty() {
        warn!("No OpenAI key configured, posts use the plain format");
        None
    } else {
        Some(Arc::new(OpenAiGenerator::new(
            &config.openai_api_key,
            &config.openai_model,
            &config.openai_base_url,
        )?))
    };

    let source = Arc::new(HttpFeedSource::new(FetchConfig::default())?);
    let mut monitor = Monitor::new(&config, SeenStore::new(), source, bot, generator);

    let shutdown = monitor.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                shutdown.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    if args.once {
        let report = monitor.run_once().await?;
        info!(
            "Single cycle done: {} new entries, {} sends ok, {} sends failed, {} feeds failed",
            report.new_entries, report.sends_ok, report.sends_failed, report.feeds_failed
        );
        return Ok(());
    }

    monitor.run().await?;
    Ok(())
}
