//! Logging setup.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Parse a level name; unknown names mean `info`.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Console logging at the given level. `RUST_LOG` directives, when set, are
/// added on top so single modules can be turned up.
pub fn init(level: &str) {
    let filter = EnvFilter::from_default_env().add_directive(parse_level(level).into());

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
