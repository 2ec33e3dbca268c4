//! Logging utilities for the Jivbook services.
//!
//! Every binary calls one of the `init*` functions once at start-up. Library
//! crates only emit `tracing` events and never install a subscriber themselves.

use jivbook_config::LoggingConfig;
use std::str::FromStr;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use jivbook_common::logging;
///
/// logging::init();
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` directives are honoured; the `jivbook` directive for our own crates
/// is added on top of them.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(console_layer())
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// When `directory` is set, events are additionally written to a daily rolling
/// file. The returned guard flushes that file writer on drop and must be held
/// for the lifetime of the process.
pub fn init_from_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = parse_level(&config.level);

    let Some(directory) = config.directory.as_deref() else {
        init_with_level(level);
        return None;
    };

    let file_appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let result = tracing_subscriber::registry()
        .with(console_layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!(
            "Logging initialized at level: {} (files in {})",
            level, directory
        );
    }
    Some(guard)
}

/// Parses a level name, falling back to INFO for anything unrecognised.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level).unwrap_or_else(|_| {
        warn!("Unknown log level '{}', using INFO", level);
        Level::INFO
    })
}

fn console_layer<S>() -> fmt::Layer<S> {
    fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
}

fn build_filter(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("jivbook={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }
}
