//! Logging initialization
//!
//! Console output is always enabled; file output (daily rotation) is opt-in
//! through the logging config. `RUST_LOG` takes precedence over the
//! configured level.

use crate::infrastructure::config::LoggingConfig;
use anyhow::Result;
use once_cell::sync::Lazy;
use std::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Keeps the non-blocking writer alive for the process lifetime.
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Initialize the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = tracing_subscriber::fmt::layer().with_target(true);

    if config.file_enabled {
        let file_appender = rolling::daily(&config.log_dir, "global-insights.log");
        let (writer, guard) = non_blocking(file_appender);
        if let Ok(mut guards) = LOG_GUARDS.lock() {
            guards.push(guard);
        }

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init()?;
    }

    Ok(())
}
