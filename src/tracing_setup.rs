use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::models::LoggingConfig;

/// `RUST_LOG` when set, `fallback` otherwise.
fn env_filter(fallback: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            EnvFilter::try_new(fallback).wrap_err_with(|| format!("Invalid log level: {fallback}"))
        }
    }
}

/// Initialize console-friendly logging for development
pub fn init_console_tracing() -> Result<()> {
    Registry::default()
        .with(env_filter("info")?)
        .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    tracing::debug!("console logging initialized");
    Ok(())
}

/// Initialize tracing from the `[logging]` section of the configuration
pub fn init_tracing_with_config(logging: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&logging.level)?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    let installed = if logging.json {
        Registry::default()
            .with(filter)
            .with(
                fmt_layer
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
    } else {
        Registry::default()
            .with(filter)
            .with(fmt_layer.compact())
            .try_init()
    };
    installed.wrap_err("Failed to install tracing subscriber")?;

    tracing::debug!(level = %logging.level, json = logging.json, "logging initialized");
    Ok(())
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.path = path,
        http.status_code = tracing::field::Empty,
    )
}
