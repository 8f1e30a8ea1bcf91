//! # Structured Logging Module
//!
//! Environment-aware structured logging for launch lifecycles and the remote
//! records forwarded from running steps.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call repeatedly; only the first call installs a subscriber, and an
/// already installed global subscriber is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json_output = use_json_format();

        let console_layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json_output,
            "Structured logging initialized"
        );
    });
}

/// Current environment from `LAUNCHER_ENV`, then `APP_ENV`, lowercased
pub fn get_environment() -> String {
    std::env::var("LAUNCHER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

fn get_log_level(environment: &str) -> String {
    match environment.to_lowercase().as_str() {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("LAUNCHER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for launch lifecycle operations
pub fn log_launch_operation(
    operation: &str,
    run_id: &str,
    step_key: &str,
    job: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = %run_id,
        step_key = %step_key,
        job = job,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "LAUNCH_OPERATION"
    );
}
