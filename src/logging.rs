//! # Structured Logging Module
//!
//! Environment-aware structured logging for tracing dispatches and their
//! asynchronous completions across the bus delivery path.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// `RUST_LOG` wins over the environment default. Set `GOLEM_LOG_FORMAT=json`
/// for JSON lines instead of human-readable output.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));
        let json_output = std::env::var("GOLEM_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console_layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(EnvFilter::new(filter.clone()))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(filter.clone()))
                .boxed()
        };

        // A global subscriber may already be installed by the host process
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            filter = %filter,
            json = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("GOLEM_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for dispatch operations
pub fn log_dispatch_operation(
    operation: &str,
    correlation_key: &str,
    worker: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        correlation_key = %correlation_key,
        worker = worker,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📤 DISPATCH_OPERATION"
    );
}

/// Log structured data for completion operations
pub fn log_completion_operation(
    operation: &str,
    correlation_key: &str,
    success: bool,
    elapsed_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        correlation_key = %correlation_key,
        success = success,
        elapsed_ms = elapsed_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📥 COMPLETION_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
