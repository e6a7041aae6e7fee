//! Tracing initialization for Lambda functions.
//!
//! Emits flattened JSON events to stdout, which the Lambda service forwards to
//! CloudWatch Logs.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Full `EnvFilter` directive; takes precedence when set
//! - `AWS_LAMBDA_LOG_LEVEL`: Application log level from the function's logging
//!   configuration (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR` or `FATAL`)
//!
//! With neither set, the level is `info`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when the environment names none.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Initialize tracing with JSON formatting for CloudWatch Logs.
///
/// Call once at the start of `main`, before handing control to
/// `lambda_runtime::run()`. Set the level to `debug` to log every received
/// header and poll result.
///
/// # Example
///
/// ```no_run
/// use visitor_insights_lambda_shared::init_tracing;
///
/// #[tokio::main]
/// async fn main() -> Result<(), lambda_runtime::Error> {
///     init_tracing();
///     // ... rest of Lambda setup
///     Ok(())
/// }
/// ```
pub fn init_tracing() {
    let directive = filter_directive(|key| std::env::var(key).ok());
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    // The Lambda log stream already records the timestamp.
    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_current_span(false)
        .with_span_list(false)
        .without_time()
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Resolve the filter directive from an arbitrary key lookup.
pub fn filter_directive<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(directive) = lookup("RUST_LOG").filter(|v| !v.trim().is_empty()) {
        return directive;
    }

    lookup("AWS_LAMBDA_LOG_LEVEL")
        .and_then(|level| lambda_level(&level))
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

fn lambda_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        // tracing has no level above error
        "ERROR" | "FATAL" => Some("error"),
        _ => None,
    }
}
