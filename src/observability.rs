//! Structured logging setup for the entitlements service.

use std::io;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

use crate::config::LogFormat;

/// Builds the filter, preferring `RUST_LOG` over the configured directive.
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Pretty output is for local development; JSON puts one object per line on
/// stderr with the current span attached, so `owner_id` and `feature` fields
/// survive into the log pipeline.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(directive: &str, format: LogFormat) -> Result<(), TryInitError> {
    let subscriber = tracing_subscriber::registry().with(env_filter(directive));

    match format {
        LogFormat::Pretty => subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(io::stderr),
            )
            .try_init(),
    }
}
