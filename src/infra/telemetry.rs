//! Tracing and metrics bootstrap.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static DESCRIBE_ONCE: Once = Once::new();

/// Install the process-wide tracing subscriber and register metric
/// descriptions. Call once at startup, before the first request.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let format_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(format_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber install failed: {err}")))?;

    DESCRIBE_ONCE.call_once(describe_metrics);
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "penna_uploads_total",
        Unit::Count,
        "Posts ingested through the upload endpoint."
    );
    describe_counter!(
        "penna_logins_total",
        Unit::Count,
        "Successful logins through the OAuth gateway."
    );
    describe_histogram!(
        "penna_render_seconds",
        Unit::Seconds,
        "Markdown render pipeline latency in seconds."
    );
}
