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

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "pagepipe_render_passes_total",
            Unit::Count,
            "Render passes that had at least one pending pagelet."
        );
        describe_counter!(
            "pagepipe_pagelets_emitted_total",
            Unit::Count,
            "Pagelets written to the output stream, by delivery mode."
        );
        describe_counter!(
            "pagepipe_render_failures_total",
            Unit::Count,
            "Render passes aborted by a transport or encoding failure."
        );
        describe_histogram!(
            "pagepipe_render_ms",
            Unit::Milliseconds,
            "Wall time of a complete render pass in milliseconds."
        );
        describe_histogram!(
            "pagepipe_debug_delay_ms",
            Unit::Milliseconds,
            "Simulated network jitter applied per pagelet in debug mode."
        );
    });
}
