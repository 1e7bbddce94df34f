//! Tracing and metrics wiring for host applications.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::combiner::{
    METRIC_COMBINE_FRESH, METRIC_COMBINE_REBUILD, METRIC_COMBINE_REBUILD_MS,
    METRIC_COMBINE_SKIPPED,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::minify::{METRIC_MINIFY_FALLBACK, METRIC_REMOTE_FAILURE};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
#[error("telemetry initialization failed: {0}")]
pub struct TelemetryError(String);

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
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
            TelemetryError(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions once per process.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_COMBINE_FRESH,
            Unit::Count,
            "Total number of combine requests served from a fresh cached artifact."
        );
        describe_counter!(
            METRIC_COMBINE_REBUILD,
            Unit::Count,
            "Total number of combined artifacts rebuilt and published."
        );
        describe_counter!(
            METRIC_COMBINE_SKIPPED,
            Unit::Count,
            "Total number of combine requests skipped (empty batch or unusable cache directory)."
        );
        describe_counter!(
            METRIC_MINIFY_FALLBACK,
            Unit::Count,
            "Total number of minification strategies that failed and fell through."
        );
        describe_counter!(
            METRIC_REMOTE_FAILURE,
            Unit::Count,
            "Total number of failed remote minification requests."
        );
        describe_histogram!(
            METRIC_COMBINE_REBUILD_MS,
            Unit::Milliseconds,
            "Rebuild latency from assembly to publication in milliseconds."
        );
    });
}
