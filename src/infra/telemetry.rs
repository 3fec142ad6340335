use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::reactions::{
    METRIC_BATCH_SIZE, METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_FILL_DISCARDED_TOTAL,
    METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL, METRIC_TRANSITION_TOTAL,
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_TRANSITION_TOTAL,
            Unit::Count,
            "Applied reaction transitions, labelled add, remove or switch."
        );
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Aggregate snapshots served from the cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Aggregate snapshot lookups that fell through to the store."
        );
        describe_counter!(
            METRIC_CACHE_ERROR_TOTAL,
            Unit::Count,
            "Cache operations that failed and were swallowed, labelled by op."
        );
        describe_counter!(
            METRIC_CACHE_FILL_DISCARDED_TOTAL,
            Unit::Count,
            "Cache fills rejected because the key was invalidated after the read."
        );
        describe_histogram!(
            METRIC_BATCH_SIZE,
            Unit::Count,
            "Number of targets requested per batch read."
        );
    });
}
