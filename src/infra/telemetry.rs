use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::{
    content::UNCACHED_FILE_METRIC,
    hashing::{HASH_BACKFILL_FAILED_METRIC, LEGACY_CAPE_HASHED_METRIC},
};
use crate::cache::{CACHE_HIT_METRIC, CACHE_MISS_METRIC, CACHE_WRITE_ERROR_METRIC};
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
            CACHE_HIT_METRIC,
            Unit::Count,
            "Cache-aside lookups answered from the cache, by namespace."
        );
        describe_counter!(
            CACHE_MISS_METRIC,
            Unit::Count,
            "Cache-aside lookups that fell through to the backing store, by namespace."
        );
        describe_counter!(
            CACHE_WRITE_ERROR_METRIC,
            Unit::Count,
            "Cache writes that failed or timed out, by namespace."
        );
        describe_counter!(
            UNCACHED_FILE_METRIC,
            Unit::Count,
            "Deliveries of files flagged as non-cacheable."
        );
        describe_counter!(
            LEGACY_CAPE_HASHED_METRIC,
            Unit::Count,
            "Capes whose missing texture hash was computed and persisted."
        );
        describe_counter!(
            HASH_BACKFILL_FAILED_METRIC,
            Unit::Count,
            "Texture hash backfills that could not complete."
        );
    });
}
