/*
    Stress test for the metrics aggregation service.

    Every iteration tracks one active operation, bumps the queue depth,
    increments a counter with three tags drawn from 10 values each
    (1000 time series) and records a latency observation.

    Run with:
    cargo run --release --bin metrics [threads]
*/

use std::sync::LazyLock;

use opentelemetry::KeyValue;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::cell::RefCell;
use telemetry_core::metrics::{names, MetricsAggregationService, MetricsConfig};

mod throughput;

static SERVICE: LazyLock<MetricsAggregationService> =
    LazyLock::new(|| MetricsAggregationService::new(MetricsConfig::default()));

const ATTRIBUTE_VALUES: [&str; 10] = [
    "value1", "value2", "value3", "value4", "value5", "value6", "value7", "value8", "value9",
    "value10",
];

thread_local! {
    static CURRENT_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

fn main() {
    throughput::init_logging();
    throughput::test_throughput(test_metrics);
}

fn test_metrics() {
    let (first, second, third, latency) = CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        (
            rng.random_range(0..ATTRIBUTE_VALUES.len()),
            rng.random_range(0..ATTRIBUTE_VALUES.len()),
            rng.random_range(0..ATTRIBUTE_VALUES.len()),
            rng.random_range(0.0..1000.0),
        )
    });

    let _operation = SERVICE.track_active();
    SERVICE.update_queue_depth(1);

    SERVICE
        .add_count(
            names::REQUESTS_TOTAL,
            1,
            &[
                KeyValue::new("attribute1", ATTRIBUTE_VALUES[first]),
                KeyValue::new("attribute2", ATTRIBUTE_VALUES[second]),
                KeyValue::new("attribute3", ATTRIBUTE_VALUES[third]),
            ],
        )
        .expect("requests_total is registered");
    SERVICE
        .record_distribution(names::REQUEST_DURATION, latency, &[])
        .expect("request_duration is registered");

    SERVICE.update_queue_depth(-1);
}
