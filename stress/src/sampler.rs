/*
    Stress test for the sampling policy.

    Cycles through operation names that hit every rule, drawing from the
    per-thread random source.

    Run with:
    cargo run --release --bin sampler [threads]
*/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use telemetry_core::trace::{OperationSampleRequest, SamplingPolicy, ShouldSample};
use telemetry_core::ThreadLocalRandom;

mod throughput;

static POLICY: LazyLock<SamplingPolicy> = LazyLock::new(SamplingPolicy::default);

static REQUESTS: LazyLock<Vec<OperationSampleRequest>> = LazyLock::new(|| {
    vec![
        OperationSampleRequest::new("GetWeather").with_parent_recorded(true),
        OperationSampleRequest::new("GetWeatherError"),
        OperationSampleRequest::new("SlowEndpoint"),
        OperationSampleRequest::new("HealthCheck"),
        OperationSampleRequest::new("GetForecast").with_priority_tag(0),
        OperationSampleRequest::new("GetForecast").with_priority_tag(2),
        OperationSampleRequest::new("GetForecast"),
    ]
});

static NEXT: AtomicUsize = AtomicUsize::new(0);

fn main() {
    throughput::init_logging();
    throughput::test_throughput(test_sampler);
}

fn test_sampler() {
    let index = NEXT.fetch_add(1, Ordering::Relaxed) % REQUESTS.len();
    let decision = POLICY.should_sample(&REQUESTS[index], &ThreadLocalRandom::default());
    std::hint::black_box(decision);
}
