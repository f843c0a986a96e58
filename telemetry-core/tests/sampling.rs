use std::thread;

use telemetry_core::testing::ScriptedRandom;
use telemetry_core::trace::{
    OperationSampleRequest, SamplerConfig, SamplingPolicy, SamplingRule, ShouldSample,
};
use telemetry_core::{SeededRandom, ThreadLocalRandom};

fn policy() -> SamplingPolicy {
    SamplingPolicy::new(SamplerConfig::builtin())
}

#[test]
fn slow_endpoint_follows_scripted_draws() {
    let policy = policy();
    let rng = ScriptedRandom::new([0.1, 0.75, 0.81, 0.2, 0.95, 0.05, 0.79, 0.99, 0.5, 0.3]);
    let request = OperationSampleRequest::new("SlowEndpoint");

    let decisions = (0..10)
        .map(|_| policy.should_sample(&request, &rng).sample)
        .collect::<Vec<_>>();

    assert_eq!(
        decisions,
        vec![true, true, false, true, false, true, true, false, true, true]
    );
    assert_eq!(rng.draws(), 10);
}

#[test]
fn remote_parent_overrides_everything() {
    let policy = policy();
    let rng = ScriptedRandom::new([0.999]);

    for name in ["GetWeatherError", "SlowEndpoint", "HealthCheck", "GetWeather"] {
        for tag in [None, Some(0), Some(1), Some(2)] {
            for recorded in [true, false] {
                let mut request =
                    OperationSampleRequest::new(name).with_parent_recorded(recorded);
                if let Some(tag) = tag {
                    request = request.with_priority_tag(tag);
                }
                let decision = policy.should_sample(&request, &rng);
                assert_eq!(decision.sample, recorded, "{name} {tag:?} {recorded}");
                assert_eq!(decision.rule, SamplingRule::RemoteParent);
            }
        }
    }
    assert_eq!(rng.draws(), 0);
}

#[test]
fn concurrent_callers_share_one_policy() {
    let policy = policy();
    let rng = ThreadLocalRandom::default();

    thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    assert!(
                        policy
                            .should_sample(&OperationSampleRequest::new("Error"), &rng)
                            .sample
                    );
                    assert!(
                        !policy
                            .should_sample(
                                &OperationSampleRequest::new("GetWeather").with_priority_tag(0),
                                &rng
                            )
                            .sample
                    );
                }
            });
        }
    });
}

#[test]
fn seeded_runs_are_reproducible() {
    let policy = policy();
    let run = |seed| {
        let rng = SeededRandom::new(seed);
        (0..1_000)
            .map(|_| {
                policy
                    .should_sample(&OperationSampleRequest::new("GetWeather"), &rng)
                    .sample
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn configured_ratios_are_used() {
    let policy = SamplingPolicy::new(
        SamplerConfig::builtin()
            .with_slow_ratio(0.0)
            .with_health_ratio(1.0)
            .with_default_ratio(0.5),
    );
    let rng = ScriptedRandom::new([0.0, 0.49, 0.5]);

    assert!(!policy.should_sample(&OperationSampleRequest::new("slow"), &rng).sample);
    assert!(policy.should_sample(&OperationSampleRequest::new("health"), &rng).sample);
    assert!(!policy.should_sample(&OperationSampleRequest::new("other"), &rng).sample);
    assert_eq!(rng.draws(), 3);
}
