use crate::trace::SamplerConfig;
use crate::RandomSource;
use std::borrow::Cow;

/// Description of an operation that is about to be traced.
///
/// Requests are immutable values: they are built once per operation, handed
/// to a sampler and dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSampleRequest {
    name: Cow<'static, str>,
    parent_recorded: Option<bool>,
    priority_tag: Option<i64>,
}

impl OperationSampleRequest {
    /// Create a request for the operation called `name`, with no remote parent
    /// and no priority tag.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        OperationSampleRequest {
            name: name.into(),
            parent_recorded: None,
            priority_tag: None,
        }
    }

    /// Mark the operation as having a remote parent, which either was or was
    /// not recorded upstream.
    pub fn with_parent_recorded(mut self, recorded: bool) -> Self {
        self.parent_recorded = Some(recorded);
        self
    }

    /// Attach an out-of-band priority hint. `0` forces a drop and `2` forces
    /// a sample; any other value is treated as no hint.
    pub fn with_priority_tag(mut self, tag: i64) -> Self {
        self.priority_tag = Some(tag);
        self
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Decision of the remote parent, if there is one.
    pub fn parent_recorded(&self) -> Option<bool> {
        self.parent_recorded
    }

    /// Priority hint, if one was attached.
    pub fn priority_tag(&self) -> Option<i64> {
        self.priority_tag
    }
}

/// The rule that resolved a [`SamplingDecision`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SamplingRule {
    /// The remote parent's decision was inherited.
    RemoteParent,
    /// The name contains `error`; always kept.
    ErrorKeyword,
    /// The name contains `slow`; kept with the slow ratio.
    SlowKeyword,
    /// The name contains `health`; kept with the health ratio.
    HealthKeyword,
    /// Priority tag `0`; always dropped.
    PriorityDrop,
    /// Priority tag `2`; always kept.
    PriorityKeep,
    /// Nothing else matched; kept with the default ratio.
    DefaultRatio,
}

/// Outcome of a sampling decision.
///
/// Decisions are produced fresh for each request and are never cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingDecision {
    /// Whether the operation's trace detail should be recorded.
    pub sample: bool,
    /// Which rule produced the decision. Informational only.
    pub rule: SamplingRule,
}

impl SamplingDecision {
    fn new(sample: bool, rule: SamplingRule) -> Self {
        SamplingDecision { sample, rule }
    }
}

/// The `ShouldSample` interface allows implementations to provide samplers
/// which return a [`SamplingDecision`] based on information that is available
/// just before the operation's span is created.
///
/// Implementations must not fail for any input and must not have side effects
/// beyond drawing from the supplied [`RandomSource`]. A deterministic source
/// yields a deterministic decision.
pub trait ShouldSample: Send + Sync + std::fmt::Debug {
    /// Returns the [`SamplingDecision`] for the operation described by `request`.
    fn should_sample(
        &self,
        request: &OperationSampleRequest,
        rng: &dyn RandomSource,
    ) -> SamplingDecision;
}

/// Keyword and priority based sampling policy.
///
/// Rules are evaluated in order and the first match wins:
///
/// 1. A remote parent's decision is inherited as is.
/// 2. Names containing `error` are always sampled.
/// 3. Names containing `slow` are sampled with [`SamplerConfig::slow_ratio`].
/// 4. Names containing `health` are sampled with [`SamplerConfig::health_ratio`].
/// 5. Priority tag `0` drops the operation.
/// 6. Priority tag `2` samples the operation.
/// 7. Anything else, including no tag and tag `1`, is sampled with
///    [`SamplerConfig::default_ratio`].
///
/// Keywords are matched case-insensitively anywhere in the name. Rules 3, 4
/// and 7 draw exactly one value from the random source; all other rules draw
/// none.
#[derive(Clone, Debug)]
pub struct SamplingPolicy {
    config: SamplerConfig,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::new(SamplerConfig::default())
    }
}

impl SamplingPolicy {
    /// Create a policy using the ratios in `config`.
    pub fn new(config: SamplerConfig) -> Self {
        SamplingPolicy { config }
    }

    /// The ratios this policy samples with.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}

impl ShouldSample for SamplingPolicy {
    fn should_sample(
        &self,
        request: &OperationSampleRequest,
        rng: &dyn RandomSource,
    ) -> SamplingDecision {
        if let Some(recorded) = request.parent_recorded {
            return SamplingDecision::new(recorded, SamplingRule::RemoteParent);
        }

        let name = request.name();
        if contains_ignore_ascii_case(name, "error") {
            return SamplingDecision::new(true, SamplingRule::ErrorKeyword);
        }
        if contains_ignore_ascii_case(name, "slow") {
            return SamplingDecision::new(
                sample_with_ratio(self.config.slow_ratio, rng),
                SamplingRule::SlowKeyword,
            );
        }
        if contains_ignore_ascii_case(name, "health") {
            return SamplingDecision::new(
                sample_with_ratio(self.config.health_ratio, rng),
                SamplingRule::HealthKeyword,
            );
        }

        match request.priority_tag {
            Some(0) => SamplingDecision::new(false, SamplingRule::PriorityDrop),
            Some(2) => SamplingDecision::new(true, SamplingRule::PriorityKeep),
            // No tag and tag 1 share the default rate, as does any unknown tag.
            _ => SamplingDecision::new(
                sample_with_ratio(self.config.default_ratio, rng),
                SamplingRule::DefaultRatio,
            ),
        }
    }
}

/// Draws exactly one value, even when the ratio makes the outcome certain.
fn sample_with_ratio(ratio: f64, rng: &dyn RandomSource) -> bool {
    rng.next_f64() < ratio
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRandom;
    use crate::SeededRandom;
    use rstest::rstest;

    fn policy() -> SamplingPolicy {
        SamplingPolicy::new(SamplerConfig::builtin())
    }

    #[rustfmt::skip]
    fn deterministic_data() -> Vec<(&'static str, OperationSampleRequest, bool, SamplingRule)> {
        vec![
            // Remote parent wins over every other rule
            ("recorded_parent", OperationSampleRequest::new("GetWeather").with_parent_recorded(true), true, SamplingRule::RemoteParent),
            ("recorded_parent_health", OperationSampleRequest::new("HealthCheck").with_parent_recorded(true), true, SamplingRule::RemoteParent),
            ("recorded_parent_drop_tag", OperationSampleRequest::new("GetWeather").with_parent_recorded(true).with_priority_tag(0), true, SamplingRule::RemoteParent),
            ("unrecorded_parent", OperationSampleRequest::new("GetWeather").with_parent_recorded(false), false, SamplingRule::RemoteParent),
            ("unrecorded_parent_error", OperationSampleRequest::new("ErrorEndpoint").with_parent_recorded(false), false, SamplingRule::RemoteParent),
            ("unrecorded_parent_keep_tag", OperationSampleRequest::new("GetWeather").with_parent_recorded(false).with_priority_tag(2), false, SamplingRule::RemoteParent),

            // Error keyword, any case
            ("error_lower", OperationSampleRequest::new("error"), true, SamplingRule::ErrorKeyword),
            ("error_title", OperationSampleRequest::new("SimulateError"), true, SamplingRule::ErrorKeyword),
            ("error_upper", OperationSampleRequest::new("GET /ERROR"), true, SamplingRule::ErrorKeyword),
            ("error_beats_slow", OperationSampleRequest::new("SlowError"), true, SamplingRule::ErrorKeyword),
            ("error_beats_drop_tag", OperationSampleRequest::new("error").with_priority_tag(0), true, SamplingRule::ErrorKeyword),

            // Priority tags
            ("drop_tag", OperationSampleRequest::new("GetWeather").with_priority_tag(0), false, SamplingRule::PriorityDrop),
            ("keep_tag", OperationSampleRequest::new("GetWeather").with_priority_tag(2), true, SamplingRule::PriorityKeep),
            ("keep_tag_empty_name", OperationSampleRequest::new("").with_priority_tag(2), true, SamplingRule::PriorityKeep),
        ]
    }

    #[test]
    fn deterministic_rules_never_draw() {
        for (name, request, expected, rule) in deterministic_data() {
            // Every scripted value would flip a probabilistic rule to "sample".
            let rng = ScriptedRandom::new([0.0]);
            for _ in 0..100 {
                let decision = policy().should_sample(&request, &rng);
                assert_eq!(decision.sample, expected, "{name}");
                assert_eq!(decision.rule, rule, "{name}");
            }
            assert_eq!(rng.draws(), 0, "{name} drew a random value");
        }
    }

    #[rstest]
    #[case::slow("SlowEndpoint", SamplingRule::SlowKeyword)]
    #[case::slow_beats_health("slow-health", SamplingRule::SlowKeyword)]
    #[case::health("HealthCheck", SamplingRule::HealthKeyword)]
    #[case::health_beats_tags("health", SamplingRule::HealthKeyword)]
    #[case::no_tag("GetWeather", SamplingRule::DefaultRatio)]
    #[case::empty_name("", SamplingRule::DefaultRatio)]
    fn probabilistic_rules_draw_once(#[case] name: &'static str, #[case] rule: SamplingRule) {
        let rng = ScriptedRandom::new([0.5]);
        let decision = policy().should_sample(&OperationSampleRequest::new(name), &rng);
        assert_eq!(decision.rule, rule);
        assert_eq!(rng.draws(), 1);
    }

    #[rstest]
    #[case::tag_one(Some(1))]
    #[case::no_tag(None)]
    #[case::negative_tag(Some(-1))]
    #[case::large_tag(Some(7))]
    fn unrecognized_tags_use_default_ratio(#[case] tag: Option<i64>) {
        // Tag 1 is not a distinct rate: it falls through exactly like no tag.
        let mut request = OperationSampleRequest::new("GetWeather");
        if let Some(tag) = tag {
            request = request.with_priority_tag(tag);
        }

        let below = ScriptedRandom::new([0.09]);
        let above = ScriptedRandom::new([0.1]);
        let kept = policy().should_sample(&request, &below);
        let dropped = policy().should_sample(&request, &above);

        assert_eq!(kept, SamplingDecision::new(true, SamplingRule::DefaultRatio));
        assert_eq!(dropped, SamplingDecision::new(false, SamplingRule::DefaultRatio));
    }

    #[test]
    fn slow_endpoint_scripted_sequence() {
        let draws = [0.1, 0.75, 0.81, 0.2, 0.95, 0.05, 0.79, 0.99, 0.5, 0.3];
        let expected = [true, true, false, true, false, true, true, false, true, true];
        let rng = ScriptedRandom::new(draws);
        let request = OperationSampleRequest::new("SlowEndpoint");

        let decisions: Vec<bool> = (0..draws.len())
            .map(|_| policy().should_sample(&request, &rng).sample)
            .collect();

        assert_eq!(decisions, expected);
        assert_eq!(rng.draws(), draws.len());
    }

    #[test]
    fn ratio_boundaries() {
        let always = SamplingPolicy::new(SamplerConfig::builtin().with_default_ratio(1.0));
        let never = SamplingPolicy::new(SamplerConfig::builtin().with_default_ratio(0.0));
        let request = OperationSampleRequest::new("GetWeather");

        let rng = ScriptedRandom::new([0.0, 0.999_999]);
        for _ in 0..4 {
            assert!(always.should_sample(&request, &rng).sample);
            assert!(!never.should_sample(&request, &rng).sample);
        }
        assert_eq!(rng.draws(), 8);
    }

    #[rustfmt::skip]
    fn ratio_data() -> Vec<(&'static str, OperationSampleRequest, f64)> {
        vec![
            ("slow", OperationSampleRequest::new("SlowEndpoint"), 0.8),
            ("slow_upper", OperationSampleRequest::new("SLOW"), 0.8),
            ("health", OperationSampleRequest::new("health"), 0.01),
            ("default_no_tag", OperationSampleRequest::new("GetWeather"), 0.1),
            ("default_tag_one", OperationSampleRequest::new("GetWeather").with_priority_tag(1), 0.1),
            ("default_unknown_tag", OperationSampleRequest::new("Fibonacci").with_priority_tag(5), 0.1),
        ]
    }

    #[test]
    fn sampling_rates_converge() {
        let total = 100_000;
        for (seed, (name, request, expectation)) in ratio_data().into_iter().enumerate() {
            let rng = SeededRandom::new(seed as u64 + 1);
            let sampled = (0..total)
                .filter(|_| policy().should_sample(&request, &rng).sample)
                .count();

            let got = sampled as f64 / total as f64;
            // See https://en.wikipedia.org/wiki/Binomial_proportion_confidence_interval
            let z = 4.75342; // This should succeed 99.9999% of the time
            let tolerance = z * (expectation * (1.0 - expectation) / total as f64).sqrt();
            let diff = (got - expectation).abs();
            assert!(
                diff <= tolerance && diff <= 0.01,
                "{} got {:?} (diff: {}), expected {} (w/tolerance: {})",
                name,
                got,
                diff,
                expectation,
                tolerance
            );
        }
    }

    #[test]
    fn keyword_matching() {
        assert!(contains_ignore_ascii_case("SlowEndpoint", "slow"));
        assert!(contains_ignore_ascii_case("/api/HEALTH/live", "health"));
        assert!(!contains_ignore_ascii_case("slo", "slow"));
        assert!(!contains_ignore_ascii_case("", "error"));
        assert!(contains_ignore_ascii_case("wetter-fehler-error", "error"));
        // Non-ASCII names are matched byte-wise without panicking.
        assert!(contains_ignore_ascii_case("überSlow", "slow"));
        assert!(!contains_ignore_ascii_case("ßlow", "slow"));
    }

    #[test]
    fn sampler_is_object_safe() {
        let sampler: Box<dyn ShouldSample> = Box::new(policy());
        let rng = SeededRandom::new(3);
        let decision = sampler.should_sample(&OperationSampleRequest::new("Error"), &rng);
        assert!(decision.sample);
    }
}
