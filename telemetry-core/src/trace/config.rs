//! Sampler configuration
//!
//! Rule probabilities default to the policy's built-in rates and can be
//! overridden through the environment.
use std::env;
use std::str::FromStr;

const DEFAULT_SLOW_RATIO: f64 = 0.8;
const DEFAULT_HEALTH_RATIO: f64 = 0.01;
const DEFAULT_RATIO: f64 = 0.1;

const SLOW_RATIO_ENV: &str = "TELEMETRY_SAMPLER_SLOW_RATIO";
const HEALTH_RATIO_ENV: &str = "TELEMETRY_SAMPLER_HEALTH_RATIO";
const DEFAULT_RATIO_ENV: &str = "TELEMETRY_SAMPLER_DEFAULT_RATIO";

/// Probabilities used by the probabilistic rules of a
/// [`SamplingPolicy`](crate::trace::SamplingPolicy).
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct SamplerConfig {
    /// Probability of keeping an operation whose name contains `slow`.
    pub slow_ratio: f64,
    /// Probability of keeping an operation whose name contains `health`.
    pub health_ratio: f64,
    /// Probability of keeping an operation no other rule resolved.
    pub default_ratio: f64,
}

impl Default for SamplerConfig {
    /// Create the default configuration, applying environment overrides.
    fn default() -> Self {
        let mut config = SamplerConfig::builtin();

        if let Some(ratio) = ratio_from_env(SLOW_RATIO_ENV) {
            config.slow_ratio = ratio;
        }
        if let Some(ratio) = ratio_from_env(HEALTH_RATIO_ENV) {
            config.health_ratio = ratio;
        }
        if let Some(ratio) = ratio_from_env(DEFAULT_RATIO_ENV) {
            config.default_ratio = ratio;
        }

        config
    }
}

impl SamplerConfig {
    /// The built-in rates, ignoring the environment.
    pub fn builtin() -> Self {
        SamplerConfig {
            slow_ratio: DEFAULT_SLOW_RATIO,
            health_ratio: DEFAULT_HEALTH_RATIO,
            default_ratio: DEFAULT_RATIO,
        }
    }

    /// Set the probability used for `slow` operations, clamped into `[0, 1]`.
    pub fn with_slow_ratio(mut self, ratio: f64) -> Self {
        self.slow_ratio = clamp_ratio(ratio);
        self
    }

    /// Set the probability used for `health` operations, clamped into `[0, 1]`.
    pub fn with_health_ratio(mut self, ratio: f64) -> Self {
        self.health_ratio = clamp_ratio(ratio);
        self
    }

    /// Set the fallback probability, clamped into `[0, 1]`.
    pub fn with_default_ratio(mut self, ratio: f64) -> Self {
        self.default_ratio = clamp_ratio(ratio);
        self
    }
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

fn ratio_from_env(key: &'static str) -> Option<f64> {
    let raw = env::var(key).ok()?;
    match f64::from_str(raw.trim()) {
        Ok(ratio) if (0.0..=1.0).contains(&ratio) => Some(ratio),
        _ => {
            core_warn!(
                name: "SamplerConfig.InvalidRatio",
                message = "Sampling ratio must be a float between 0.0 and 1.0. Falling back to the built-in ratio",
                variable = key,
                value = raw.as_str()
            );
            None
        }
    }
}
