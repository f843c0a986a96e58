//! # Sampling
//!
//! Decides whether the trace detail of an operation should be kept.
//!
//! A [`SamplingPolicy`] receives an [`OperationSampleRequest`] describing the
//! operation about to be traced and returns a [`SamplingDecision`]. The
//! tracing substrate that creates spans uses the decision to retain or
//! discard span detail; this module neither creates spans nor reads trace
//! context off the wire.
//!
//! ```
//! use telemetry_core::trace::{OperationSampleRequest, SamplingPolicy, ShouldSample};
//! use telemetry_core::SeededRandom;
//!
//! let policy = SamplingPolicy::default();
//! let rng = SeededRandom::new(1);
//!
//! // A remote parent's decision always wins.
//! let request = OperationSampleRequest::new("HealthCheck").with_parent_recorded(true);
//! assert!(policy.should_sample(&request, &rng).sample);
//! ```
mod config;
mod sampler;

pub use config::SamplerConfig;
pub use sampler::{
    OperationSampleRequest, SamplingDecision, SamplingPolicy, SamplingRule, ShouldSample,
};
