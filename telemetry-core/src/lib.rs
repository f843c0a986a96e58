//! # Telemetry Core
//!
//! The decision-and-aggregation core used by request-serving code to answer
//! one question: how much should be observed and recorded about an operation?
//!
//! It provides two independent pieces:
//!
//! * [`trace::SamplingPolicy`] decides, per traced operation, whether its
//!   trace detail should be kept. Decisions are driven by a remote parent's
//!   decision, keywords in the operation name and an optional priority tag,
//!   and draw randomness from an injectable [`RandomSource`].
//! * [`metrics::MetricsAggregationService`] owns a fixed registry of named
//!   instruments (counters, histograms, up/down counters and callback-based
//!   observable instruments) that any number of threads may update
//!   concurrently, together with the active-operation and queue-depth
//!   tracker several of those instruments read from.
//!
//! Exporting the collected data and propagating trace context across
//! process boundaries are left to collaborating crates.
//!
//! ## Getting started
//!
//! ```
//! # #[cfg(all(feature = "trace", feature = "metrics"))]
//! # {
//! use opentelemetry::KeyValue;
//! use telemetry_core::metrics::{names, MetricsAggregationService, MetricsConfig};
//! use telemetry_core::trace::{OperationSampleRequest, SamplingPolicy, ShouldSample};
//! use telemetry_core::ThreadLocalRandom;
//!
//! let policy = SamplingPolicy::default();
//! let service = MetricsAggregationService::new(MetricsConfig::default());
//!
//! let request = OperationSampleRequest::new("GetWeatherError");
//! let decision = policy.should_sample(&request, &ThreadLocalRandom::default());
//! assert!(decision.sample);
//!
//! let _active = service.track_active();
//! service
//!     .add_count(names::REQUESTS_TOTAL, 1, &[KeyValue::new("endpoint", "/weather")])
//!     .unwrap();
//! # }
//! ```
//!
//! ## Crate Feature Flags
//!
//! * `trace`: Includes the sampling policy engine.
//! * `metrics`: Includes the instrument registry and aggregation service.
//! * `internal-logs`: Emits internal diagnostics through `tracing`.
//! * `testing`: Exposes helpers such as a scripted random source.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![cfg_attr(test, deny(warnings))]

#[macro_use]
mod internal_logging;

#[cfg(feature = "metrics")]
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
pub mod metrics;
mod random;
#[cfg(any(feature = "testing", test))]
#[cfg_attr(docsrs, doc(cfg(any(feature = "testing", test))))]
pub mod testing;
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub mod trace;

pub use random::{RandomSource, SeededRandom, ThreadLocalRandom};
