//! Concurrent aggregation of named instruments.
//!
//! A [`MetricsAggregationService`] owns an immutable [`InstrumentRegistry`]
//! and the [`ActiveOperationTracker`] two of its instruments are backed by.
//! Callers push measurements by instrument name; an exporter pulls a
//! cumulative [`data::Metric`] snapshot of every instrument through
//! [`MetricsAggregationService::collect`].
//!
//! Measurements may carry tags. Tag order does not matter and a key given
//! twice keeps its last value, so `[a=1, b=2]` and `[b=2, a=1]` aggregate into
//! the same series.
//!
//! | kind | pushed with | storage per series |
//! |---|---|---|
//! | [`InstrumentKind::Counter`] | [`add_count`](MetricsAggregationService::add_count) | atomic `u64` |
//! | [`InstrumentKind::UpDownCounter`] | [`adjust_gauge`](MetricsAggregationService::adjust_gauge) | atomic `i64` |
//! | [`InstrumentKind::Histogram`] | [`record_distribution`](MetricsAggregationService::record_distribution) | explicit buckets, count, sum, min, max |
//! | observable kinds | callback at collection | none |
mod attribute_set;
mod config;
pub mod data;
mod error;
mod instrument;
pub(crate) mod internal;
pub mod names;
mod registry;
mod service;
mod tracker;

pub use config::MetricsConfig;
pub use error::{MetricError, MetricResult};
pub use instrument::{Instrument, InstrumentKind};
pub use registry::{InstrumentRegistry, RegistryBuilder, DEFAULT_HISTOGRAM_BOUNDARIES};
pub use service::{ActiveOperation, MetricsAggregationService};
pub use tracker::ActiveOperationTracker;
