//! Snapshots handed to an exporter by
//! [`InstrumentRegistry::collect`](super::InstrumentRegistry::collect).
//!
//! Every snapshot is cumulative: values are totals since the registry was
//! built, and taking a snapshot never resets them. A snapshot is a copy; it
//! does not change when instruments are updated afterwards.

use std::{borrow::Cow, time::SystemTime};

use opentelemetry::KeyValue;

use super::InstrumentKind;

/// Snapshot of one registered instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    /// Registered instrument name, e.g. `requests_total`.
    pub name: Cow<'static, str>,
    /// Registered description.
    pub description: Cow<'static, str>,
    /// Registered unit, e.g. `ms`.
    pub unit: Cow<'static, str>,
    /// How the instrument was registered.
    pub kind: InstrumentKind,
    /// The collected values.
    pub data: AggregatedMetrics,
}

/// Collected values, split by numeric type.
///
/// Counters report `u64`, up/down counters `i64`, histograms and gauges
/// `f64`.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregatedMetrics {
    /// Histograms and observable gauges.
    F64(MetricData<f64>),
    /// Counters.
    U64(MetricData<u64>),
    /// Up/down counters, tracked or observable.
    I64(MetricData<i64>),
}

/// Shape of the collected values.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricData<T> {
    /// A reading taken by an observable callback.
    Gauge(Gauge<T>),
    /// A running total.
    Sum(Sum<T>),
    /// A bucketed distribution.
    Histogram(Histogram<T>),
}

impl From<MetricData<f64>> for AggregatedMetrics {
    fn from(value: MetricData<f64>) -> Self {
        AggregatedMetrics::F64(value)
    }
}

impl From<MetricData<i64>> for AggregatedMetrics {
    fn from(value: MetricData<i64>) -> Self {
        AggregatedMetrics::I64(value)
    }
}

impl From<MetricData<u64>> for AggregatedMetrics {
    fn from(value: MetricData<u64>) -> Self {
        AggregatedMetrics::U64(value)
    }
}

/// One reading of an observable gauge.
#[derive(Clone, Debug, PartialEq)]
pub struct GaugeDataPoint<T> {
    /// Always empty: callbacks report a single untagged value.
    pub attributes: Vec<KeyValue>,
    /// The value the callback returned.
    pub value: T,
}

/// Result of invoking an observable gauge's callback once.
#[derive(Clone, Debug, PartialEq)]
pub struct Gauge<T> {
    /// A single point holding the callback's value.
    pub data_points: Vec<GaugeDataPoint<T>>,
    /// When the callback ran.
    pub time: SystemTime,
}

/// Running total of one tag set.
#[derive(Clone, Debug, PartialEq)]
pub struct SumDataPoint<T> {
    /// Normalised tags, sorted by key. Empty for the untagged series.
    pub attributes: Vec<KeyValue>,
    /// Total of every delta applied since the registry was built.
    pub value: T,
}

/// Running totals of a counter or up/down counter.
#[derive(Clone, Debug, PartialEq)]
pub struct Sum<T> {
    /// One point per tag set, the untagged series first.
    pub data_points: Vec<SumDataPoint<T>>,
    /// When the instrument was created.
    pub start_time: SystemTime,
    /// When the snapshot was taken.
    pub time: SystemTime,
    /// `true` for counters, `false` for up/down counters.
    pub is_monotonic: bool,
}

/// Distribution of the observations recorded under one tag set.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramDataPoint<T> {
    /// Normalised tags, sorted by key. Empty for the untagged series.
    pub attributes: Vec<KeyValue>,
    /// Number of observations.
    pub count: u64,
    /// Upper bucket boundaries, inclusive. An implicit last bucket holds
    /// everything above the final boundary.
    pub bounds: Vec<f64>,
    /// Observations per bucket; one longer than `bounds`.
    pub bucket_counts: Vec<u64>,
    /// Smallest observation, `None` until something was recorded.
    pub min: Option<T>,
    /// Largest observation, `None` until something was recorded.
    pub max: Option<T>,
    /// Sum of all observations.
    pub sum: T,
}

/// Distributions recorded by a histogram.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram<T> {
    /// One point per tag set, the untagged series first.
    pub data_points: Vec<HistogramDataPoint<T>>,
    /// When the instrument was created.
    pub start_time: SystemTime,
    /// When the snapshot was taken.
    pub time: SystemTime,
}
