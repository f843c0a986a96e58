use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64};
use std::sync::Arc;
use std::time::SystemTime;

use opentelemetry::KeyValue;

use super::data::{Gauge, GaugeDataPoint, Metric, MetricData, Sum as SumData, SumDataPoint};
use super::internal::{validate_bucket_boundaries, Histogram, Sum};
use super::{Instrument, InstrumentKind, MetricError, MetricResult};

/// Bucket boundaries used when a histogram is registered without explicit
/// boundaries.
pub const DEFAULT_HISTOGRAM_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0,
];

type GaugeCallback = Box<dyn Fn() -> f64 + Send + Sync>;
type UpDownCallback = Box<dyn Fn() -> i64 + Send + Sync>;

enum Storage {
    Counter(Sum<AtomicU64>),
    UpDownCounter(Sum<AtomicI64>),
    // Untagged only: the series is an external cell that must stay equal to
    // its owner's count.
    SharedUpDownCounter(Sum<AtomicI64>),
    Histogram(Histogram),
    ObservableGauge(GaugeCallback),
    ObservableUpDownCounter(UpDownCallback),
}

struct Entry {
    instrument: Instrument,
    storage: Storage,
}

/// The process-wide set of named instruments.
///
/// A registry is assembled once through [`InstrumentRegistry::builder`] and is
/// immutable afterwards: instruments are never added or removed for the
/// registry's lifetime, so lookups need no lock. Instrument values are updated
/// through shared references from any number of threads.
///
/// ```
/// use opentelemetry::KeyValue;
/// use telemetry_core::metrics::InstrumentRegistry;
///
/// let registry = InstrumentRegistry::builder()
///     .with_counter("jobs_total", "{job}", "Jobs started")
///     .with_observable_gauge("temperature", "Cel", "Board temperature", || 21.5)
///     .build()
///     .unwrap();
///
/// registry.add("jobs_total", 1, &[KeyValue::new("queue", "default")]).unwrap();
/// assert!(registry.add("jobs_started", 1, &[]).is_err());
/// assert_eq!(registry.collect().len(), 2);
/// ```
pub struct InstrumentRegistry {
    entries: Vec<Entry>,
    by_name: HashMap<Cow<'static, str>, usize>,
    start: SystemTime,
}

impl InstrumentRegistry {
    /// Start assembling a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Adds a non-negative `delta` to a counter.
    ///
    /// Fails with [`MetricError::UnknownInstrument`] if `name` was never
    /// registered, [`MetricError::InstrumentKindMismatch`] if it is not a
    /// counter and [`MetricError::InvalidDelta`] if `delta` is negative.
    ///
    /// Totals wrap around past `u64::MAX`.
    pub fn add(&self, name: &str, delta: i64, attributes: &[KeyValue]) -> MetricResult<()> {
        let entry = self.entry(name)?;
        match &entry.storage {
            Storage::Counter(sum) => {
                let delta = u64::try_from(delta).map_err(|_| {
                    core_warn!(
                        name: "InstrumentRegistry.InvalidDelta",
                        instrument_name = name,
                        delta = delta
                    );
                    MetricError::InvalidDelta {
                        name: entry.instrument.name.clone(),
                        delta,
                    }
                })?;
                sum.measure(delta, attributes);
                Ok(())
            }
            _ => Err(kind_mismatch(entry, InstrumentKind::Counter)),
        }
    }

    /// Records one observation in a histogram. Any value is accepted.
    pub fn record(&self, name: &str, value: f64, attributes: &[KeyValue]) -> MetricResult<()> {
        let entry = self.entry(name)?;
        match &entry.storage {
            Storage::Histogram(histogram) => {
                histogram.measure(value, attributes);
                Ok(())
            }
            _ => Err(kind_mismatch(entry, InstrumentKind::Histogram)),
        }
    }

    /// Adds a signed `delta` to an up/down counter. The running total has no
    /// floor and may become negative.
    ///
    /// Up/down counters backed by a shared cell only have an untagged series;
    /// tagged adjustments to them fail with
    /// [`MetricError::AttributesNotSupported`].
    pub fn adjust(&self, name: &str, delta: i64, attributes: &[KeyValue]) -> MetricResult<()> {
        let entry = self.entry(name)?;
        match &entry.storage {
            Storage::UpDownCounter(sum) => {
                sum.measure(delta, attributes);
                Ok(())
            }
            Storage::SharedUpDownCounter(sum) => {
                if !attributes.is_empty() {
                    core_warn!(
                        name: "InstrumentRegistry.AttributesNotSupported",
                        instrument_name = name,
                        attribute_count = attributes.len()
                    );
                    return Err(MetricError::AttributesNotSupported(
                        entry.instrument.name.clone(),
                    ));
                }
                sum.measure(delta, attributes);
                Ok(())
            }
            _ => Err(kind_mismatch(entry, InstrumentKind::UpDownCounter)),
        }
    }

    /// The instrument registered under `name`.
    pub fn instrument(&self, name: &str) -> Option<&Instrument> {
        self.by_name
            .get(name)
            .map(|&index| &self.entries[index].instrument)
    }

    /// All instruments, in registration order.
    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.entries.iter().map(|entry| &entry.instrument)
    }

    /// Number of registered instruments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no instrument is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Produces a cumulative snapshot of every instrument, in registration
    /// order.
    ///
    /// Synchronous instruments report one data point per distinct tag set,
    /// the untagged series always first. Observable instruments invoke their
    /// callback exactly once per call.
    pub fn collect(&self) -> Vec<Metric> {
        self.entries
            .iter()
            .map(|entry| Metric {
                name: entry.instrument.name.clone(),
                description: entry.instrument.description.clone(),
                unit: entry.instrument.unit.clone(),
                kind: entry.instrument.kind,
                data: match &entry.storage {
                    Storage::Counter(sum) => MetricData::Sum(sum.cumulative()).into(),
                    Storage::UpDownCounter(sum) | Storage::SharedUpDownCounter(sum) => {
                        MetricData::Sum(sum.cumulative()).into()
                    }
                    Storage::Histogram(histogram) => {
                        MetricData::Histogram(histogram.cumulative()).into()
                    }
                    Storage::ObservableGauge(callback) => MetricData::Gauge(Gauge {
                        data_points: vec![GaugeDataPoint {
                            attributes: vec![],
                            value: callback(),
                        }],
                        time: SystemTime::now(),
                    })
                    .into(),
                    Storage::ObservableUpDownCounter(callback) => MetricData::Sum(SumData {
                        data_points: vec![SumDataPoint {
                            attributes: vec![],
                            value: callback(),
                        }],
                        start_time: self.start,
                        time: SystemTime::now(),
                        is_monotonic: false,
                    })
                    .into(),
                },
            })
            .collect()
    }

    fn entry(&self, name: &str) -> MetricResult<&Entry> {
        match self.by_name.get(name) {
            Some(&index) => Ok(&self.entries[index]),
            None => {
                core_warn!(
                    name: "InstrumentRegistry.UnknownInstrument",
                    instrument_name = name
                );
                Err(MetricError::UnknownInstrument(Cow::Owned(name.to_owned())))
            }
        }
    }
}

fn kind_mismatch(entry: &Entry, expected: InstrumentKind) -> MetricError {
    core_warn!(
        name: "InstrumentRegistry.InstrumentKindMismatch",
        instrument_name = entry.instrument.name(),
        expected = format!("{:?}", expected),
        actual = format!("{:?}", entry.instrument.kind)
    );
    MetricError::InstrumentKindMismatch {
        name: entry.instrument.name.clone(),
        expected,
        actual: entry.instrument.kind,
    }
}

impl fmt::Debug for InstrumentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentRegistry")
            .field("instruments", &self.instruments().collect::<Vec<_>>())
            .finish()
    }
}

/// Assembles an [`InstrumentRegistry`].
///
/// Registrations are validated as they are added; the first invalid or
/// duplicate registration is reported by [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Entry>,
    error: Option<MetricError>,
}

impl RegistryBuilder {
    /// Register a monotonic counter.
    pub fn with_counter(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        let instrument = Instrument::new(
            InstrumentKind::Counter,
            name.into(),
            unit.into(),
            description.into(),
        );
        self.register(instrument, || Ok(Storage::Counter(Sum::new(true))))
    }

    /// Register an up/down counter.
    pub fn with_up_down_counter(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        let instrument = Instrument::new(
            InstrumentKind::UpDownCounter,
            name.into(),
            unit.into(),
            description.into(),
        );
        self.register(instrument, || Ok(Storage::UpDownCounter(Sum::new(false))))
    }

    /// Register an up/down counter whose only series is stored in `cell`.
    /// Tagged adjustments are rejected so the instrument always equals the
    /// cell.
    pub(crate) fn with_shared_up_down_counter(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        cell: Arc<AtomicI64>,
    ) -> Self {
        let instrument = Instrument::new(
            InstrumentKind::UpDownCounter,
            name.into(),
            unit.into(),
            description.into(),
        );
        self.register(instrument, move || {
            Ok(Storage::SharedUpDownCounter(Sum::with_shared_cell(
                cell, false,
            )))
        })
    }

    /// Register a histogram using [`DEFAULT_HISTOGRAM_BOUNDARIES`].
    pub fn with_histogram(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.with_histogram_boundaries(
            name,
            unit,
            description,
            DEFAULT_HISTOGRAM_BOUNDARIES.to_vec(),
        )
    }

    /// Register a histogram with explicit bucket boundaries.
    ///
    /// Boundaries must be finite, sorted and free of duplicates.
    pub fn with_histogram_boundaries(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        boundaries: Vec<f64>,
    ) -> Self {
        let instrument = Instrument::new(
            InstrumentKind::Histogram,
            name.into(),
            unit.into(),
            description.into(),
        );
        self.register(instrument, move || {
            validate_bucket_boundaries(&boundaries)
                .map_err(MetricError::InvalidInstrumentConfiguration)?;
            Ok(Storage::Histogram(Histogram::new(boundaries)))
        })
    }

    /// Register a gauge whose value is read from `callback` at collection
    /// time.
    ///
    /// The callback may run on any thread, concurrently with itself and with
    /// every recording operation. It must only read state.
    pub fn with_observable_gauge<F>(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        callback: F,
    ) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let instrument = Instrument::new(
            InstrumentKind::ObservableGauge,
            name.into(),
            unit.into(),
            description.into(),
        );
        self.register(instrument, move || {
            Ok(Storage::ObservableGauge(Box::new(callback)))
        })
    }

    /// Register an up/down counter whose value is read from `callback` at
    /// collection time.
    ///
    /// The same threading rules as for
    /// [`with_observable_gauge`](RegistryBuilder::with_observable_gauge) apply.
    pub fn with_observable_up_down_counter<F>(
        self,
        name: impl Into<Cow<'static, str>>,
        unit: impl Into<Cow<'static, str>>,
        description: impl Into<Cow<'static, str>>,
        callback: F,
    ) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        let instrument = Instrument::new(
            InstrumentKind::ObservableUpDownCounter,
            name.into(),
            unit.into(),
            description.into(),
        );
        self.register(instrument, move || {
            Ok(Storage::ObservableUpDownCounter(Box::new(callback)))
        })
    }

    /// Finish the registry, or report the first rejected registration.
    pub fn build(self) -> MetricResult<InstrumentRegistry> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let by_name = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.instrument.name.clone(), index))
            .collect();

        core_info!(
            name: "InstrumentRegistry.Built",
            instrument_count = self.entries.len()
        );

        Ok(InstrumentRegistry {
            entries: self.entries,
            by_name,
            start: SystemTime::now(),
        })
    }

    fn register(
        mut self,
        instrument: Instrument,
        storage: impl FnOnce() -> MetricResult<Storage>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        let result = instrument.validate().and_then(|_| {
            if self
                .entries
                .iter()
                .any(|entry| entry.instrument.name == instrument.name)
            {
                Err(MetricError::DuplicateInstrument(instrument.name.clone()))
            } else {
                storage()
            }
        });

        match result {
            Ok(storage) => {
                core_debug!(
                    name: "InstrumentRegistry.InstrumentRegistered",
                    instrument_name = instrument.name(),
                    kind = format!("{:?}", instrument.kind)
                );
                self.entries.push(Entry {
                    instrument,
                    storage,
                });
            }
            Err(err) => {
                core_error!(
                    name: "InstrumentRegistry.RegistrationRejected",
                    instrument_name = instrument.name(),
                    reason = format!("{}", err)
                );
                self.error = Some(err);
            }
        }
        self
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field(
                "instruments",
                &self
                    .entries
                    .iter()
                    .map(|entry| &entry.instrument)
                    .collect::<Vec<_>>(),
            )
            .field("error", &self.error)
            .finish()
    }
}
