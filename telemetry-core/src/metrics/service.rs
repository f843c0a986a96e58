use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;

use super::data::Metric;
use super::{names, ActiveOperationTracker, InstrumentRegistry, MetricResult, MetricsConfig};
use crate::{RandomSource, ThreadLocalRandom};

/// Owns the process-wide instruments and the active-operation tracker.
///
/// The service is created once at process start and handed to every
/// collaborator by cloning it; clones share the same instruments. All
/// operations take `&self`, never block and may be called from any number of
/// threads.
///
/// Construction registers the instruments listed in [`names`]:
///
/// | name | kind |
/// |---|---|
/// | `requests_total`, `errors_total` | counter |
/// | `request_duration`, `processing_time` | histogram |
/// | `active_requests`, `queue_depth` | up/down counter backed by the tracker |
/// | `cpu_usage` | observable gauge |
/// | `thread_pool_size` | observable up/down counter |
///
/// ```
/// use opentelemetry::KeyValue;
/// use telemetry_core::metrics::{names, MetricError, MetricsAggregationService, MetricsConfig};
///
/// let service = MetricsAggregationService::new(MetricsConfig::default());
///
/// {
///     let _guard = service.track_active();
///     assert_eq!(service.snapshot_active(), 1);
///     service
///         .record_distribution(names::REQUEST_DURATION, 12.5, &[KeyValue::new("endpoint", "/weather")])
///         .unwrap();
/// }
/// assert_eq!(service.snapshot_active(), 0);
///
/// assert!(matches!(
///     service.add_count(names::ERRORS_TOTAL, -1, &[]),
///     Err(MetricError::InvalidDelta { .. })
/// ));
/// ```
#[derive(Clone)]
pub struct MetricsAggregationService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    registry: InstrumentRegistry,
    tracker: ActiveOperationTracker,
    config: MetricsConfig,
}

impl MetricsAggregationService {
    /// Creates the service and registers its instruments.
    pub fn new(config: MetricsConfig) -> Self {
        match Self::try_new(config) {
            Ok(service) => service,
            // Every built-in instrument name, unit and boundary is a constant
            // covered by the tests of this module.
            Err(err) => unreachable!("built-in instruments failed to register: {err}"),
        }
    }

    fn try_new(config: MetricsConfig) -> MetricResult<Self> {
        let config = config.normalized();
        let tracker = ActiveOperationTracker::new();

        let cpu_range = config.cpu_usage_range.clone();
        let thread_pool_span = config.worker_thread_span();
        let random = ThreadLocalRandom::default();

        let registry = InstrumentRegistry::builder()
            .with_counter(
                names::REQUESTS_TOTAL,
                names::REQUESTS_TOTAL_UNIT,
                names::REQUESTS_TOTAL_DESCRIPTION,
            )
            .with_counter(
                names::ERRORS_TOTAL,
                names::ERRORS_TOTAL_UNIT,
                names::ERRORS_TOTAL_DESCRIPTION,
            )
            .with_histogram(
                names::REQUEST_DURATION,
                names::REQUEST_DURATION_UNIT,
                names::REQUEST_DURATION_DESCRIPTION,
            )
            .with_histogram(
                names::PROCESSING_TIME,
                names::PROCESSING_TIME_UNIT,
                names::PROCESSING_TIME_DESCRIPTION,
            )
            .with_shared_up_down_counter(
                names::ACTIVE_REQUESTS,
                names::ACTIVE_REQUESTS_UNIT,
                names::ACTIVE_REQUESTS_DESCRIPTION,
                tracker.active_cell(),
            )
            .with_shared_up_down_counter(
                names::QUEUE_DEPTH,
                names::QUEUE_DEPTH_UNIT,
                names::QUEUE_DEPTH_DESCRIPTION,
                tracker.queue_depth_cell(),
            )
            // No OS sampling: a uniform reading within the configured range.
            .with_observable_gauge(
                names::CPU_USAGE,
                names::CPU_USAGE_UNIT,
                names::CPU_USAGE_DESCRIPTION,
                move || {
                    let (start, end) = (*cpu_range.start(), *cpu_range.end());
                    start + random.next_f64() * (end - start)
                },
            )
            .with_observable_up_down_counter(
                names::THREAD_POOL_SIZE,
                names::THREAD_POOL_SIZE_UNIT,
                names::THREAD_POOL_SIZE_DESCRIPTION,
                move || thread_pool_span,
            )
            .build()?;

        core_info!(
            name: "MetricsAggregationService.Created",
            instrument_count = registry.len(),
            min_worker_threads = config.min_worker_threads,
            max_worker_threads = config.max_worker_threads
        );

        Ok(MetricsAggregationService {
            inner: Arc::new(ServiceInner {
                registry,
                tracker,
                config,
            }),
        })
    }

    /// Adds `delta` to the counter `name`.
    ///
    /// # Errors
    ///
    /// [`MetricError::UnknownInstrument`] if no counter of that name exists
    /// and [`MetricError::InvalidDelta`] if `delta` is negative. A failed call
    /// changes nothing.
    ///
    /// [`MetricError::UnknownInstrument`]: super::MetricError::UnknownInstrument
    /// [`MetricError::InvalidDelta`]: super::MetricError::InvalidDelta
    pub fn add_count(&self, name: &str, delta: i64, tags: &[KeyValue]) -> MetricResult<()> {
        self.inner.registry.add(name, delta, tags)
    }

    /// Records `value` in the histogram `name`. Any value is accepted.
    pub fn record_distribution(
        &self,
        name: &str,
        value: f64,
        tags: &[KeyValue],
    ) -> MetricResult<()> {
        self.inner.registry.record(name, value, tags)
    }

    /// Records `duration` in milliseconds in the histogram `name`.
    pub fn record_duration(
        &self,
        name: &str,
        duration: Duration,
        tags: &[KeyValue],
    ) -> MetricResult<()> {
        self.record_distribution(name, duration.as_secs_f64() * 1000.0, tags)
    }

    /// Adds a signed `delta` to the up/down counter `name`. The total may go
    /// negative.
    ///
    /// `active_requests` and `queue_depth` mirror the tracker and only accept
    /// untagged adjustments; tagged ones fail with
    /// [`MetricError::AttributesNotSupported`](super::MetricError::AttributesNotSupported).
    pub fn adjust_gauge(&self, name: &str, delta: i64, tags: &[KeyValue]) -> MetricResult<()> {
        self.inner.registry.adjust(name, delta, tags)
    }

    /// Marks one operation as started. `active_requests` moves in the same
    /// atomic step.
    pub fn increment_active(&self) {
        self.inner.tracker.increment_active();
    }

    /// Marks one operation as finished. Callers must pair every
    /// [`increment_active`](Self::increment_active) with exactly one call,
    /// including on early exits; [`track_active`](Self::track_active) does so
    /// automatically.
    pub fn decrement_active(&self) {
        self.inner.tracker.decrement_active();
    }

    /// Adds `delta` to the queue depth. `queue_depth` moves in the same
    /// atomic step.
    pub fn update_queue_depth(&self, delta: i64) {
        self.inner.tracker.update_queue_depth(delta);
    }

    /// Current number of active operations.
    pub fn snapshot_active(&self) -> i64 {
        self.inner.tracker.active()
    }

    /// Current queue depth.
    pub fn snapshot_queue_depth(&self) -> i64 {
        self.inner.tracker.queue_depth()
    }

    /// Marks one operation as started until the returned guard is dropped.
    pub fn track_active(&self) -> ActiveOperation {
        self.increment_active();
        ActiveOperation {
            service: self.clone(),
        }
    }

    /// Cumulative snapshot of every instrument, in registration order.
    /// Observable callbacks run once per call.
    pub fn collect(&self) -> Vec<Metric> {
        self.inner.registry.collect()
    }

    /// The underlying registry, e.g. for an exporter.
    pub fn registry(&self) -> &InstrumentRegistry {
        &self.inner.registry
    }

    /// The tracker backing `active_requests` and `queue_depth`.
    pub fn tracker(&self) -> &ActiveOperationTracker {
        &self.inner.tracker
    }

    /// The configuration the service was created with.
    pub fn config(&self) -> &MetricsConfig {
        &self.inner.config
    }
}

impl Default for MetricsAggregationService {
    fn default() -> Self {
        MetricsAggregationService::new(MetricsConfig::default())
    }
}

impl fmt::Debug for MetricsAggregationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsAggregationService")
            .field("registry", &self.inner.registry)
            .field("tracker", &self.inner.tracker)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Keeps one operation counted as active for as long as it lives.
///
/// Returned by [`MetricsAggregationService::track_active`].
#[must_use = "dropping the guard immediately marks the operation as finished"]
#[derive(Debug)]
pub struct ActiveOperation {
    service: MetricsAggregationService,
}

impl Drop for ActiveOperation {
    fn drop(&mut self) {
        self.service.decrement_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{AggregatedMetrics, MetricData};
    use crate::metrics::{InstrumentKind, MetricError};

    fn service() -> MetricsAggregationService {
        MetricsAggregationService::new(
            MetricsConfig::default()
                .with_min_worker_threads(4)
                .with_max_worker_threads(64),
        )
    }

    /// Sum over every series of an up/down counter.
    fn up_down_value(service: &MetricsAggregationService, name: &str) -> i64 {
        let metrics = service.collect();
        let metric = metrics
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("metric {name} not collected"));
        match &metric.data {
            AggregatedMetrics::I64(MetricData::Sum(sum)) => {
                sum.data_points.iter().map(|dp| dp.value).sum()
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn builtin_instruments_register() {
        assert!(MetricsAggregationService::try_new(MetricsConfig::default()).is_ok());
    }

    #[test]
    fn instrument_contract() {
        let service = service();
        let instruments = service
            .registry()
            .instruments()
            .map(|i| (i.name(), i.kind(), i.unit(), i.description()))
            .collect::<Vec<_>>();

        assert_eq!(
            instruments,
            vec![
                ("requests_total", InstrumentKind::Counter, "{request}", "Total number of requests processed"),
                ("errors_total", InstrumentKind::Counter, "{error}", "Total number of failed requests"),
                ("request_duration", InstrumentKind::Histogram, "ms", "Duration of request handling"),
                ("processing_time", InstrumentKind::Histogram, "ms", "Time spent processing work items"),
                ("active_requests", InstrumentKind::UpDownCounter, "{request}", "Number of requests currently in flight"),
                ("queue_depth", InstrumentKind::UpDownCounter, "{item}", "Number of work items waiting in the queue"),
                ("cpu_usage", InstrumentKind::ObservableGauge, "%", "Sampled CPU usage percentage"),
                ("thread_pool_size", InstrumentKind::ObservableUpDownCounter, "{thread}", "Span between maximum and minimum worker threads"),
            ]
        );
    }

    #[test]
    fn tracker_and_instruments_move_together() {
        let service = service();
        service.increment_active();
        service.increment_active();
        service.update_queue_depth(5);
        service.decrement_active();
        service.update_queue_depth(-2);

        assert_eq!(service.snapshot_active(), 1);
        assert_eq!(up_down_value(&service, names::ACTIVE_REQUESTS), 1);
        assert_eq!(service.snapshot_queue_depth(), 3);
        assert_eq!(up_down_value(&service, names::QUEUE_DEPTH), 3);
    }

    #[test]
    fn adjust_gauge_on_tracked_instrument_moves_snapshot() {
        let service = service();
        service.adjust_gauge(names::QUEUE_DEPTH, -4, &[]).unwrap();
        assert_eq!(service.snapshot_queue_depth(), -4);
        assert_eq!(up_down_value(&service, names::QUEUE_DEPTH), -4);
    }

    #[test]
    fn tagged_adjustments_of_tracked_instruments_are_rejected() {
        let service = service();
        service.increment_active();
        service.update_queue_depth(2);

        for name in [names::ACTIVE_REQUESTS, names::QUEUE_DEPTH] {
            assert_eq!(
                service.adjust_gauge(name, 5, &[KeyValue::new("k", "v")]),
                Err(MetricError::AttributesNotSupported(name.into()))
            );
        }

        assert_eq!(service.snapshot_active(), 1);
        assert_eq!(up_down_value(&service, names::ACTIVE_REQUESTS), 1);
        assert_eq!(service.snapshot_queue_depth(), 2);
        assert_eq!(up_down_value(&service, names::QUEUE_DEPTH), 2);
    }

    #[test]
    fn contract_violations() {
        let service = service();
        assert_eq!(
            service.add_count("unregistered-name", 1, &[]),
            Err(MetricError::UnknownInstrument("unregistered-name".into()))
        );
        assert!(matches!(
            service.add_count(names::REQUESTS_TOTAL, -1, &[]),
            Err(MetricError::InvalidDelta { delta: -1, .. })
        ));
        assert!(matches!(
            service.record_distribution(names::REQUESTS_TOTAL, 1.0, &[]),
            Err(MetricError::InstrumentKindMismatch { .. })
        ));
        assert!(matches!(
            service.adjust_gauge(names::CPU_USAGE, 1, &[]),
            Err(MetricError::InstrumentKindMismatch { .. })
        ));
    }

    #[test]
    fn track_active_guard() {
        let service = service();
        let first = service.track_active();
        let second = service.track_active();
        assert_eq!(service.snapshot_active(), 2);
        drop(first);
        assert_eq!(service.snapshot_active(), 1);
        drop(second);
        assert_eq!(service.snapshot_active(), 0);
    }

    #[test]
    fn record_duration_in_milliseconds() {
        let service = service();
        service
            .record_duration(names::PROCESSING_TIME, Duration::from_micros(7_500), &[])
            .unwrap();

        let metrics = service.collect();
        let metric = metrics
            .iter()
            .find(|m| m.name == names::PROCESSING_TIME)
            .expect("processing_time collected");
        match &metric.data {
            AggregatedMetrics::F64(MetricData::Histogram(h)) => {
                let dp = &h.data_points[0];
                assert_eq!(dp.count, 1);
                assert!((dp.sum - 7.5).abs() < 1e-9);
                // (5, 10]
                assert_eq!(dp.bucket_counts[2], 1);
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn observable_instruments() {
        let service = MetricsAggregationService::new(
            MetricsConfig::default()
                .with_min_worker_threads(8)
                .with_max_worker_threads(40),
        );

        for _ in 0..100 {
            for metric in service.collect() {
                match (&*metric.name, &metric.data) {
                    (names::CPU_USAGE, AggregatedMetrics::F64(MetricData::Gauge(gauge))) => {
                        let value = gauge.data_points[0].value;
                        assert!((10.0..=90.0).contains(&value), "cpu_usage {value}");
                    }
                    (names::THREAD_POOL_SIZE, AggregatedMetrics::I64(MetricData::Sum(sum))) => {
                        assert_eq!(sum.data_points[0].value, 32);
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn reversed_worker_bounds_are_normalized() {
        let service = MetricsAggregationService::new(
            MetricsConfig::default()
                .with_max_worker_threads(2)
                .with_min_worker_threads(10),
        );
        assert_eq!(service.config().min_worker_threads, 2);
        assert_eq!(service.config().max_worker_threads, 10);

        for metric in service.collect() {
            if let (names::THREAD_POOL_SIZE, AggregatedMetrics::I64(MetricData::Sum(sum))) =
                (&*metric.name, &metric.data)
            {
                assert_eq!(sum.data_points[0].value, 8);
            }
        }
    }

    #[test]
    fn clones_share_state() {
        let service = service();
        let clone = service.clone();
        clone.increment_active();
        clone.add_count(names::REQUESTS_TOTAL, 3, &[]).unwrap();
        assert_eq!(service.snapshot_active(), 1);
        assert_eq!(service.tracker().active(), 1);
        assert_eq!(service.config().worker_thread_span(), 60);
    }
}
