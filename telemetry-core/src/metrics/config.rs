//! Metrics service configuration
//!
//! Values backing the observable instruments. Worker-thread bounds are
//! external configuration of the hosting process; the service only reports
//! them.
use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

const DEFAULT_MAX_WORKER_THREADS: u32 = 32767;
const DEFAULT_CPU_USAGE_MIN: f64 = 10.0;
const DEFAULT_CPU_USAGE_MAX: f64 = 90.0;

const MIN_WORKER_THREADS_ENV: &str = "TELEMETRY_MIN_WORKER_THREADS";
const MAX_WORKER_THREADS_ENV: &str = "TELEMETRY_MAX_WORKER_THREADS";

/// Configuration for a [`MetricsAggregationService`].
///
/// [`MetricsAggregationService`]: crate::metrics::MetricsAggregationService
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct MetricsConfig {
    /// Lower bound of the worker thread pool.
    pub min_worker_threads: u32,
    /// Upper bound of the worker thread pool.
    pub max_worker_threads: u32,
    /// Range the synthetic CPU usage reading is drawn from, in percent.
    pub cpu_usage_range: RangeInclusive<f64>,
}

impl Default for MetricsConfig {
    /// Create the default configuration, applying environment overrides.
    fn default() -> Self {
        let mut config = MetricsConfig {
            min_worker_threads: u32::try_from(num_cpus::get()).unwrap_or(u32::MAX),
            max_worker_threads: DEFAULT_MAX_WORKER_THREADS,
            cpu_usage_range: DEFAULT_CPU_USAGE_MIN..=DEFAULT_CPU_USAGE_MAX,
        };

        if let Some(min) = threads_from_env(MIN_WORKER_THREADS_ENV) {
            config.min_worker_threads = min;
        }
        if let Some(max) = threads_from_env(MAX_WORKER_THREADS_ENV) {
            config.max_worker_threads = max;
        }

        config.normalized()
    }
}

impl MetricsConfig {
    /// Set the lower bound of the worker thread pool.
    ///
    /// Bounds are not reordered here, so the setters may be called in any
    /// order; a reversed pair is swapped when the service is created.
    pub fn with_min_worker_threads(mut self, min: u32) -> Self {
        self.min_worker_threads = min;
        self
    }

    /// Set the upper bound of the worker thread pool.
    pub fn with_max_worker_threads(mut self, max: u32) -> Self {
        self.max_worker_threads = max;
        self
    }

    /// Set the range of the synthetic CPU usage reading.
    ///
    /// Bounds are clamped into `[0, 100]` and swapped if reversed.
    pub fn with_cpu_usage_range(mut self, range: RangeInclusive<f64>) -> Self {
        let (start, end) = range.into_inner();
        let start = clamp_percent(start);
        let end = clamp_percent(end);
        self.cpu_usage_range = if start <= end {
            start..=end
        } else {
            end..=start
        };
        self
    }

    /// Span between the upper and lower bound of the worker thread pool.
    /// Never negative, whichever way round the bounds were set.
    pub fn worker_thread_span(&self) -> i64 {
        (i64::from(self.max_worker_threads) - i64::from(self.min_worker_threads)).abs()
    }

    pub(crate) fn normalized(mut self) -> Self {
        if self.min_worker_threads > self.max_worker_threads {
            core_warn!(
                name: "MetricsConfig.WorkerThreadsSwapped",
                message = "Minimum worker threads exceed the maximum. Swapping the two bounds",
                min_worker_threads = self.min_worker_threads,
                max_worker_threads = self.max_worker_threads
            );
            std::mem::swap(&mut self.min_worker_threads, &mut self.max_worker_threads);
        }
        self
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn threads_from_env(key: &'static str) -> Option<u32> {
    let raw = env::var(key).ok()?;
    match u32::from_str(raw.trim()) {
        Ok(threads) => Some(threads),
        Err(_) => {
            core_warn!(
                name: "MetricsConfig.InvalidWorkerThreads",
                message = "Worker thread bound must be a non-negative integer. Falling back to the default",
                variable = key,
                value = raw.as_str()
            );
            None
        }
    }
}
