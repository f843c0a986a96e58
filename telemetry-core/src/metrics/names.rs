//! Names, units and descriptions of the instruments registered by
//! [`MetricsAggregationService`](super::MetricsAggregationService).
//!
//! Dashboards and alerts key on these strings; they must not change.

/// Counter of processed requests.
pub const REQUESTS_TOTAL: &str = "requests_total";
/// Unit of [`REQUESTS_TOTAL`].
pub const REQUESTS_TOTAL_UNIT: &str = "{request}";
/// Description of [`REQUESTS_TOTAL`].
pub const REQUESTS_TOTAL_DESCRIPTION: &str = "Total number of requests processed";

/// Counter of failed requests.
pub const ERRORS_TOTAL: &str = "errors_total";
/// Unit of [`ERRORS_TOTAL`].
pub const ERRORS_TOTAL_UNIT: &str = "{error}";
/// Description of [`ERRORS_TOTAL`].
pub const ERRORS_TOTAL_DESCRIPTION: &str = "Total number of failed requests";

/// Histogram of request handling durations.
pub const REQUEST_DURATION: &str = "request_duration";
/// Unit of [`REQUEST_DURATION`].
pub const REQUEST_DURATION_UNIT: &str = "ms";
/// Description of [`REQUEST_DURATION`].
pub const REQUEST_DURATION_DESCRIPTION: &str = "Duration of request handling";

/// Histogram of work item processing time.
pub const PROCESSING_TIME: &str = "processing_time";
/// Unit of [`PROCESSING_TIME`].
pub const PROCESSING_TIME_UNIT: &str = "ms";
/// Description of [`PROCESSING_TIME`].
pub const PROCESSING_TIME_DESCRIPTION: &str = "Time spent processing work items";

/// Up/down counter of in-flight requests.
pub const ACTIVE_REQUESTS: &str = "active_requests";
/// Unit of [`ACTIVE_REQUESTS`].
pub const ACTIVE_REQUESTS_UNIT: &str = "{request}";
/// Description of [`ACTIVE_REQUESTS`].
pub const ACTIVE_REQUESTS_DESCRIPTION: &str = "Number of requests currently in flight";

/// Up/down counter of queued work items.
pub const QUEUE_DEPTH: &str = "queue_depth";
/// Unit of [`QUEUE_DEPTH`].
pub const QUEUE_DEPTH_UNIT: &str = "{item}";
/// Description of [`QUEUE_DEPTH`].
pub const QUEUE_DEPTH_DESCRIPTION: &str = "Number of work items waiting in the queue";

/// Observable gauge of CPU usage.
pub const CPU_USAGE: &str = "cpu_usage";
/// Unit of [`CPU_USAGE`].
pub const CPU_USAGE_UNIT: &str = "%";
/// Description of [`CPU_USAGE`].
pub const CPU_USAGE_DESCRIPTION: &str = "Sampled CPU usage percentage";

/// Observable up/down counter of the worker pool span.
pub const THREAD_POOL_SIZE: &str = "thread_pool_size";
/// Unit of [`THREAD_POOL_SIZE`].
pub const THREAD_POOL_SIZE_UNIT: &str = "{thread}";
/// Description of [`THREAD_POOL_SIZE`].
pub const THREAD_POOL_SIZE_DESCRIPTION: &str = "Span between maximum and minimum worker threads";
