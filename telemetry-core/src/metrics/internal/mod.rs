mod histogram;
mod sum;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use opentelemetry::KeyValue;

use super::attribute_set::AttributeSet;

pub(crate) use histogram::{validate_bucket_boundaries, Histogram};
pub(crate) use sum::Sum;

/// Marks a type that can have a value added and retrieved atomically. Required since
/// different types have different backing atomic mechanisms
pub(crate) trait AtomicValue: Default + Sync + Send + 'static {
    type Value: Copy;

    fn add(&self, value: Self::Value);
    fn get_value(&self) -> Self::Value;
}

// Wraps around on overflow, like `fetch_add`. A counter incremented by one a
// billion times per second takes centuries to get there.
impl AtomicValue for AtomicU64 {
    type Value = u64;

    fn add(&self, value: u64) {
        self.fetch_add(value, Ordering::Relaxed);
    }

    fn get_value(&self) -> u64 {
        self.load(Ordering::Relaxed)
    }
}

// Up/down counters double as the raw state behind snapshot reads, so they use
// sequentially consistent operations.
impl AtomicValue for AtomicI64 {
    type Value = i64;

    fn add(&self, value: i64) {
        self.fetch_add(value, Ordering::SeqCst);
    }

    fn get_value(&self) -> i64 {
        self.load(Ordering::SeqCst)
    }
}

/// Per-series state of an aggregation.
pub(crate) trait Aggregator: Send + Sync + 'static {
    /// Configuration shared by every series of one instrument.
    type InitConfig: Send + Sync;

    /// What a single measurement looks like once prepared by the instrument.
    type PreComputedValue;

    /// Called everytime a new attribute-set is stored.
    fn create(init: &Self::InitConfig) -> Self;

    /// Called for each measurement.
    fn update(&self, value: Self::PreComputedValue);
}

/// The storage for sums and histograms.
///
/// The series without attributes is kept outside the map so the most common
/// call shape never hashes.
pub(crate) struct ValueMap<A: Aggregator> {
    /// Trackers store the values associated with different attribute sets.
    trackers: RwLock<HashMap<AttributeSet, Arc<A>>>,
    /// Tracker for values with no attributes attached.
    no_attribute_tracker: A,
    /// Configuration for an Aggregator
    config: A::InitConfig,
}

impl<A: Aggregator> ValueMap<A> {
    pub(crate) fn new(config: A::InitConfig) -> Self {
        let no_attribute_tracker = A::create(&config);
        Self::with_no_attribute_tracker(no_attribute_tracker, config)
    }

    /// Uses `tracker` for the series without attributes. Lets the owner of
    /// `tracker` observe that series without going through the map.
    pub(crate) fn with_no_attribute_tracker(tracker: A, config: A::InitConfig) -> Self {
        ValueMap {
            trackers: RwLock::new(HashMap::new()),
            no_attribute_tracker: tracker,
            config,
        }
    }

    pub(crate) fn measure(&self, value: A::PreComputedValue, attributes: &[KeyValue]) {
        if attributes.is_empty() {
            self.no_attribute_tracker.update(value);
            return;
        }

        let attributes = AttributeSet::from(attributes);

        // The lock is only poisoned if a thread panicked while holding it,
        // which leaves the map itself intact; keep recording.
        {
            let trackers = self.trackers.read().unwrap_or_else(|err| err.into_inner());
            if let Some(tracker) = trackers.get(&attributes) {
                tracker.update(value);
                return;
            }
        }

        let mut trackers = self.trackers.write().unwrap_or_else(|err| err.into_inner());
        // Recheck, another thread may have inserted the series in the meantime.
        let tracker = trackers
            .entry(attributes)
            .or_insert_with(|| Arc::new(A::create(&self.config)));
        tracker.update(value);
    }

    /// Visits every series, the one without attributes first.
    pub(crate) fn collect<T>(&self, mut f: impl FnMut(Vec<KeyValue>, &A) -> T) -> Vec<T> {
        let trackers = self.trackers.read().unwrap_or_else(|err| err.into_inner());
        let mut out = Vec::with_capacity(trackers.len() + 1);
        out.push(f(vec![], &self.no_attribute_tracker));
        for (attributes, tracker) in trackers.iter() {
            out.push(f(attributes.as_slice().to_vec(), &**tracker));
        }
        out
    }
}
