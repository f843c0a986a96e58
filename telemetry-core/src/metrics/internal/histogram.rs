use std::sync::Mutex;
use std::time::SystemTime;

use crate::metrics::data::{self, HistogramDataPoint};
use opentelemetry::KeyValue;

use super::{Aggregator, ValueMap};

struct HistogramTracker {
    buckets: Mutex<Buckets>,
}

impl Aggregator for HistogramTracker {
    type InitConfig = usize;
    /// Value and bucket index
    type PreComputedValue = (f64, usize);

    fn update(&self, (value, index): (f64, usize)) {
        // Bucket state stays consistent even if a holder panicked.
        let mut buckets = self.buckets.lock().unwrap_or_else(|err| err.into_inner());

        buckets.bin(index, value);
        buckets.sum(value);
    }

    fn create(count: &usize) -> Self {
        HistogramTracker {
            buckets: Mutex::new(Buckets::new(*count)),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Buckets {
    counts: Vec<u64>,
    count: u64,
    total: f64,
    min: f64,
    max: f64,
}

impl Buckets {
    /// returns buckets with `n` bins.
    fn new(n: usize) -> Buckets {
        Buckets {
            counts: vec![0; n],
            min: f64::MAX,
            max: f64::MIN,
            ..Default::default()
        }
    }

    fn sum(&mut self, value: f64) {
        self.total += value;
    }

    fn bin(&mut self, idx: usize, value: f64) {
        self.counts[idx] += 1;
        self.count += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value
        }
    }
}

/// Summarizes a set of measurements as a histogram with explicitly defined
/// buckets.
pub(crate) struct Histogram {
    value_map: ValueMap<HistogramTracker>,
    bounds: Vec<f64>,
    start: SystemTime,
}

impl Histogram {
    /// `boundaries` must already be validated: finite, sorted and free of
    /// duplicates.
    pub(crate) fn new(boundaries: Vec<f64>) -> Self {
        let buckets_count = boundaries.len() + 1;
        Histogram {
            value_map: ValueMap::new(buckets_count),
            bounds: boundaries,
            start: SystemTime::now(),
        }
    }

    pub(crate) fn measure(&self, measurement: f64, attrs: &[KeyValue]) {
        // This search will return an index in the range `[0, bounds.len()]`, where
        // it will return `bounds.len()` if value is greater than the last element
        // of `bounds`. This aligns with the buckets in that the length of buckets
        // is `bounds.len()+1`, with the last bucket representing:
        // `(bounds[bounds.len()-1], +∞)`.
        let index = self.bounds.partition_point(|&x| x < measurement);

        self.value_map.measure((measurement, index), attrs);
    }

    pub(crate) fn cumulative(&self) -> data::Histogram<f64> {
        let data_points = self.value_map.collect(|attributes, tracker| {
            let b = tracker
                .buckets
                .lock()
                .unwrap_or_else(|err| err.into_inner())
                .clone();
            HistogramDataPoint {
                attributes,
                count: b.count,
                bounds: self.bounds.clone(),
                bucket_counts: b.counts,
                min: (b.count > 0).then_some(b.min),
                max: (b.count > 0).then_some(b.max),
                sum: b.total,
            }
        });

        data::Histogram {
            data_points,
            start_time: self.start,
            time: SystemTime::now(),
        }
    }
}

pub(crate) fn validate_bucket_boundaries(boundaries: &[f64]) -> Result<(), &'static str> {
    // Validate boundaries do not contain f64::NAN, f64::INFINITY, or f64::NEG_INFINITY
    if boundaries.iter().any(|b| b.is_nan() || b.is_infinite()) {
        return Err("Bucket boundaries must not contain NaN, Infinity, or -Infinity");
    }

    // validate that buckets are sorted and non-duplicate
    if boundaries.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err("Bucket boundaries must be sorted and not contain any duplicates");
    }

    Ok(())
}
