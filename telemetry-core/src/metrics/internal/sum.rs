use std::sync::Arc;
use std::time::SystemTime;

use crate::metrics::data::{self, SumDataPoint};
use opentelemetry::KeyValue;

use super::{Aggregator, AtomicValue, ValueMap};

struct Increment<V> {
    value: Arc<V>,
}

impl<V: AtomicValue> Aggregator for Increment<V> {
    type InitConfig = ();
    type PreComputedValue = V::Value;

    fn create(_init: &()) -> Self {
        Increment {
            value: Arc::new(V::default()),
        }
    }

    fn update(&self, value: V::Value) {
        self.value.add(value)
    }
}

/// Summarizes a set of measurements made as their arithmetic sum.
pub(crate) struct Sum<V: AtomicValue> {
    value_map: ValueMap<Increment<V>>,
    monotonic: bool,
    start: SystemTime,
}

impl<V: AtomicValue> Sum<V> {
    /// Returns an aggregator that summarizes a set of measurements as their
    /// arithmetic sum.
    ///
    /// Each sum is scoped by attributes.
    pub(crate) fn new(monotonic: bool) -> Self {
        Sum {
            value_map: ValueMap::new(()),
            monotonic,
            start: SystemTime::now(),
        }
    }

    /// Like [`Sum::new`], but the series without attributes accumulates into
    /// `cell`, which the caller may keep updating and reading directly.
    pub(crate) fn with_shared_cell(cell: Arc<V>, monotonic: bool) -> Self {
        Sum {
            value_map: ValueMap::with_no_attribute_tracker(Increment { value: cell }, ()),
            monotonic,
            start: SystemTime::now(),
        }
    }

    pub(crate) fn measure(&self, measurement: V::Value, attrs: &[KeyValue]) {
        self.value_map.measure(measurement, attrs);
    }

    pub(crate) fn cumulative(&self) -> data::Sum<V::Value> {
        let data_points = self
            .value_map
            .collect(|attributes, tracker| SumDataPoint {
                attributes,
                value: tracker.value.get_value(),
            });

        data::Sum {
            data_points,
            start_time: self.start,
            time: SystemTime::now(),
            is_monotonic: self.monotonic,
        }
    }
}
