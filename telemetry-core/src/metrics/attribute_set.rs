use std::hash::{Hash, Hasher};

use opentelemetry::KeyValue;

/// A normalised set of tags identifying one time series of an instrument.
///
/// Attributes are sorted by key and duplicate keys keep the value that came
/// last, so the same tags passed in any order map to the same series.
#[derive(Clone, Default, Debug, PartialEq)]
pub(crate) struct AttributeSet(Vec<KeyValue>, u64);

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut vec = values.to_vec();
        // Stable sort keeps equal keys in call order.
        vec.sort_by(|a, b| a.key.cmp(&b.key));

        // we cannot use vec.dedup_by because it will remove last duplicate not first
        if vec.len() > 1 {
            let mut i = vec.len() - 1;
            while i != 0 {
                if vec[i - 1].key == vec[i].key {
                    vec.remove(i - 1);
                }
                i -= 1;
            }
        }

        let hash = calculate_hash(&vec);
        AttributeSet(vec, hash)
    }
}

fn calculate_hash(values: &[KeyValue]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for kv in values {
        kv.key.hash(&mut hasher);
        // Equal values render equally; distinct values that render alike only
        // collide in the hash and are still told apart by `PartialEq`.
        kv.value.as_str().hash(&mut hasher);
    }
    hasher.finish()
}

impl AttributeSet {
    pub(crate) fn as_slice(&self) -> &[KeyValue] {
        &self.0
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.1)
    }
}
