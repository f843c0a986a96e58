//! Helpers for testing code that depends on this crate.
use crate::RandomSource;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A [`RandomSource`] that replays a fixed sequence of values.
///
/// Values are returned in order and the sequence wraps around once it is
/// exhausted. Clones share the same position and draw count, which lets a test
/// keep a handle for assertions after passing the source by value.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    values: Arc<[f64]>,
    draws: Arc<AtomicUsize>,
}

impl ScriptedRandom {
    /// Creates a source replaying `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or contains a value outside `[0, 1)`.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Arc<[f64]> = values.into_iter().collect();
        assert!(!values.is_empty(), "scripted sequence must not be empty");
        assert!(
            values.iter().all(|v| (0.0..1.0).contains(v)),
            "scripted values must be in [0, 1)"
        );
        ScriptedRandom {
            values,
            draws: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of values handed out so far.
    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        let index = self.draws.fetch_add(1, Ordering::SeqCst);
        self.values[index % self.values.len()]
    }
}
