//! Injectable sources of uniform random values.
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::sync::Mutex;

/// A source of uniformly distributed values in `[0, 1)`.
///
/// Probabilistic decisions draw from a `RandomSource` instead of a hidden
/// global generator so that callers, and tests in particular, control the
/// sequence of values. Implementations must be safe to share between threads;
/// every call to [`next_f64`] is one independent draw.
///
/// [`next_f64`]: RandomSource::next_f64
pub trait RandomSource: Send + Sync {
    /// Returns the next value in `[0, 1)`.
    fn next_f64(&self) -> f64;
}

impl<T: RandomSource + ?Sized> RandomSource for &T {
    fn next_f64(&self) -> f64 {
        (**self).next_f64()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for std::sync::Arc<T> {
    fn next_f64(&self) -> f64 {
        (**self).next_f64()
    }
}

/// Default [`RandomSource`] implementation.
///
/// Each thread owns a small, fast generator seeded from the operating system,
/// so concurrent callers never contend with each other.
#[derive(Clone, Debug, Default)]
pub struct ThreadLocalRandom {
    _private: (),
}

impl RandomSource for ThreadLocalRandom {
    fn next_f64(&self) -> f64 {
        CURRENT_RNG.with(|rng| rng.borrow_mut().random::<f64>())
    }
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

/// A reproducible [`RandomSource`] seeded with a fixed value.
///
/// The generator is shared behind a mutex: concurrent callers are serialized
/// and each receives a whole draw, but the assignment of values to callers
/// then depends on scheduling. Use one instance per thread when the exact
/// sequence matters.
pub struct SeededRandom {
    rng: Mutex<rngs::StdRng>,
}

impl SeededRandom {
    /// Creates a generator that always produces the same sequence for `seed`.
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: Mutex::new(rngs::StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        // A poisoned generator still holds a valid state.
        let mut rng = self.rng.lock().unwrap_or_else(|err| err.into_inner());
        rng.random::<f64>()
    }
}

impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandom").finish_non_exhaustive()
    }
}
