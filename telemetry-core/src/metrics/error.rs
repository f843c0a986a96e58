use std::borrow::Cow;
use std::result;
use thiserror::Error;

use super::InstrumentKind;

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = result::Result<T, MetricError>;

/// Errors returned by the metrics API.
///
/// Every variant is a violation of the registration-time contract between the
/// service and its callers. None of them is expected at runtime and none is
/// retried; they surface so a broken call site is noticed instead of silently
/// corrupting the aggregates.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MetricError {
    /// No instrument with this name was registered.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(Cow<'static, str>),
    /// A counter was asked to move backwards.
    #[error("invalid delta {delta} for counter {name}: counters only accept non-negative increments")]
    InvalidDelta {
        /// Name of the counter.
        name: Cow<'static, str>,
        /// The rejected delta.
        delta: i64,
    },
    /// The instrument exists but is of a different kind than the operation
    /// requires, e.g. a histogram used as a counter.
    #[error("instrument {name} is a {actual:?}, expected a {expected:?}")]
    InstrumentKindMismatch {
        /// Name of the instrument.
        name: Cow<'static, str>,
        /// Kind the operation requires.
        expected: InstrumentKind,
        /// Kind the instrument was registered with.
        actual: InstrumentKind,
    },
    /// The instrument mirrors a tracker count and only has an untagged
    /// series, so the measurement carried tags.
    #[error("instrument {0} is backed by the active-operation tracker and does not accept tags")]
    AttributesNotSupported(Cow<'static, str>),
    /// An instrument with this name is already registered.
    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(Cow<'static, str>),
    /// Invalid instrument configuration such as an invalid instrument name or
    /// unit.
    #[error("Invalid instrument configuration: {0}")]
    InvalidInstrumentConfiguration(&'static str),
}
