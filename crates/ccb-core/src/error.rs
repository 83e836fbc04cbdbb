//! Error types for scenario data and reliability targets
//!
//! Everything here is raised while the inputs are being assembled, before any
//! optimization model exists. A [`ScenarioError`] always means the caller handed
//! over data or settings that cannot produce a defensible bid.

use thiserror::Error;

use crate::ScenarioId;

/// Errors raised while building or slicing scenario data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// One of the period / sub-period / scenario axes has length zero.
    #[error("Scenario set has no {axis}")]
    EmptyAxis { axis: &'static str },

    /// `periods * sub_periods * scenarios` does not fit in `usize`.
    #[error("Scenario table of {periods} x {sub_periods} x {scenarios} overflows the address space")]
    AxisOverflow {
        periods: usize,
        sub_periods: usize,
        scenarios: usize,
    },

    /// A trace is shorter or longer than `periods * sub_periods`.
    #[error("Scenario {scenario:?} has {found} values, expected {expected}")]
    TraceLength {
        scenario: ScenarioId,
        expected: usize,
        found: usize,
    },

    /// A value is NaN or infinite.
    #[error("Non-finite capacity {value} at period {period}, sub-period {sub_period}, scenario {scenario:?}")]
    NonFinite {
        period: usize,
        sub_period: usize,
        scenario: ScenarioId,
        value: f64,
    },

    /// A value is negative.
    #[error("Negative capacity {value} at period {period}, sub-period {sub_period}, scenario {scenario:?}")]
    Negative {
        period: usize,
        sub_period: usize,
        scenario: ScenarioId,
        value: f64,
    },

    /// The same scenario id was listed twice.
    #[error("Duplicate scenario {0:?}")]
    DuplicateScenario(ScenarioId),

    /// A scenario id is not part of the set.
    #[error("Unknown scenario {0:?}")]
    UnknownScenario(ScenarioId),

    /// A period index is out of range.
    #[error("Period {period} out of range (set has {periods} periods)")]
    PeriodOutOfRange { period: usize, periods: usize },

    /// In-sample and out-of-sample sets share scenarios.
    #[error("In-sample and out-of-sample scenarios overlap: {overlap:?}")]
    OverlappingPartition { overlap: Vec<ScenarioId> },

    /// One side of a partition is empty.
    #[error("The {side} side of the scenario partition is empty")]
    EmptyPartition { side: &'static str },

    /// Target violation probability outside `[0, 1]`.
    #[error("Epsilon must lie in [0, 1], got {0}")]
    InvalidEpsilon(f64),
}

/// Convenience alias for results carrying a [`ScenarioError`].
pub type ScenarioResult<T> = Result<T, ScenarioError>;
