//! Errors raised by the bidding algorithms
//!
//! [`BiddingError`] covers the whole path from configuration to solved bid.
//! Data problems arrive as [`ScenarioError`], backend problems as [`LpError`];
//! a failed solve inside an algorithm is wrapped in a [`SolverFailure`] that
//! records where in the algorithm it happened.

use std::fmt;

use ccb_core::ScenarioError;
use thiserror::Error;

use crate::lp::LpError;

/// Algorithm step in which a solve failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStage {
    /// Relaxed LP inside the ALSO-X bisection loop.
    Bisection,
    /// Relaxed LP at the converged budget.
    Final,
    /// Binary MILP of the independent per-period mode.
    PerPeriod,
    /// LP re-solve with fixed indicators.
    Polish,
    /// CVaR surrogate LP.
    Cvar,
}

impl fmt::Display for SolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStage::Bisection => "bisection",
            SolveStage::Final => "final re-solve",
            SolveStage::PerPeriod => "per-period MILP",
            SolveStage::Polish => "polish re-solve",
            SolveStage::Cvar => "CVaR LP",
        };
        f.write_str(name)
    }
}

/// Context of a failed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverFailure {
    pub stage: SolveStage,
    /// Period of the model, when the model covers a single period.
    pub period: Option<usize>,
    /// Bisection iteration (1-based).
    pub iteration: Option<usize>,
    /// Budget being tried.
    pub q: Option<Vec<f64>>,
    pub q_low: Option<Vec<f64>>,
    pub q_high: Option<Vec<f64>>,
    pub source: LpError,
}

impl SolverFailure {
    pub fn new(stage: SolveStage, source: LpError) -> Self {
        Self {
            stage,
            period: None,
            iteration: None,
            q: None,
            q_low: None,
            q_high: None,
            source,
        }
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = Some(period);
        self
    }

    /// Attach the bisection state.
    pub fn with_bracket(mut self, iteration: usize, q: &[f64], q_low: &[f64], q_high: &[f64]) -> Self {
        self.iteration = Some(iteration);
        self.q = Some(q.to_vec());
        self.q_low = Some(q_low.to_vec());
        self.q_high = Some(q_high.to_vec());
        self
    }
}

impl fmt::Display for SolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.stage)?;
        if let Some(period) = self.period {
            write!(f, " for period {}", period)?;
        }
        if let Some(iteration) = self.iteration {
            write!(f, " at iteration {}", iteration)?;
        }
        if let (Some(q), Some(lo), Some(hi)) = (&self.q, &self.q_low, &self.q_high) {
            write!(f, " (q={:?}, q_low={:?}, q_high={:?})", q, lo, hi)?;
        }
        write!(f, ": {}", self.source)
    }
}

/// Errors raised by the bidding algorithms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BiddingError {
    /// Invalid scenario data, partition or target.
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// Big-M is not a positive finite number.
    #[error("Big-M must be positive and finite, got {0}")]
    InvalidBigM(f64),

    /// Big-M cannot deactivate the widest bid/capacity gap.
    #[error("Big-M {big_m} is below the data range {required}")]
    BigMTooSmall { big_m: f64, required: f64 },

    /// Bisection tolerance is not a positive finite number.
    #[error("Delta must be positive and finite, got {0}")]
    InvalidDelta(f64),

    /// Budget vector length does not match the model's budget rows.
    #[error("Expected {expected} budget values, got {found}")]
    BudgetShape { expected: usize, found: usize },

    /// A budget value is negative or non-finite.
    #[error("Violation budget must be non-negative and finite, got {0}")]
    InvalidBudget(f64),

    /// The scenario pass share is outside `[0, 1]`.
    #[error("Scenario pass share must lie in [0, 1], got {0}")]
    InvalidPassShare(f64),

    /// An exact MILP was requested from a continuous-only backend.
    #[error("Backend '{backend}' cannot solve the binary model")]
    IntegerUnsupported { backend: &'static str },

    /// No period was selected.
    #[error("No periods selected")]
    NoPeriods,

    /// The bid does not cover the scenario set's periods.
    #[error("Bid has {found} periods, scenario set has {expected}")]
    BidShape { expected: usize, found: usize },

    /// A solve failed inside an algorithm.
    #[error("Solver failure: {0}")]
    Solver(Box<SolverFailure>),

    /// A backend could not be created or failed outside an algorithm.
    #[error("LP error: {0}")]
    Lp(#[from] LpError),
}

/// Convenience type alias for Results using BiddingError.
pub type BiddingResult<T> = Result<T, BiddingError>;

impl From<SolverFailure> for BiddingError {
    fn from(failure: SolverFailure) -> Self {
        BiddingError::Solver(Box::new(failure))
    }
}
