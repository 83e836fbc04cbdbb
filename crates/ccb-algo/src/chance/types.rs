//! Shared result types for the chance-constrained bidding algorithms.

use ccb_core::{PeriodId, ScenarioId, ScenarioSet};
use serde::{Deserialize, Serialize};

use crate::error::{BiddingError, BiddingResult};

/// One capacity bid per period.
///
/// Periods are listed in ascending order; the schedule is immutable once a
/// solve has produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidSchedule {
    periods: Vec<PeriodId>,
    bids: Vec<f64>,
}

impl BidSchedule {
    /// Pair `periods[i]` with `bids[i]`.
    pub fn new(periods: Vec<PeriodId>, bids: Vec<f64>) -> BiddingResult<Self> {
        if periods.len() != bids.len() {
            return Err(BiddingError::BidShape {
                expected: periods.len(),
                found: bids.len(),
            });
        }
        if periods.is_empty() {
            return Err(BiddingError::NoPeriods);
        }
        Ok(Self { periods, bids })
    }

    /// Bids for periods `0..bids.len()`.
    pub fn from_dense(bids: Vec<f64>) -> BiddingResult<Self> {
        let periods = (0..bids.len()).map(PeriodId::new).collect();
        Self::new(periods, bids)
    }

    pub(crate) fn from_indices(periods: &[usize], bids: Vec<f64>) -> BiddingResult<Self> {
        Self::new(periods.iter().copied().map(PeriodId::new).collect(), bids)
    }

    /// Bid of a period, if the schedule covers it.
    pub fn get(&self, period: PeriodId) -> Option<f64> {
        self.periods
            .iter()
            .position(|p| *p == period)
            .map(|i| self.bids[i])
    }

    pub fn periods(&self) -> &[PeriodId] {
        &self.periods
    }

    pub fn bids(&self) -> &[f64] {
        &self.bids
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeriodId, f64)> + '_ {
        self.periods.iter().copied().zip(self.bids.iter().copied())
    }

    /// Sum of all bids (the optimization objective).
    pub fn total(&self) -> f64 {
        self.bids.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}

/// How a bisection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Convergence {
    /// Bracket narrower than `delta` in every budget group.
    Converged,
    /// Stopped by the iteration cap; the bracket is still valid.
    IterationCap,
    /// Stopped by the wall-clock budget; the bracket is still valid.
    TimeBudget,
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged)
    }
}

/// Numerical oddities noticed while reading back a binary solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericalWarning {
    /// An indicator of the binary solve was not within tolerance of 0 or 1.
    FractionalIndicator {
        period: usize,
        sub_period: usize,
        scenario: ScenarioId,
        value: f64,
    },
    /// A sample is violated by the bid while its indicator is 0.
    UnlinkedViolation {
        period: usize,
        sub_period: usize,
        scenario: ScenarioId,
        gap: f64,
    },
}

/// Whether `bid` counts as violated against `capacity`.
#[inline]
pub fn is_violated(bid: f64, capacity: f64, tolerance: f64) -> bool {
    bid - capacity > tolerance
}

/// Number of samples of period `h` the bid is not covered by.
pub fn realized_violations(scenarios: &ScenarioSet, h: usize, bid: f64, tolerance: f64) -> usize {
    scenarios
        .period_samples(h)
        .iter()
        .filter(|&&s| is_violated(bid, s, tolerance))
        .count()
}

/// Split a period-local sample index into `(sub_period, scenario column)`.
#[inline]
pub(crate) fn sample_coords(scenarios: &ScenarioSet, sample: usize) -> (usize, usize) {
    let n_scen = scenarios.scenario_count();
    (sample / n_scen, sample % n_scen)
}
