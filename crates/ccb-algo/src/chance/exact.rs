//! Independent per-period binary solves.
//!
//! Every period gets its own small big-M MILP with the integer budget
//! `floor(ε·|M|·|W|)`. No bisection is involved, so periods are solved in
//! parallel when the `desktop` feature is on.

use std::time::Duration;

use ccb_core::{BiddingConfig, ReliabilityTarget, ScenarioSet};
#[cfg(feature = "desktop")]
use rayon::prelude::*;
use tracing::{info, warn};
use web_time::Instant;

use super::bigm::{derive_big_m, ChanceConstraintFormulator};
use super::types::{is_violated, sample_coords, BidSchedule, NumericalWarning};
use crate::error::{BiddingError, BiddingResult, SolveStage, SolverFailure};
use crate::lp::LpBackend;

/// Exact single-period chance-constrained bids.
pub struct PerPeriodSolver<'b> {
    backend: &'b dyn LpBackend,
    target: ReliabilityTarget,
    big_m: Option<f64>,
    tolerance: f64,
}

/// Bid of one period.
#[derive(Debug, Clone)]
pub struct PeriodBid {
    pub period: usize,
    pub bid: f64,
    /// Integer budget the period was solved with.
    pub budget: usize,
    /// Realized indicators of `bid` (`bid - s > tol`), `(m, w)` order.
    pub indicators: Vec<bool>,
    /// Realized violations of `bid`.
    pub violations: usize,
    pub warnings: Vec<NumericalWarning>,
}

/// Result over all requested periods, ordered by period.
#[derive(Debug, Clone)]
pub struct ExactSolution {
    pub bids: BidSchedule,
    pub periods: Vec<PeriodBid>,
    pub solve_time: Duration,
}

impl ExactSolution {
    pub fn warnings(&self) -> impl Iterator<Item = &NumericalWarning> {
        self.periods.iter().flat_map(|p| p.warnings.iter())
    }
}

impl<'b> PerPeriodSolver<'b> {
    pub fn new(backend: &'b dyn LpBackend, target: ReliabilityTarget) -> Self {
        Self {
            backend,
            target,
            big_m: None,
            tolerance: BiddingConfig::default().violation_tolerance,
        }
    }

    pub fn from_bidding_config(
        backend: &'b dyn LpBackend,
        config: &BiddingConfig,
    ) -> BiddingResult<Self> {
        Ok(Self {
            backend,
            target: config.target()?,
            big_m: config.big_m,
            tolerance: config.violation_tolerance,
        })
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Solve every period of the set.
    pub fn solve_all(&self, scenarios: &ScenarioSet) -> BiddingResult<ExactSolution> {
        let periods: Vec<usize> = (0..scenarios.periods()).collect();
        self.solve(scenarios, &periods)
    }

    /// Solve the given periods at the integer budget of the target.
    pub fn solve(&self, scenarios: &ScenarioSet, periods: &[usize]) -> BiddingResult<ExactSolution> {
        if !self.backend.supports_integers() {
            return Err(BiddingError::IntegerUnsupported {
                backend: self.backend.id(),
            });
        }
        if periods.is_empty() {
            return Err(BiddingError::NoPeriods);
        }
        let mut periods = periods.to_vec();
        periods.sort_unstable();
        periods.dedup();

        let start = Instant::now();
        let budget = self.target.violation_budget(scenarios.samples_per_period());

        #[cfg(feature = "desktop")]
        let results: BiddingResult<Vec<PeriodBid>> = periods
            .par_iter()
            .map(|&h| self.solve_with_budget(scenarios, h, budget))
            .collect();
        #[cfg(not(feature = "desktop"))]
        let results: BiddingResult<Vec<PeriodBid>> = periods
            .iter()
            .map(|&h| self.solve_with_budget(scenarios, h, budget))
            .collect();
        let per_period = results?;

        let bids = BidSchedule::from_indices(
            &periods,
            per_period.iter().map(|p| p.bid).collect(),
        )?;
        info!(
            periods = bids.len(),
            budget,
            total_bid = bids.total(),
            "per-period chance-constrained bids solved"
        );

        Ok(ExactSolution {
            bids,
            periods: per_period,
            solve_time: start.elapsed(),
        })
    }

    /// Solve one period at an explicit integer violation budget.
    ///
    /// The binary solve is followed by a polish step: indicators are rounded
    /// (at most `budget` of them set), fixed, and the LP re-solved so the bid
    /// is exactly the smallest sample left unflagged.
    pub fn solve_with_budget(
        &self,
        scenarios: &ScenarioSet,
        period: usize,
        budget: usize,
    ) -> BiddingResult<PeriodBid> {
        if !self.backend.supports_integers() {
            return Err(BiddingError::IntegerUnsupported {
                backend: self.backend.id(),
            });
        }
        scenarios.check_period(period)?;
        let big_m = match self.big_m {
            Some(m) => m,
            None => derive_big_m(scenarios, &[period]),
        };
        let mut model = ChanceConstraintFormulator::new(scenarios, &[period], big_m)?.build();
        model.set_budgets(&[budget as f64])?;

        let milp = model
            .solve(self.backend)
            .map_err(|e| SolverFailure::new(SolveStage::PerPeriod, e).with_period(period))?;

        let values = &milp.indicators[0];
        let mut warnings = Vec::new();
        for (k, v) in values.iter().enumerate() {
            if v.min(1.0 - v).abs() > self.tolerance {
                let (m, w) = sample_coords(scenarios, k);
                warnings.push(NumericalWarning::FractionalIndicator {
                    period,
                    sub_period: m,
                    scenario: scenarios.scenario_id(w),
                    value: *v,
                });
            }
        }

        let rounded = round_indicators(values, budget);
        model.fix_indicators(std::slice::from_ref(&rounded));
        let polished = model
            .solve(self.backend)
            .map_err(|e| SolverFailure::new(SolveStage::Polish, e).with_period(period))?;
        let bid = polished.bids[0];

        // spare budget spent on covered samples is dropped
        let indicators: Vec<bool> = scenarios
            .period_samples(period)
            .iter()
            .map(|s| is_violated(bid, *s, self.tolerance))
            .collect();
        let violations = indicators.iter().filter(|v| **v).count();
        for (k, s) in scenarios.period_samples(period).iter().enumerate() {
            if indicators[k] && !rounded[k] {
                let (m, w) = sample_coords(scenarios, k);
                warnings.push(NumericalWarning::UnlinkedViolation {
                    period,
                    sub_period: m,
                    scenario: scenarios.scenario_id(w),
                    gap: bid - s,
                });
            }
        }

        if !warnings.is_empty() {
            warn!(
                period,
                count = warnings.len(),
                "numerical warnings in per-period binary solve"
            );
        }

        Ok(PeriodBid {
            period,
            bid,
            budget,
            indicators,
            violations,
            warnings,
        })
    }
}

/// Indicators above one half, largest first, at most `budget` of them.
fn round_indicators(values: &[f64], budget: usize) -> Vec<bool> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&k| values[k] > 0.5).collect();
    order.sort_by(|a, b| values[*b].total_cmp(&values[*a]));
    let mut flags = vec![false; values.len()];
    for k in order.into_iter().take(budget) {
        flags[k] = true;
    }
    flags
}
