//! ALSO-X: bisection on the violation budget of the relaxed big-M model.
//!
//! Each step solves the LP relaxation at the midpoint budget `q`, counts how
//! many samples the resulting bid actually fails to cover, and keeps `q` as
//! the new lower end when that count is within `floor(ε·N)`, otherwise as the
//! new upper end. The final bid is re-solved at the lower end, which always
//! passes (`q = 0` yields the robust bid).

use std::time::Duration;

use ccb_core::{BiddingConfig, BudgetScope, ReliabilityTarget, ScenarioSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use web_time::Instant;

use super::bigm::{derive_big_m, BigMModel, BigMSolution, ChanceConstraintFormulator};
use super::types::{realized_violations, BidSchedule, Convergence};
use crate::error::{BiddingError, BiddingResult, SolveStage, SolverFailure};
use crate::lp::LpBackend;

/// Settings of an ALSO-X run.
#[derive(Debug, Clone)]
pub struct AlsoXConfig {
    pub target: ReliabilityTarget,
    /// `None` derives the data range of the selected periods.
    pub big_m: Option<f64>,
    pub delta: f64,
    pub max_iterations: usize,
    pub time_budget: Option<Duration>,
    pub scope: BudgetScope,
    pub violation_tolerance: f64,
}

impl AlsoXConfig {
    pub fn new(target: ReliabilityTarget) -> Self {
        let defaults = BiddingConfig::default();
        Self {
            target,
            big_m: defaults.big_m,
            delta: defaults.delta,
            max_iterations: defaults.max_iterations,
            time_budget: None,
            scope: defaults.budget_scope,
            violation_tolerance: defaults.violation_tolerance,
        }
    }

    /// Take every ALSO-X knob from a run configuration.
    pub fn from_bidding_config(config: &BiddingConfig) -> BiddingResult<Self> {
        Ok(Self {
            target: config.target()?,
            big_m: config.big_m,
            delta: config.delta,
            max_iterations: config.max_iterations,
            time_budget: config.time_budget(),
            scope: config.budget_scope,
            violation_tolerance: config.violation_tolerance,
        })
    }

    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_scope(mut self, scope: BudgetScope) -> Self {
        self.scope = scope;
        self
    }
}

/// One bisection step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BisectionStep {
    pub iteration: usize,
    pub q: Vec<f64>,
    /// Realized violations per budget group.
    pub violations: Vec<usize>,
    /// Whether each group met the target at `q`.
    pub accepted: Vec<bool>,
}

/// Result of an ALSO-X run.
#[derive(Debug, Clone)]
pub struct AlsoXSolution {
    pub bids: BidSchedule,
    /// Budget of the final re-solve (the converged lower end).
    pub q: Vec<f64>,
    pub q_low: Vec<f64>,
    pub q_high: Vec<f64>,
    pub iterations: usize,
    pub convergence: Convergence,
    /// Indicators per budget group.
    pub group_sizes: Vec<usize>,
    /// Realized violations of the final bid, per selected period.
    pub violations: Vec<usize>,
    /// `1 - violations / N_g` of the final bid, per budget group.
    pub reliability: Vec<f64>,
    /// Relaxed indicator values of the final solve, `[period][sample]`.
    pub relaxed_indicators: Vec<Vec<f64>>,
    pub big_m: f64,
    pub trace: Vec<BisectionStep>,
    pub solve_time: Duration,
}

/// Bisection driver over a [`BigMModel`].
pub struct AlsoXSolver<'b> {
    backend: &'b dyn LpBackend,
    config: AlsoXConfig,
}

impl<'b> AlsoXSolver<'b> {
    pub fn new(backend: &'b dyn LpBackend, config: AlsoXConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &AlsoXConfig {
        &self.config
    }

    /// Bid every period of the set.
    pub fn solve_all(&self, scenarios: &ScenarioSet) -> BiddingResult<AlsoXSolution> {
        let periods: Vec<usize> = (0..scenarios.periods()).collect();
        self.solve(scenarios, &periods)
    }

    /// Bid the given periods.
    pub fn solve(&self, scenarios: &ScenarioSet, periods: &[usize]) -> BiddingResult<AlsoXSolution> {
        let cfg = &self.config;
        if !cfg.delta.is_finite() || cfg.delta <= 0.0 {
            return Err(BiddingError::InvalidDelta(cfg.delta));
        }
        let big_m = match cfg.big_m {
            Some(m) => m,
            None => derive_big_m(scenarios, periods),
        };
        let formulator =
            ChanceConstraintFormulator::new(scenarios, periods, big_m)?.with_scope(cfg.scope);
        let mut model = formulator.build();
        model.relax();

        let start = Instant::now();
        let group_sizes = model.group_sizes().to_vec();
        let allowed: Vec<usize> = group_sizes
            .iter()
            .map(|n| cfg.target.violation_budget(*n))
            .collect();
        let mut q_low = vec![0.0; group_sizes.len()];
        let mut q_high: Vec<f64> = group_sizes
            .iter()
            .map(|n| cfg.target.budget_ceiling(*n))
            .collect();

        let mut trace = Vec::new();
        let mut convergence = Convergence::Converged;
        let mut iteration = 0;

        while width(&q_low, &q_high) >= cfg.delta {
            if iteration >= cfg.max_iterations {
                convergence = Convergence::IterationCap;
                break;
            }
            if cfg.time_budget.is_some_and(|t| start.elapsed() >= t) {
                convergence = Convergence::TimeBudget;
                break;
            }
            iteration += 1;

            let q: Vec<f64> = q_low
                .iter()
                .zip(&q_high)
                .map(|(lo, hi)| 0.5 * (lo + hi))
                .collect();
            model.set_budgets(&q)?;
            let solution = model.solve(self.backend).map_err(|e| {
                SolverFailure::new(SolveStage::Bisection, e)
                    .with_bracket(iteration, &q, &q_low, &q_high)
            })?;

            let violations = group_violations(scenarios, &model, &solution, cfg.violation_tolerance);
            let accepted: Vec<bool> = violations
                .iter()
                .zip(&allowed)
                .map(|(v, a)| v <= a)
                .collect();
            for (g, ok) in accepted.iter().enumerate() {
                if *ok {
                    q_low[g] = q[g];
                } else {
                    q_high[g] = q[g];
                }
            }

            debug!(
                iteration,
                ?q,
                ?violations,
                width = width(&q_low, &q_high),
                "ALSO-X bisection step"
            );
            trace.push(BisectionStep {
                iteration,
                q,
                violations,
                accepted,
            });
        }

        if !convergence.is_converged() {
            warn!(
                ?convergence,
                iterations = iteration,
                width = width(&q_low, &q_high),
                "ALSO-X stopped before the bracket closed; using the best feasible budget"
            );
        }

        model.set_budgets(&q_low)?;
        let solution = model.solve(self.backend).map_err(|e| {
            SolverFailure::new(SolveStage::Final, e).with_bracket(iteration, &q_low, &q_low, &q_high)
        })?;

        let violations: Vec<usize> = model
            .periods()
            .iter()
            .zip(&solution.bids)
            .map(|(h, bid)| realized_violations(scenarios, *h, *bid, cfg.violation_tolerance))
            .collect();
        let reliability = group_violations(scenarios, &model, &solution, cfg.violation_tolerance)
            .iter()
            .zip(&group_sizes)
            .map(|(v, n)| 1.0 - *v as f64 / *n as f64)
            .collect();

        let bids = BidSchedule::from_indices(model.periods(), solution.bids)?;
        info!(
            periods = bids.len(),
            iterations = iteration,
            total_bid = bids.total(),
            ?convergence,
            "ALSO-X solved"
        );

        Ok(AlsoXSolution {
            bids,
            q: q_low.clone(),
            q_low,
            q_high,
            iterations: iteration,
            convergence,
            group_sizes,
            violations,
            reliability,
            relaxed_indicators: solution.indicators,
            big_m,
            trace,
            solve_time: start.elapsed(),
        })
    }
}

fn width(q_low: &[f64], q_high: &[f64]) -> f64 {
    q_low
        .iter()
        .zip(q_high)
        .map(|(lo, hi)| hi - lo)
        .fold(0.0, f64::max)
}

/// Realized violations of a solution, summed per budget group.
fn group_violations(
    scenarios: &ScenarioSet,
    model: &BigMModel,
    solution: &BigMSolution,
    tolerance: f64,
) -> Vec<usize> {
    let per_period = model
        .periods()
        .iter()
        .zip(&solution.bids)
        .map(|(h, bid)| realized_violations(scenarios, *h, *bid, tolerance));
    match model.scope() {
        BudgetScope::PerPeriod => per_period.collect(),
        BudgetScope::Shared => vec![per_period.sum()],
    }
}

#[cfg(all(test, feature = "solver-microlp"))]
mod tests {
    use super::*;
    use crate::lp::MicrolpBackend;

    /// One period, 10 distinct samples 100, 110, ..., 190.
    fn ladder() -> ScenarioSet {
        ScenarioSet::from_fn(1, 2, 5, |_, m, w| 100.0 + 10.0 * (m * 5 + w) as f64).unwrap()
    }

    #[test]
    fn test_zero_epsilon_skips_bisection() {
        let set = ladder();
        let config = AlsoXConfig::new(ReliabilityTarget::new(0.0).unwrap());
        let solution = AlsoXSolver::new(&MicrolpBackend, config).solve_all(&set).unwrap();
        assert_eq!(solution.iterations, 0);
        assert!((solution.bids.bids()[0] - 100.0).abs() < 1e-6);
        assert_eq!(solution.violations, vec![0]);
    }

    #[test]
    fn test_bid_meets_target_in_sample() {
        let set = ladder();
        let config = AlsoXConfig::new(ReliabilityTarget::new(0.2).unwrap()).with_delta(1e-4);
        let solution = AlsoXSolver::new(&MicrolpBackend, config).solve_all(&set).unwrap();

        assert!(solution.convergence.is_converged());
        assert!(solution.violations[0] <= 2);
        assert!(solution.reliability[0] >= 0.8);
        // the third sample is reachable with two violations
        let bid = solution.bids.bids()[0];
        assert!(bid > 115.0 && bid <= 120.0 + 1e-6, "bid {bid}");
    }

    #[test]
    fn test_invalid_delta() {
        let set = ladder();
        let config = AlsoXConfig::new(ReliabilityTarget::new(0.2).unwrap()).with_delta(0.0);
        assert_eq!(
            AlsoXSolver::new(&MicrolpBackend, config).solve_all(&set).unwrap_err(),
            BiddingError::InvalidDelta(0.0)
        );
    }

    #[test]
    fn test_iteration_cap_degrades() {
        let set = ladder();
        let config = AlsoXConfig::new(ReliabilityTarget::new(0.2).unwrap())
            .with_delta(1e-6)
            .with_max_iterations(3);
        let solution = AlsoXSolver::new(&MicrolpBackend, config).solve_all(&set).unwrap();
        assert_eq!(solution.convergence, Convergence::IterationCap);
        assert_eq!(solution.iterations, 3);
        assert_eq!(solution.trace.len(), 3);
        assert!(solution.violations[0] <= 2);
    }
}
