//! CVaR surrogate of the chance constraint.
//!
//! The loss of sample `k` is `L_k = bid - s_k`. Requiring `CVaR_ε(L) ≤ 0` is a
//! convex restriction of `P(L > 0) ≤ ε`, so the bid it yields is never above
//! the exact chance-constrained bid. In Rockafellar-Uryasev form, scaled by
//! `ε` so that `ε = 0` stays well defined:
//!
//! ```text
//! max  Σ_h bid[h]
//! s.t. bid[h] - zeta[h,k]                 ≤ s[h,k]
//!      (1/N)·Σ_k zeta[h,k] - (1-ε)·beta[h] ≤ 0
//!      beta[h] - zeta[h,k]                ≤ 0
//!      bid ≥ 0,  beta ≤ 0,  zeta free
//! ```

use std::time::Duration;

use ccb_core::{ReliabilityTarget, ScenarioSet};
use tracing::info;

use super::types::BidSchedule;
use crate::error::{BiddingError, BiddingResult, SolveStage, SolverFailure};
use crate::lp::{LinearModel, LpBackend, ObjectiveSense, RowSense, VarId};

/// Builds and solves the CVaR LP.
#[derive(Debug, Clone, Copy)]
pub struct CvarFormulator {
    target: ReliabilityTarget,
}

/// Built CVaR LP and its variable handles.
#[derive(Debug, Clone)]
pub struct CvarModel {
    model: LinearModel,
    periods: Vec<usize>,
    bids: Vec<VarId>,
    betas: Vec<VarId>,
}

impl CvarModel {
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }
}

/// Result of a CVaR solve.
#[derive(Debug, Clone)]
pub struct CvarSolution {
    pub bids: BidSchedule,
    /// Optimal `beta[h]` (the value-at-risk threshold, never positive).
    pub beta: Vec<f64>,
    /// `CVaR_ε(bid - s)` per period, recomputed from the data.
    pub cvar: Vec<f64>,
    pub solve_time: Duration,
}

impl CvarFormulator {
    pub fn new(target: ReliabilityTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> ReliabilityTarget {
        self.target
    }

    pub fn build(&self, scenarios: &ScenarioSet, periods: &[usize]) -> BiddingResult<CvarModel> {
        if periods.is_empty() {
            return Err(BiddingError::NoPeriods);
        }
        let mut periods = periods.to_vec();
        periods.sort_unstable();
        periods.dedup();
        for &h in &periods {
            scenarios.check_period(h)?;
        }

        let n = scenarios.samples_per_period();
        let inv_n = 1.0 / n as f64;
        let reliability = self.target.reliability();
        let mut model = LinearModel::new("chance-cvar", ObjectiveSense::Maximise);
        let mut bids = Vec::with_capacity(periods.len());
        let mut betas = Vec::with_capacity(periods.len());

        for &h in &periods {
            let bid = model.add_continuous(format!("bid_{h}"), 0.0, f64::INFINITY);
            let beta = model.add_continuous(format!("beta_{h}"), f64::NEG_INFINITY, 0.0);
            model.add_objective_term(bid, 1.0);

            let mut mean_terms = Vec::with_capacity(n + 1);
            for (k, &s) in scenarios.period_samples(h).iter().enumerate() {
                let zeta =
                    model.add_continuous(format!("zeta_{h}_{k}"), f64::NEG_INFINITY, f64::INFINITY);
                model.add_row(
                    format!("loss_{h}_{k}"),
                    vec![(bid, 1.0), (zeta, -1.0)],
                    RowSense::Le,
                    s,
                );
                model.add_row(
                    format!("tail_{h}_{k}"),
                    vec![(beta, 1.0), (zeta, -1.0)],
                    RowSense::Le,
                    0.0,
                );
                mean_terms.push((zeta, inv_n));
            }
            mean_terms.push((beta, -reliability));
            model.add_row(format!("cvar_{h}"), mean_terms, RowSense::Le, 0.0);

            bids.push(bid);
            betas.push(beta);
        }

        Ok(CvarModel {
            model,
            periods,
            bids,
            betas,
        })
    }

    /// Build and solve in one go.
    pub fn solve(
        &self,
        backend: &dyn LpBackend,
        scenarios: &ScenarioSet,
        periods: &[usize],
    ) -> BiddingResult<CvarSolution> {
        let built = self.build(scenarios, periods)?;
        let lp = backend
            .solve(&built.model)
            .map_err(|e| SolverFailure::new(SolveStage::Cvar, e))?;

        let bid_values: Vec<f64> = built.bids.iter().map(|v| lp.value(*v)).collect();
        let beta = built.betas.iter().map(|v| lp.value(*v)).collect();
        let cvar = built
            .periods
            .iter()
            .zip(&bid_values)
            .map(|(&h, &bid)| {
                let losses: Vec<f64> = scenarios
                    .period_samples(h)
                    .iter()
                    .map(|s| bid - s)
                    .collect();
                conditional_value_at_risk(&losses, self.target.epsilon())
            })
            .collect();

        let bids = BidSchedule::from_indices(&built.periods, bid_values)?;
        info!(
            periods = bids.len(),
            total_bid = bids.total(),
            epsilon = self.target.epsilon(),
            "CVaR bids solved"
        );

        Ok(CvarSolution {
            bids,
            beta,
            cvar,
            solve_time: lp.solve_time,
        })
    }

    pub fn solve_all(
        &self,
        backend: &dyn LpBackend,
        scenarios: &ScenarioSet,
    ) -> BiddingResult<CvarSolution> {
        let periods: Vec<usize> = (0..scenarios.periods()).collect();
        self.solve(backend, scenarios, &periods)
    }
}

/// Mean of the worst `ε` share of equally likely losses.
///
/// Fractional tail mass is taken from the boundary loss; `ε = 0` gives the
/// largest loss.
pub fn conditional_value_at_risk(losses: &[f64], epsilon: f64) -> f64 {
    if losses.is_empty() {
        return 0.0;
    }
    let mut sorted = losses.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    if epsilon <= 0.0 {
        return sorted[0];
    }

    let mut mass = epsilon * sorted.len() as f64;
    let tail = mass;
    let mut sum = 0.0;
    for loss in sorted {
        if mass <= 0.0 {
            break;
        }
        let w = mass.min(1.0);
        sum += w * loss;
        mass -= w;
    }
    sum / tail
}
