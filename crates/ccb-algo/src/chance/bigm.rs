//! Big-M formulation of the sampled chance constraint.

use ccb_core::{BudgetScope, ScenarioSet};

use crate::error::{BiddingError, BiddingResult};
use crate::lp::{
    LinearModel, LpBackend, LpError, LpSolution, ObjectiveSense, RowId, RowSense, VarId,
};

/// Smallest sound big-M for the given periods: the widest within-period spread.
///
/// Falls back to `1.0` when every selected period is constant.
pub fn derive_big_m(scenarios: &ScenarioSet, periods: &[usize]) -> f64 {
    let range = scenarios.value_range(periods);
    if range > 0.0 {
        range
    } else {
        1.0
    }
}

/// Builds [`BigMModel`]s for a set of periods.
#[derive(Debug, Clone)]
pub struct ChanceConstraintFormulator<'a> {
    scenarios: &'a ScenarioSet,
    periods: Vec<usize>,
    big_m: f64,
    scope: BudgetScope,
}

impl<'a> ChanceConstraintFormulator<'a> {
    /// Validate the inputs for a model over `periods` (sorted, deduplicated).
    ///
    /// `big_m` must be positive, finite and at least the largest `max - min`
    /// spread of the selected periods.
    pub fn new(scenarios: &'a ScenarioSet, periods: &[usize], big_m: f64) -> BiddingResult<Self> {
        if periods.is_empty() {
            return Err(BiddingError::NoPeriods);
        }
        let mut periods = periods.to_vec();
        periods.sort_unstable();
        periods.dedup();
        for &h in &periods {
            scenarios.check_period(h)?;
        }

        if !big_m.is_finite() || big_m <= 0.0 {
            return Err(BiddingError::InvalidBigM(big_m));
        }
        let required = scenarios.value_range(&periods);
        if big_m < required {
            return Err(BiddingError::BigMTooSmall { big_m, required });
        }

        Ok(Self {
            scenarios,
            periods,
            big_m,
            scope: BudgetScope::PerPeriod,
        })
    }

    /// Formulator over every period of the set.
    pub fn all_periods(scenarios: &'a ScenarioSet, big_m: f64) -> BiddingResult<Self> {
        let periods: Vec<usize> = (0..scenarios.periods()).collect();
        Self::new(scenarios, &periods, big_m)
    }

    pub fn with_scope(mut self, scope: BudgetScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    pub fn big_m(&self) -> f64 {
        self.big_m
    }

    /// Build the mixed-binary model with every budget at zero.
    ///
    /// ```text
    /// max  Σ_h bid[h]
    /// s.t. bid[h] - M·z[h,m,w] ≤ s[h,m,w]
    ///      Σ_{m,w} z[h,m,w] ≤ q[h]      (PerPeriod)
    ///      Σ_{h,m,w} z[h,m,w] ≤ q        (Shared)
    ///      bid ≥ 0, z ∈ {0,1}
    /// ```
    pub fn build(&self) -> BigMModel {
        let set = self.scenarios;
        let n = set.samples_per_period();
        let mut model = LinearModel::new("chance-bigm", ObjectiveSense::Maximise);

        let mut bids = Vec::with_capacity(self.periods.len());
        let mut indicators = Vec::with_capacity(self.periods.len());
        for &h in &self.periods {
            let bid = model.add_continuous(format!("bid_{h}"), 0.0, f64::INFINITY);
            model.add_objective_term(bid, 1.0);

            let z: Vec<VarId> = (0..n)
                .map(|k| model.add_binary(format!("z_{h}_{k}")))
                .collect();
            for (k, (&zk, &s)) in z.iter().zip(set.period_samples(h)).enumerate() {
                model.add_row(
                    format!("link_{h}_{k}"),
                    vec![(bid, 1.0), (zk, -self.big_m)],
                    RowSense::Le,
                    s,
                );
            }
            bids.push(bid);
            indicators.push(z);
        }

        let (budget_rows, group_sizes) = match self.scope {
            BudgetScope::PerPeriod => {
                let rows = self
                    .periods
                    .iter()
                    .zip(&indicators)
                    .map(|(h, z)| {
                        model.add_row(
                            format!("budget_{h}"),
                            z.iter().map(|v| (*v, 1.0)).collect(),
                            RowSense::Le,
                            0.0,
                        )
                    })
                    .collect();
                (rows, vec![n; self.periods.len()])
            }
            BudgetScope::Shared => {
                let terms = indicators.iter().flatten().map(|v| (*v, 1.0)).collect();
                let row = model.add_row("budget_shared", terms, RowSense::Le, 0.0);
                (vec![row], vec![n * self.periods.len()])
            }
        };

        BigMModel {
            model,
            periods: self.periods.clone(),
            scope: self.scope,
            bids,
            indicators,
            budget_rows,
            group_sizes,
        }
    }
}

/// A built big-M model whose budgets can be changed between solves.
#[derive(Debug, Clone)]
pub struct BigMModel {
    model: LinearModel,
    periods: Vec<usize>,
    scope: BudgetScope,
    bids: Vec<VarId>,
    indicators: Vec<Vec<VarId>>,
    budget_rows: Vec<RowId>,
    group_sizes: Vec<usize>,
}

/// Values read back from a [`BigMModel`] solve.
#[derive(Debug, Clone)]
pub struct BigMSolution {
    /// Bid per selected period.
    pub bids: Vec<f64>,
    /// Indicator values, `[period][sample]` with samples ordered `(m, w)`.
    pub indicators: Vec<Vec<f64>>,
    pub lp: LpSolution,
}

impl BigMModel {
    /// Selected periods, ascending.
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    pub fn scope(&self) -> BudgetScope {
        self.scope
    }

    /// Number of budget rows.
    pub fn budget_groups(&self) -> usize {
        self.budget_rows.len()
    }

    /// Number of indicators each budget row sums.
    pub fn group_sizes(&self) -> &[usize] {
        &self.group_sizes
    }

    /// Current budget right-hand sides.
    pub fn budgets(&self) -> Vec<f64> {
        self.budget_rows.iter().map(|r| self.model.rhs(*r)).collect()
    }

    /// Update every budget right-hand side. The only way budgets change.
    pub fn set_budgets(&mut self, q: &[f64]) -> BiddingResult<()> {
        if q.len() != self.budget_rows.len() {
            return Err(BiddingError::BudgetShape {
                expected: self.budget_rows.len(),
                found: q.len(),
            });
        }
        if let Some(bad) = q.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(BiddingError::InvalidBudget(*bad));
        }
        for (row, value) in self.budget_rows.iter().zip(q) {
            self.model.set_rhs(*row, *value);
        }
        Ok(())
    }

    /// Relax every indicator to a continuous `[0, 1]` variable.
    pub fn relax(&mut self) {
        self.model.relax_integrality();
    }

    /// Relax the model and pin each indicator to 1 or 0.
    pub fn fix_indicators(&mut self, flags: &[Vec<bool>]) {
        self.relax();
        for (z, f) in self.indicators.iter().zip(flags) {
            for (var, on) in z.iter().zip(f) {
                let v = if *on { 1.0 } else { 0.0 };
                self.model.set_bounds(*var, v, v);
            }
        }
    }

    pub fn is_relaxed(&self) -> bool {
        !self.model.is_mixed_integer()
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn solve(&self, backend: &dyn LpBackend) -> Result<BigMSolution, LpError> {
        let lp = backend.solve(&self.model)?;
        let bids = self.bids.iter().map(|v| lp.value(*v)).collect();
        let indicators = self
            .indicators
            .iter()
            .map(|z| z.iter().map(|v| lp.value(*v)).collect())
            .collect();
        Ok(BigMSolution {
            bids,
            indicators,
            lp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> ScenarioSet {
        // period 0: 10..=15, period 1: 20..=25
        ScenarioSet::from_fn(2, 2, 3, |h, m, w| (10 * (h + 1) + m * 3 + w) as f64).unwrap()
    }

    #[test]
    fn test_big_m_validation() {
        let set = set();
        assert_eq!(derive_big_m(&set, &[0, 1]), 5.0);
        assert!(matches!(
            ChanceConstraintFormulator::new(&set, &[0], 0.0),
            Err(BiddingError::InvalidBigM(_))
        ));
        assert!(matches!(
            ChanceConstraintFormulator::new(&set, &[0], f64::NAN),
            Err(BiddingError::InvalidBigM(_))
        ));
        assert_eq!(
            ChanceConstraintFormulator::new(&set, &[0, 1], 4.0).unwrap_err(),
            BiddingError::BigMTooSmall {
                big_m: 4.0,
                required: 5.0
            }
        );
        assert!(ChanceConstraintFormulator::new(&set, &[], 10.0).is_err());
        assert!(matches!(
            ChanceConstraintFormulator::new(&set, &[2], 10.0),
            Err(BiddingError::Scenario(_))
        ));
    }

    #[test]
    fn test_constant_period_big_m() {
        let flat = ScenarioSet::from_fn(1, 2, 2, |_, _, _| 7.0).unwrap();
        assert_eq!(derive_big_m(&flat, &[0]), 1.0);
    }

    #[test]
    fn test_model_shape() {
        let set = set();
        let f = ChanceConstraintFormulator::new(&set, &[1, 0, 1], 100.0).unwrap();
        assert_eq!(f.periods(), &[0, 1]);

        let model = f.build();
        assert_eq!(model.budget_groups(), 2);
        assert_eq!(model.group_sizes(), &[6, 6]);
        // 2 bids + 12 indicators, 12 links + 2 budgets
        assert_eq!(model.model().var_count(), 14);
        assert_eq!(model.model().row_count(), 14);
        assert!(!model.is_relaxed());

        let shared = f.with_scope(BudgetScope::Shared).build();
        assert_eq!(shared.budget_groups(), 1);
        assert_eq!(shared.group_sizes(), &[12]);
    }

    #[test]
    fn test_set_budgets_is_checked() {
        let set = set();
        let mut model = ChanceConstraintFormulator::new(&set, &[0, 1], 100.0)
            .unwrap()
            .build();
        model.set_budgets(&[1.5, 2.0]).unwrap();
        assert_eq!(model.budgets(), vec![1.5, 2.0]);
        assert_eq!(
            model.set_budgets(&[1.0]).unwrap_err(),
            BiddingError::BudgetShape {
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            model.set_budgets(&[1.0, -1.0]).unwrap_err(),
            BiddingError::InvalidBudget(-1.0)
        );
        model.relax();
        assert!(model.is_relaxed());
    }

    #[cfg(feature = "solver-microlp")]
    #[test]
    fn test_zero_budget_bids_the_minimum() {
        use crate::lp::MicrolpBackend;

        let set = set();
        let mut model = ChanceConstraintFormulator::new(&set, &[0, 1], 1e6)
            .unwrap()
            .build();
        model.set_budgets(&[0.0, 0.0]).unwrap();
        let solution = model.solve(&MicrolpBackend).unwrap();
        assert!((solution.bids[0] - 10.0).abs() < 1e-6);
        assert!((solution.bids[1] - 20.0).abs() < 1e-6);
    }

    #[cfg(feature = "solver-microlp")]
    #[test]
    fn test_fixed_indicators_release_samples() {
        use crate::lp::MicrolpBackend;

        let set = set();
        let mut model = ChanceConstraintFormulator::new(&set, &[0], 100.0)
            .unwrap()
            .build();
        model.set_budgets(&[2.0]).unwrap();
        // samples of period 0 in (m, w) order: 10 11 12 13 14 15
        model.fix_indicators(&[vec![true, true, false, false, false, false]]);
        let solution = model.solve(&MicrolpBackend).unwrap();
        assert!((solution.bids[0] - 12.0).abs() < 1e-6);
    }
}
