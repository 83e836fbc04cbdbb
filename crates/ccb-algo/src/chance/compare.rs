//! Side-by-side runs: ALSO-X against CVaR, and bids across a range of `ε`.

use ccb_core::{BiddingConfig, ReliabilityTarget, ScenarioSet};
#[cfg(feature = "desktop")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::alsox::{AlsoXConfig, AlsoXSolution, AlsoXSolver};
use super::cvar::{CvarFormulator, CvarSolution};
use super::exact::PerPeriodSolver;
use super::types::BidSchedule;
use super::verify::{OutOfSampleVerifier, ReliabilityReport};
use crate::error::BiddingResult;
use crate::lp::LpBackend;

/// ALSO-X and CVaR bids for the same target, both verified out of sample.
#[derive(Debug, Clone)]
pub struct BidComparison {
    pub alsox: AlsoXSolution,
    pub cvar: CvarSolution,
    pub alsox_report: ReliabilityReport,
    pub cvar_report: ReliabilityReport,
}

impl BidComparison {
    /// `Σ bid` given up by the convex surrogate.
    pub fn cvar_gap(&self) -> f64 {
        self.alsox.bids.total() - self.cvar.bids.total()
    }
}

/// Solve ALSO-X and CVaR on `in_sample` and verify both on `out_of_sample`.
pub fn compare_bids(
    backend: &dyn LpBackend,
    config: &BiddingConfig,
    in_sample: &ScenarioSet,
    out_of_sample: &ScenarioSet,
) -> BiddingResult<BidComparison> {
    let target = config.target()?;
    let alsox = AlsoXSolver::new(backend, AlsoXConfig::from_bidding_config(config)?);
    let cvar = CvarFormulator::new(target);

    #[cfg(feature = "desktop")]
    let (alsox, cvar) = rayon::join(
        || alsox.solve_all(in_sample),
        || cvar.solve_all(backend, in_sample),
    );
    #[cfg(not(feature = "desktop"))]
    let (alsox, cvar) = (alsox.solve_all(in_sample), cvar.solve_all(backend, in_sample));
    let (alsox, cvar) = (alsox?, cvar?);

    let verifier = OutOfSampleVerifier::from_bidding_config(config)?;
    let alsox_report = verifier.verify_partitioned(&alsox.bids, in_sample, out_of_sample)?;
    let cvar_report = verifier.verify_partitioned(&cvar.bids, in_sample, out_of_sample)?;

    info!(
        alsox_total = alsox.bids.total(),
        cvar_total = cvar.bids.total(),
        alsox_violations = alsox_report.total_violations,
        cvar_violations = cvar_report.total_violations,
        "ALSO-X and CVaR bids compared"
    );

    Ok(BidComparison {
        alsox,
        cvar,
        alsox_report,
        cvar_report,
    })
}

/// One row of an `ε` sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRow {
    pub epsilon: f64,
    pub bids: BidSchedule,
    /// Out-of-sample violations over all periods.
    pub violations: usize,
    /// Mean over periods of the out-of-sample expected shortfall.
    pub expected_shortfall: f64,
    /// Mean over periods of the relative shortfall, in percent.
    pub relative_shortfall_pct: f64,
    pub report: ReliabilityReport,
}

/// Exact per-period bids for each `ε`, verified out of sample.
///
/// Rows come back in the order of `epsilons`.
pub fn sweep_epsilon(
    backend: &dyn LpBackend,
    config: &BiddingConfig,
    epsilons: &[f64],
    in_sample: &ScenarioSet,
    out_of_sample: &ScenarioSet,
) -> BiddingResult<Vec<SweepRow>> {
    let run = |epsilon: f64| -> BiddingResult<SweepRow> {
        let config = BiddingConfig {
            epsilon,
            ..config.clone()
        };
        let solution = PerPeriodSolver::from_bidding_config(backend, &config)?.solve_all(in_sample)?;
        let report = OutOfSampleVerifier::from_bidding_config(&config)?.verify_partitioned(
            &solution.bids,
            in_sample,
            out_of_sample,
        )?;

        let n = report.periods.len() as f64;
        let relative_shortfall_pct =
            report.periods.iter().map(|p| p.relative_shortfall_pct).sum::<f64>() / n;
        Ok(SweepRow {
            epsilon,
            bids: solution.bids,
            violations: report.total_violations,
            expected_shortfall: report.mean_expected_shortfall,
            relative_shortfall_pct,
            report,
        })
    };

    // reject an invalid ε before solving anything
    for &epsilon in epsilons {
        ReliabilityTarget::new(epsilon)?;
    }

    #[cfg(feature = "desktop")]
    let rows: BiddingResult<Vec<SweepRow>> = epsilons.par_iter().map(|&e| run(e)).collect();
    #[cfg(not(feature = "desktop"))]
    let rows: BiddingResult<Vec<SweepRow>> = epsilons.iter().map(|&e| run(e)).collect();
    let rows = rows?;

    info!(points = rows.len(), "epsilon sweep finished");
    Ok(rows)
}

#[cfg(all(test, feature = "solver-microlp"))]
mod tests {
    use super::*;
    use crate::lp::MicrolpBackend;
    use ccb_core::ScenarioPartition;

    #[test]
    fn test_sweep_rows_follow_input_order() {
        // 1 period, 2 sub-periods, 6 scenarios; values are distinct
        let set = ScenarioSet::from_fn(1, 2, 6, |_, m, w| 50.0 + 7.0 * w as f64 + 3.0 * m as f64)
            .unwrap();
        let partition = ScenarioPartition::split_first(6, 4).unwrap();
        let (in_sample, out_of_sample) = set.split(&partition).unwrap();

        let rows = sweep_epsilon(
            &MicrolpBackend,
            &BiddingConfig::default(),
            &[0.25, 0.0, 0.125],
            &in_sample,
            &out_of_sample,
        )
        .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].epsilon, 0.25);
        assert_eq!(rows[1].epsilon, 0.0);
        // robust bid is the in-sample minimum
        assert!((rows[1].bids.bids()[0] - 50.0).abs() < 1e-6);
        assert!(rows[2].bids.total() <= rows[0].bids.total() + 1e-9);
        assert!(rows[1].bids.total() <= rows[2].bids.total() + 1e-9);
    }

    #[test]
    fn test_sweep_rejects_bad_epsilon() {
        let set = ScenarioSet::from_fn(1, 1, 4, |_, _, w| w as f64).unwrap();
        let partition = ScenarioPartition::split_first(4, 2).unwrap();
        let (in_sample, out_of_sample) = set.split(&partition).unwrap();
        assert!(sweep_epsilon(
            &MicrolpBackend,
            &BiddingConfig::default(),
            &[0.1, 1.5],
            &in_sample,
            &out_of_sample,
        )
        .is_err());
    }
}
