//! Out-of-sample verification of a bid.
//!
//! The verifier never solves anything. It applies a fixed bid to a scenario
//! set and counts, per period, how often the realized capacity falls short.
//! Two notions of reliability are reported side by side:
//!
//! - **per sample**: the share of violated `(m, w)` samples is at most `ε`;
//! - **per scenario**: a scenario passes when at most `floor(ε·|M|)` of its
//!   sub-periods are violated, and the period passes when at least
//!   `scenario_pass_share` of the scenarios pass.

use std::path::Path;

use anyhow::{Context, Result};
use ccb_core::{BiddingConfig, ReliabilityTarget, ScenarioError, ScenarioSet};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::{is_violated, BidSchedule};
use crate::error::{BiddingError, BiddingResult};

/// Applies bids to held-out scenarios.
#[derive(Debug, Clone, Copy)]
pub struct OutOfSampleVerifier {
    target: ReliabilityTarget,
    tolerance: f64,
    scenario_pass_share: f64,
}

/// Verification result of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReliability {
    pub period: usize,
    pub bid: f64,
    pub samples: usize,
    pub violations: usize,
    pub violation_fraction: f64,
    /// `mean_{m,w} max(bid - s, 0)`
    pub expected_shortfall: f64,
    /// Expected shortfall as a percentage of the bid (0 for a zero bid).
    pub relative_shortfall_pct: f64,
    /// Per-sample notion.
    pub sample_pass: bool,
    pub success_rate_pct: f64,
    pub scenarios: usize,
    pub scenarios_passed: usize,
    /// Per-scenario notion.
    pub scenario_pass: bool,
    pub scenario_success_rate_pct: f64,
}

/// Verification result over all periods of a bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    pub epsilon: f64,
    pub scenario_pass_share: f64,
    pub periods: Vec<PeriodReliability>,
    pub total_samples: usize,
    pub total_violations: usize,
    pub overall_violation_fraction: f64,
    pub mean_expected_shortfall: f64,
}

impl ReliabilityReport {
    /// Every period passes the per-sample notion.
    pub fn all_pass_sample(&self) -> bool {
        self.periods.iter().all(|p| p.sample_pass)
    }

    /// Every period passes the per-scenario notion.
    pub fn all_pass_scenario(&self) -> bool {
        self.periods.iter().all(|p| p.scenario_pass)
    }

    pub fn period(&self, period: usize) -> Option<&PeriodReliability> {
        self.periods.iter().find(|p| p.period == period)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing reliability report")
    }

    /// Write the report as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)
            .with_context(|| format!("writing reliability report '{}'", path.display()))?;
        Ok(())
    }
}

impl OutOfSampleVerifier {
    pub fn new(target: ReliabilityTarget) -> Self {
        let defaults = BiddingConfig::default();
        Self {
            target,
            tolerance: defaults.violation_tolerance,
            scenario_pass_share: defaults.scenario_pass_share,
        }
    }

    pub fn from_bidding_config(config: &BiddingConfig) -> BiddingResult<Self> {
        Self::new(config.target()?)
            .with_tolerance(config.violation_tolerance)
            .with_scenario_pass_share(config.scenario_pass_share)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_scenario_pass_share(mut self, share: f64) -> BiddingResult<Self> {
        if !(0.0..=1.0).contains(&share) {
            return Err(BiddingError::InvalidPassShare(share));
        }
        self.scenario_pass_share = share;
        Ok(self)
    }

    pub fn target(&self) -> ReliabilityTarget {
        self.target
    }

    /// Verify `bids` on `scenarios`.
    pub fn verify(&self, bids: &BidSchedule, scenarios: &ScenarioSet) -> BiddingResult<ReliabilityReport> {
        let mut periods = Vec::with_capacity(bids.len());
        for (period, bid) in bids.iter() {
            let h = period.value();
            scenarios.check_period(h)?;
            periods.push(self.verify_period(scenarios, h, bid));
        }

        let total_samples: usize = periods.iter().map(|p| p.samples).sum();
        let total_violations: usize = periods.iter().map(|p| p.violations).sum();
        let mean_expected_shortfall =
            periods.iter().map(|p| p.expected_shortfall).sum::<f64>() / periods.len() as f64;

        let report = ReliabilityReport {
            epsilon: self.target.epsilon(),
            scenario_pass_share: self.scenario_pass_share,
            overall_violation_fraction: total_violations as f64 / total_samples as f64,
            periods,
            total_samples,
            total_violations,
            mean_expected_shortfall,
        };
        info!(
            periods = report.periods.len(),
            violations = report.total_violations,
            samples = report.total_samples,
            sample_pass = report.all_pass_sample(),
            scenario_pass = report.all_pass_scenario(),
            "bid verified"
        );
        Ok(report)
    }

    /// Verify on `out_of_sample` after checking it shares no scenario with
    /// `in_sample` and covers every period of the bid.
    pub fn verify_partitioned(
        &self,
        bids: &BidSchedule,
        in_sample: &ScenarioSet,
        out_of_sample: &ScenarioSet,
    ) -> BiddingResult<ReliabilityReport> {
        let overlap = in_sample.shared_scenarios(out_of_sample);
        if !overlap.is_empty() {
            return Err(ScenarioError::OverlappingPartition { overlap }.into());
        }
        if bids.len() > out_of_sample.periods() {
            return Err(BiddingError::BidShape {
                expected: out_of_sample.periods(),
                found: bids.len(),
            });
        }
        self.verify(bids, out_of_sample)
    }

    fn verify_period(&self, scenarios: &ScenarioSet, h: usize, bid: f64) -> PeriodReliability {
        let samples = scenarios.period_samples(h);
        let n = samples.len();
        let violations = samples
            .iter()
            .filter(|&&s| is_violated(bid, s, self.tolerance))
            .count();
        let expected_shortfall = samples.iter().map(|s| (bid - s).max(0.0)).sum::<f64>() / n as f64;
        let relative_shortfall_pct = if bid > 0.0 {
            100.0 * expected_shortfall / bid
        } else {
            0.0
        };
        let violation_fraction = violations as f64 / n as f64;

        let sub_periods = scenarios.sub_periods();
        let n_scen = scenarios.scenario_count();
        let scenarios_passed = (0..n_scen)
            .filter(|&w| {
                let v = scenarios
                    .scenario_trace(h, w)
                    .filter(|s| is_violated(bid, *s, self.tolerance))
                    .count();
                self.target.is_met(v, sub_periods)
            })
            .count();
        let scenario_share = scenarios_passed as f64 / n_scen as f64;

        PeriodReliability {
            period: h,
            bid,
            samples: n,
            violations,
            violation_fraction,
            expected_shortfall,
            relative_shortfall_pct,
            sample_pass: self.target.is_met(violations, n),
            success_rate_pct: 100.0 * (1.0 - violation_fraction),
            scenarios: n_scen,
            scenarios_passed,
            scenario_pass: scenario_share >= self.scenario_pass_share,
            scenario_success_rate_pct: 100.0 * scenario_share,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccb_core::{PeriodId, ScenarioPartition};

    /// 1 period, 4 sub-periods, 5 scenarios; scenario `w` reads `10·(w+1)` except
    /// scenario 0 which dips to 1 in its last sub-period.
    fn set() -> ScenarioSet {
        ScenarioSet::from_fn(1, 4, 5, |_, m, w| {
            if w == 0 && m == 3 {
                1.0
            } else {
                10.0 * (w + 1) as f64
            }
        })
        .unwrap()
    }

    #[test]
    fn test_counts_and_shortfall() {
        let set = set();
        let verifier = OutOfSampleVerifier::new(ReliabilityTarget::new(0.25).unwrap());
        let bids = BidSchedule::from_dense(vec![15.0]).unwrap();
        let report = verifier.verify(&bids, &set).unwrap();
        let p = &report.periods[0];

        // scenario 0 is short in all 4 sub-periods
        assert_eq!(p.samples, 20);
        assert_eq!(p.violations, 4);
        assert!((p.violation_fraction - 0.2).abs() < 1e-12);
        assert!(p.sample_pass);
        assert!((p.success_rate_pct - 80.0).abs() < 1e-9);
        // (5 + 5 + 5 + 14) / 20
        assert!((p.expected_shortfall - 29.0 / 20.0).abs() < 1e-12);
        assert!((p.relative_shortfall_pct - 100.0 * 1.45 / 15.0).abs() < 1e-9);

        // floor(0.25 * 4) = 1 allowed per scenario: scenario 0 fails, 4/5 pass
        assert_eq!(p.scenarios_passed, 4);
        assert!(!p.scenario_pass);
        assert!((p.scenario_success_rate_pct - 80.0).abs() < 1e-9);
        assert!(!report.all_pass_scenario());
    }

    #[test]
    fn test_pass_share_is_configurable() {
        let set = set();
        let verifier = OutOfSampleVerifier::new(ReliabilityTarget::new(0.25).unwrap())
            .with_scenario_pass_share(0.8)
            .unwrap();
        let report = verifier
            .verify(&BidSchedule::from_dense(vec![15.0]).unwrap(), &set)
            .unwrap();
        assert!(report.all_pass_scenario());
        assert!(OutOfSampleVerifier::new(ReliabilityTarget::new(0.25).unwrap())
            .with_scenario_pass_share(1.5)
            .is_err());
    }

    #[test]
    fn test_zero_bid_has_no_relative_shortfall() {
        let set = set();
        let verifier = OutOfSampleVerifier::new(ReliabilityTarget::new(0.1).unwrap());
        let report = verifier
            .verify(&BidSchedule::from_dense(vec![0.0]).unwrap(), &set)
            .unwrap();
        assert_eq!(report.total_violations, 0);
        assert_eq!(report.periods[0].relative_shortfall_pct, 0.0);
        assert_eq!(report.mean_expected_shortfall, 0.0);
    }

    #[test]
    fn test_unknown_period_rejected() {
        let set = set();
        let verifier = OutOfSampleVerifier::new(ReliabilityTarget::new(0.1).unwrap());
        let bids = BidSchedule::new(vec![PeriodId::new(3)], vec![1.0]).unwrap();
        assert!(matches!(
            verifier.verify(&bids, &set),
            Err(BiddingError::Scenario(ScenarioError::PeriodOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_partitioned_rejects_overlap() {
        let set = set();
        let verifier = OutOfSampleVerifier::new(ReliabilityTarget::new(0.1).unwrap());
        let bids = BidSchedule::from_dense(vec![5.0]).unwrap();

        let partition = ScenarioPartition::split_first(5, 3).unwrap();
        let (in_sample, out_of_sample) = set.split(&partition).unwrap();
        assert!(verifier
            .verify_partitioned(&bids, &in_sample, &out_of_sample)
            .is_ok());

        let leaky = set.select(&partition.in_sample()[..1]).unwrap();
        let err = verifier
            .verify_partitioned(&bids, &in_sample, &leaky)
            .unwrap_err();
        assert!(matches!(
            err,
            BiddingError::Scenario(ScenarioError::OverlappingPartition { .. })
        ));
    }

    #[test]
    fn test_report_json() {
        let set = set();
        let verifier = OutOfSampleVerifier::new(ReliabilityTarget::new(0.25).unwrap());
        let report = verifier
            .verify(&BidSchedule::from_dense(vec![15.0]).unwrap(), &set)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.save_json(&path).unwrap();
        let back: ReliabilityReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.total_violations, 4);
        assert_eq!(back.periods[0].scenarios_passed, 4);
        assert_eq!(back.epsilon, 0.25);
    }
}
