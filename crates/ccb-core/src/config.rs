//! Bidding run configuration.
//!
//! [`BiddingConfig`] gathers every knob of a chance-constrained bidding run.
//! It is usually stored as TOML and supports partial files where unspecified
//! values fall back to the defaults below.
//!
//! ```toml
//! epsilon = 0.1
//! delta = 1e-4
//! budget_scope = "shared"
//! solver = "clarabel"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ScenarioResult;
use crate::target::ReliabilityTarget;

/// Settings for one bidding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiddingConfig {
    /// Maximum violation probability.
    pub epsilon: f64,

    /// Big-M constant. `None` derives the tightest sound value from the data.
    pub big_m: Option<f64>,

    /// Bisection stopping width on the violation budget.
    pub delta: f64,

    /// Hard cap on bisection steps.
    pub max_iterations: usize,

    /// Optional wall-clock budget for one bisection run.
    pub time_budget_secs: Option<f64>,

    /// Whether each period carries its own violation budget.
    pub budget_scope: BudgetScope,

    /// LP/MILP backend.
    pub solver: SolverChoice,

    /// A sample counts as violated when `bid - capacity` exceeds this.
    pub violation_tolerance: f64,

    /// Share of scenarios that must individually pass for the
    /// per-scenario reliability notion.
    pub scenario_pass_share: f64,
}

impl Default for BiddingConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            big_m: None,
            delta: 1e-3,
            max_iterations: 200,
            time_budget_secs: None,
            budget_scope: BudgetScope::PerPeriod,
            solver: SolverChoice::Microlp,
            violation_tolerance: 1e-6,
            scenario_pass_share: 0.9,
        }
    }
}

/// Granularity of the violation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    /// One budget row per period (joint multi-period model).
    #[default]
    PerPeriod,
    /// A single budget shared by every selected period.
    Shared,
}

/// LP/MILP backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolverChoice {
    /// Pure-Rust simplex with branch-and-bound.
    #[default]
    Microlp,
    /// Pure-Rust interior point (continuous models only).
    Clarabel,
    /// HiGHS (native, behind the `solver-highs` feature).
    Highs,
}

impl SolverChoice {
    /// Backend identifier.
    pub fn id(&self) -> &'static str {
        match self {
            SolverChoice::Microlp => "microlp",
            SolverChoice::Clarabel => "clarabel",
            SolverChoice::Highs => "highs",
        }
    }
}

impl BiddingConfig {
    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading bidding config '{}'", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing bidding config '{}'", path.display()))?;
        Ok(config)
    }

    /// Save configuration as TOML.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("serializing bidding config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing bidding config '{}'", path.display()))?;
        Ok(())
    }

    /// Validated reliability target.
    pub fn target(&self) -> ScenarioResult<ReliabilityTarget> {
        ReliabilityTarget::new(self.epsilon)
    }

    /// Wall-clock budget as a [`Duration`], if set and positive.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BiddingConfig::default();
        assert_eq!(config.epsilon, 0.1);
        assert_eq!(config.big_m, None);
        assert_eq!(config.budget_scope, BudgetScope::PerPeriod);
        assert_eq!(config.solver, SolverChoice::Microlp);
        assert_eq!(config.scenario_pass_share, 0.9);
        assert!(config.time_budget().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: BiddingConfig = toml::from_str(
            r#"
            epsilon = 0.05
            budget_scope = "shared"
            solver = "clarabel"
            "#,
        )
        .unwrap();
        assert_eq!(config.epsilon, 0.05);
        assert_eq!(config.budget_scope, BudgetScope::Shared);
        assert_eq!(config.solver, SolverChoice::Clarabel);
        assert_eq!(config.delta, 1e-3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bidding.toml");

        let mut config = BiddingConfig::default();
        config.big_m = Some(400.0);
        config.time_budget_secs = Some(2.5);
        config.save_to(&path).unwrap();

        let loaded = BiddingConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.time_budget(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_invalid_epsilon_surfaces() {
        let config = BiddingConfig {
            epsilon: 2.0,
            ..BiddingConfig::default()
        };
        assert!(config.target().is_err());
    }
}
