//! Reliability targets
//!
//! A target is the maximum violation probability `ε`: the bid must be covered
//! by the realized capacity in at least `1 - ε` of the observations.

use serde::{Deserialize, Serialize};

use crate::error::{ScenarioError, ScenarioResult};

/// Guard against `0.1 * 60.0 * 100.0 = 599.999...` style truncation.
const FLOOR_GUARD: f64 = 1e-9;

/// Validated maximum violation probability `ε ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReliabilityTarget(f64);

impl ReliabilityTarget {
    /// Create a target from `ε`.
    pub fn new(epsilon: f64) -> ScenarioResult<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(ScenarioError::InvalidEpsilon(epsilon));
        }
        Ok(Self(epsilon))
    }

    /// Target from a "P-level", e.g. `90` for P90 (`ε = 0.1`).
    pub fn from_p_level(p: f64) -> ScenarioResult<Self> {
        Self::new(1.0 - p / 100.0)
    }

    /// Maximum violation probability `ε`.
    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.0
    }

    /// Required reliability `1 - ε`.
    #[inline]
    pub fn reliability(&self) -> f64 {
        1.0 - self.0
    }

    /// Continuous budget ceiling `ε · n`.
    pub fn budget_ceiling(&self, samples: usize) -> f64 {
        self.0 * samples as f64
    }

    /// Largest integer number of violations allowed among `samples`.
    pub fn violation_budget(&self, samples: usize) -> usize {
        (self.budget_ceiling(samples) + FLOOR_GUARD).floor() as usize
    }

    /// Whether `violations` out of `samples` meets the target.
    pub fn is_met(&self, violations: usize, samples: usize) -> bool {
        violations <= self.violation_budget(samples)
    }
}

impl TryFrom<f64> for ReliabilityTarget {
    type Error = ScenarioError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        ReliabilityTarget::new(value)
    }
}

impl From<ReliabilityTarget> for f64 {
    fn from(target: ReliabilityTarget) -> Self {
        target.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(ReliabilityTarget::new(0.0).is_ok());
        assert!(ReliabilityTarget::new(1.0).is_ok());
        assert_eq!(
            ReliabilityTarget::new(1.5),
            Err(ScenarioError::InvalidEpsilon(1.5))
        );
        assert!(ReliabilityTarget::new(-0.01).is_err());
        assert!(ReliabilityTarget::new(f64::NAN).is_err());
    }

    #[test]
    fn test_violation_budget_truncation() {
        let quarter = ReliabilityTarget::new(0.25).unwrap();
        assert_eq!(quarter.violation_budget(12), 3);
        assert_eq!(quarter.violation_budget(11), 2);

        // 0.1 * 6000 is not exactly representable
        let p90 = ReliabilityTarget::from_p_level(90.0).unwrap();
        assert_eq!(p90.violation_budget(60 * 100), 600);
        assert!(p90.is_met(600, 6000));
        assert!(!p90.is_met(601, 6000));
    }

    #[test]
    fn test_reliability() {
        let t = ReliabilityTarget::new(0.05).unwrap();
        assert!((t.reliability() - 0.95).abs() < 1e-12);
        assert!((t.budget_ceiling(100) - 5.0).abs() < 1e-12);
    }
}
