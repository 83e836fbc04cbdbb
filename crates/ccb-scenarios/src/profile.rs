//! Bounded random-walk capacity profiles.

use anyhow::{anyhow, Result};
use ccb_core::ScenarioSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A random walk clamped to `[min, max]`.
///
/// The first value of a trace is uniform in `[min, max]`. Every next value is
/// uniform in `[max(min, prev - max_step), min(max, prev + max_step)]`. One
/// trace covers `periods * sub_periods` steps, period-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkProfile {
    pub min: f64,
    pub max: f64,
    pub max_step: f64,
    pub periods: usize,
    pub sub_periods: usize,
}

impl Default for RandomWalkProfile {
    /// Minute-resolution day of a 220-600 kW load.
    fn default() -> Self {
        Self {
            min: 220.0,
            max: 600.0,
            max_step: 35.0,
            periods: 24,
            sub_periods: 60,
        }
    }
}

impl RandomWalkProfile {
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || !self.max_step.is_finite() {
            return Err(anyhow!("profile bounds and step must be finite"));
        }
        if self.min < 0.0 {
            return Err(anyhow!("profile minimum {} is negative", self.min));
        }
        if self.min > self.max {
            return Err(anyhow!(
                "profile minimum {} exceeds maximum {}",
                self.min,
                self.max
            ));
        }
        if self.max_step < 0.0 {
            return Err(anyhow!("profile step {} is negative", self.max_step));
        }
        if self.periods == 0 || self.sub_periods == 0 {
            return Err(anyhow!("profile needs at least one period and sub-period"));
        }
        Ok(())
    }

    /// Values per trace.
    pub fn len(&self) -> usize {
        self.periods * self.sub_periods
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw one trace. The profile must be valid.
    pub fn trace<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let mut trace = Vec::with_capacity(self.len());
        let mut value = rng.gen_range(self.min..=self.max);
        trace.push(value);
        for _ in 1..self.len() {
            let lower = self.min.max(value - self.max_step);
            let upper = self.max.min(value + self.max_step);
            value = rng.gen_range(lower..=upper);
            trace.push(value);
        }
        trace
    }

    /// Draw `scenarios` traces into a [`ScenarioSet`] with ids `0..scenarios`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, scenarios: usize) -> Result<ScenarioSet> {
        self.validate()?;
        let traces = (0..scenarios).map(|_| self.trace(rng)).collect();
        let set = ScenarioSet::from_traces(self.periods, self.sub_periods, traces)?;
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small() -> RandomWalkProfile {
        RandomWalkProfile {
            min: 10.0,
            max: 50.0,
            max_step: 3.0,
            periods: 3,
            sub_periods: 20,
        }
    }

    #[test]
    fn test_trace_respects_bounds_and_step() {
        let profile = small();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let trace = profile.trace(&mut rng);
            assert_eq!(trace.len(), 60);
            assert!(trace.iter().all(|v| (10.0..=50.0).contains(v)));
            assert!(trace.windows(2).all(|w| (w[1] - w[0]).abs() <= 3.0 + 1e-12));
        }
    }

    #[test]
    fn test_generate_is_reproducible() {
        let profile = small();
        let a = profile.generate(&mut StdRng::seed_from_u64(2), 5).unwrap();
        let b = profile.generate(&mut StdRng::seed_from_u64(2), 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.periods(), 3);
        assert_eq!(a.samples_per_period(), 100);
    }

    #[test]
    fn test_invalid_profile() {
        let mut profile = small();
        profile.min = 60.0;
        assert!(profile.generate(&mut StdRng::seed_from_u64(0), 1).is_err());

        let mut profile = small();
        profile.sub_periods = 0;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_constant_profile() {
        let profile = RandomWalkProfile {
            min: 5.0,
            max: 5.0,
            max_step: 1.0,
            periods: 1,
            sub_periods: 4,
        };
        let set = profile.generate(&mut StdRng::seed_from_u64(1), 2).unwrap();
        assert_eq!(set.period_samples(0), &[5.0; 8]);
    }
}
