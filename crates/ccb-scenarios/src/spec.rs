use anyhow::{anyhow, Context, Result};
use ccb_core::{ScenarioPartition, ScenarioSet};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::profile::RandomWalkProfile;
use crate::sampling::random_partition;

/// A reproducible scenario study: profile shape, counts and seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    #[serde(default)]
    pub profile: RandomWalkProfile,
    #[serde(default = "default_scenarios")]
    pub scenarios: usize,
    #[serde(default = "default_in_sample")]
    pub in_sample: usize,
    /// `None` draws from OS entropy.
    pub seed: Option<u64>,
}

fn default_scenarios() -> usize {
    300
}

fn default_in_sample() -> usize {
    100
}

impl Default for ProfileSpec {
    fn default() -> Self {
        Self {
            profile: RandomWalkProfile::default(),
            scenarios: default_scenarios(),
            in_sample: default_in_sample(),
            seed: None,
        }
    }
}

/// Generated scenarios split into the in-sample and out-of-sample sets.
#[derive(Debug, Clone)]
pub struct MaterializedScenarios {
    pub in_sample: ScenarioSet,
    pub out_of_sample: ScenarioSet,
    pub partition: ScenarioPartition,
}

impl ProfileSpec {
    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        if self.in_sample == 0 || self.in_sample >= self.scenarios {
            return Err(anyhow!(
                "in_sample must lie in 1..{}, got {}",
                self.scenarios,
                self.in_sample
            ));
        }
        Ok(())
    }

    /// Generate every trace, then draw the partition from the same RNG stream.
    pub fn materialize(&self) -> Result<MaterializedScenarios> {
        self.validate()?;
        let mut rng = self
            .seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);

        let all = self
            .profile
            .generate(&mut rng, self.scenarios)
            .context("generating scenario traces")?;
        let partition = random_partition(&mut rng, self.scenarios, self.in_sample)?;
        let (in_sample, out_of_sample) = all.split(&partition)?;

        info!(
            scenarios = self.scenarios,
            in_sample = self.in_sample,
            periods = self.profile.periods,
            sub_periods = self.profile.sub_periods,
            "scenario study materialized"
        );
        Ok(MaterializedScenarios {
            in_sample,
            out_of_sample,
            partition,
        })
    }
}

pub fn load_spec_from_path(path: &Path) -> Result<ProfileSpec> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading profile spec '{}'", path.display()))?;
    let spec: ProfileSpec = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing profile spec yaml")?
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing profile spec json")?
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing profile spec")?,
    };
    spec.validate()
        .with_context(|| format!("validating profile spec '{}'", path.display()))?;
    Ok(spec)
}

pub fn save_spec_to_path(spec: &ProfileSpec, path: &Path) -> Result<()> {
    let data = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::to_string_pretty(spec).context("serializing profile spec json")?
        }
        _ => serde_yaml::to_string(spec).context("serializing profile spec yaml")?,
    };
    fs::write(path, data).with_context(|| format!("writing profile spec '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let spec: ProfileSpec = serde_yaml::from_str("seed: 2\nprofile:\n  periods: 2\n").unwrap();
        assert_eq!(spec.seed, Some(2));
        assert_eq!(spec.scenarios, 300);
        assert_eq!(spec.profile.periods, 2);
        assert_eq!(spec.profile.sub_periods, 60);
        assert_eq!(spec.profile.max_step, 35.0);
    }

    #[test]
    fn test_validate_counts() {
        let spec = ProfileSpec {
            scenarios: 10,
            in_sample: 10,
            ..ProfileSpec::default()
        };
        assert!(spec.validate().is_err());
    }
}
