//! In-sample / out-of-sample scenario partitions

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ScenarioError, ScenarioResult};
use crate::ScenarioId;

/// Two disjoint, non-empty lists of scenario ids.
///
/// The in-sample side computes a bid, the out-of-sample side only verifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPartition")]
pub struct ScenarioPartition {
    in_sample: Vec<ScenarioId>,
    out_of_sample: Vec<ScenarioId>,
}

#[derive(Deserialize)]
struct RawPartition {
    in_sample: Vec<ScenarioId>,
    out_of_sample: Vec<ScenarioId>,
}

impl TryFrom<RawPartition> for ScenarioPartition {
    type Error = ScenarioError;

    fn try_from(raw: RawPartition) -> Result<Self, Self::Error> {
        ScenarioPartition::new(raw.in_sample, raw.out_of_sample)
    }
}

impl ScenarioPartition {
    /// Create a partition, rejecting empty sides, duplicates and overlap.
    pub fn new(
        in_sample: Vec<ScenarioId>,
        out_of_sample: Vec<ScenarioId>,
    ) -> ScenarioResult<Self> {
        if in_sample.is_empty() {
            return Err(ScenarioError::EmptyPartition { side: "in-sample" });
        }
        if out_of_sample.is_empty() {
            return Err(ScenarioError::EmptyPartition {
                side: "out-of-sample",
            });
        }

        let mut in_ids = HashSet::with_capacity(in_sample.len());
        for id in &in_sample {
            if !in_ids.insert(*id) {
                return Err(ScenarioError::DuplicateScenario(*id));
            }
        }
        let mut out_ids = HashSet::with_capacity(out_of_sample.len());
        for id in &out_of_sample {
            if !out_ids.insert(*id) {
                return Err(ScenarioError::DuplicateScenario(*id));
            }
        }

        let mut overlap: Vec<ScenarioId> = in_ids.intersection(&out_ids).copied().collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(ScenarioError::OverlappingPartition { overlap });
        }

        Ok(Self {
            in_sample,
            out_of_sample,
        })
    }

    /// First `n_in` of `total` scenarios in sample, the rest out of sample.
    pub fn split_first(total: usize, n_in: usize) -> ScenarioResult<Self> {
        let ids: Vec<ScenarioId> = (0..total).map(ScenarioId::new).collect();
        let n_in = n_in.min(total);
        Self::new(ids[..n_in].to_vec(), ids[n_in..].to_vec())
    }

    /// In-sample scenario ids.
    pub fn in_sample(&self) -> &[ScenarioId] {
        &self.in_sample
    }

    /// Out-of-sample scenario ids.
    pub fn out_of_sample(&self) -> &[ScenarioId] {
        &self.out_of_sample
    }

    /// Total number of scenarios covered.
    pub fn len(&self) -> usize {
        self.in_sample.len() + self.out_of_sample.len()
    }

    /// A valid partition is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[usize]) -> Vec<ScenarioId> {
        v.iter().copied().map(ScenarioId::new).collect()
    }

    #[test]
    fn test_split_first() {
        let p = ScenarioPartition::split_first(5, 2).unwrap();
        assert_eq!(p.in_sample(), ids(&[0, 1]).as_slice());
        assert_eq!(p.out_of_sample(), ids(&[2, 3, 4]).as_slice());
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn test_split_first_needs_both_sides() {
        assert!(matches!(
            ScenarioPartition::split_first(3, 3),
            Err(ScenarioError::EmptyPartition {
                side: "out-of-sample"
            })
        ));
        assert!(matches!(
            ScenarioPartition::split_first(3, 0),
            Err(ScenarioError::EmptyPartition { side: "in-sample" })
        ));
    }

    #[test]
    fn test_overlap_rejected() {
        let err = ScenarioPartition::new(ids(&[0, 1, 2]), ids(&[2, 3, 1])).unwrap_err();
        assert_eq!(
            err,
            ScenarioError::OverlappingPartition {
                overlap: ids(&[1, 2])
            }
        );
    }

    #[test]
    fn test_deserialize_checks_overlap() {
        let bad = r#"{"in_sample":[0,1],"out_of_sample":[1]}"#;
        assert!(serde_json::from_str::<ScenarioPartition>(bad).is_err());
        let good = r#"{"in_sample":[0,1],"out_of_sample":[2]}"#;
        let p: ScenarioPartition = serde_json::from_str(good).unwrap();
        assert_eq!(p.out_of_sample(), ids(&[2]).as_slice());
    }
}
