//! Random in-sample / out-of-sample partitions.

use anyhow::{anyhow, Result};
use ccb_core::{ScenarioId, ScenarioPartition};
use rand::seq::index;
use rand::Rng;

/// Draw `n_in` of `total` scenarios without replacement as the in-sample set;
/// the rest are out of sample. Both sides are returned sorted.
pub fn random_partition<R: Rng + ?Sized>(
    rng: &mut R,
    total: usize,
    n_in: usize,
) -> Result<ScenarioPartition> {
    if n_in > total {
        return Err(anyhow!(
            "cannot draw {} in-sample scenarios from {}",
            n_in,
            total
        ));
    }
    let mut chosen = vec![false; total];
    for i in index::sample(rng, total, n_in) {
        chosen[i] = true;
    }

    let (in_sample, out_of_sample): (Vec<_>, Vec<_>) = (0..total)
        .map(ScenarioId::new)
        .partition(|id| chosen[id.value()]);
    let partition = ScenarioPartition::new(in_sample, out_of_sample)?;
    Ok(partition)
}
