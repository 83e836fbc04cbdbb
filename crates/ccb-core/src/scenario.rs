//! Dense scenario tables
//!
//! A [`ScenarioSet`] stores one realized capacity value per
//! `(period, sub_period, scenario)` triple in a single flat vector:
//!
//! ```text
//! index(h, m, w) = (h * sub_periods + m) * scenarios + w
//! ```
//!
//! so that the `sub_periods * scenarios` samples of one period are a contiguous
//! slice. Every dense scenario column remembers the [`ScenarioId`] it was built
//! from, which lets in-sample and out-of-sample subsets be checked for overlap
//! after they have been cut out of a larger set.

use serde::{Deserialize, Serialize};

use crate::error::{ScenarioError, ScenarioResult};
use crate::partition::ScenarioPartition;
use crate::ScenarioId;

/// Immutable table of realized capacity values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScenarioSet")]
pub struct ScenarioSet {
    periods: usize,
    sub_periods: usize,
    scenario_ids: Vec<ScenarioId>,
    values: Vec<f64>,
}

/// Unvalidated wire shape, checked on deserialization.
#[derive(Deserialize)]
struct RawScenarioSet {
    periods: usize,
    sub_periods: usize,
    scenario_ids: Vec<ScenarioId>,
    values: Vec<f64>,
}

impl TryFrom<RawScenarioSet> for ScenarioSet {
    type Error = ScenarioError;

    fn try_from(raw: RawScenarioSet) -> Result<Self, Self::Error> {
        let expected = check_axes(raw.periods, raw.sub_periods, raw.scenario_ids.len())?;
        if raw.values.len() != expected {
            return Err(ScenarioError::TraceLength {
                scenario: raw.scenario_ids.first().copied().unwrap_or(ScenarioId::new(0)),
                expected,
                found: raw.values.len(),
            });
        }
        let set = ScenarioSet {
            periods: raw.periods,
            sub_periods: raw.sub_periods,
            scenario_ids: raw.scenario_ids,
            values: raw.values,
        };
        set.validate()?;
        Ok(set)
    }
}

impl ScenarioSet {
    /// Build a set from one trace per scenario.
    ///
    /// Each trace holds `periods * sub_periods` values ordered period-major
    /// (all sub-periods of period 0, then period 1, ...). Scenario ids are
    /// assigned `0..traces.len()`.
    pub fn from_traces(
        periods: usize,
        sub_periods: usize,
        traces: Vec<Vec<f64>>,
    ) -> ScenarioResult<Self> {
        let labeled = traces
            .into_iter()
            .enumerate()
            .map(|(w, trace)| (ScenarioId::new(w), trace))
            .collect();
        Self::from_labeled_traces(periods, sub_periods, labeled)
    }

    /// Build a set from traces that already carry their scenario ids.
    pub fn from_labeled_traces(
        periods: usize,
        sub_periods: usize,
        traces: Vec<(ScenarioId, Vec<f64>)>,
    ) -> ScenarioResult<Self> {
        let total = check_axes(periods, sub_periods, traces.len())?;
        let expected = periods * sub_periods;
        for (id, trace) in &traces {
            if trace.len() != expected {
                return Err(ScenarioError::TraceLength {
                    scenario: *id,
                    expected,
                    found: trace.len(),
                });
            }
        }

        let n_scen = traces.len();
        let mut values = vec![0.0; total];
        for (w, (_, trace)) in traces.iter().enumerate() {
            for (t, value) in trace.iter().enumerate() {
                values[t * n_scen + w] = *value;
            }
        }

        let set = Self {
            periods,
            sub_periods,
            scenario_ids: traces.into_iter().map(|(id, _)| id).collect(),
            values,
        };
        set.validate()?;
        Ok(set)
    }

    /// Build a set by evaluating `f(period, sub_period, scenario)` on every triple.
    pub fn from_fn<F>(
        periods: usize,
        sub_periods: usize,
        scenarios: usize,
        mut f: F,
    ) -> ScenarioResult<Self>
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let total = check_axes(periods, sub_periods, scenarios)?;
        let mut values = Vec::with_capacity(total);
        for h in 0..periods {
            for m in 0..sub_periods {
                for w in 0..scenarios {
                    values.push(f(h, m, w));
                }
            }
        }
        let set = Self {
            periods,
            sub_periods,
            scenario_ids: (0..scenarios).map(ScenarioId::new).collect(),
            values,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> ScenarioResult<()> {
        check_axes(self.periods, self.sub_periods, self.scenario_ids.len())?;

        let mut seen = std::collections::HashSet::with_capacity(self.scenario_ids.len());
        for id in &self.scenario_ids {
            if !seen.insert(*id) {
                return Err(ScenarioError::DuplicateScenario(*id));
            }
        }

        for h in 0..self.periods {
            for m in 0..self.sub_periods {
                for (w, id) in self.scenario_ids.iter().enumerate() {
                    let value = self.value(h, m, w);
                    if !value.is_finite() {
                        return Err(ScenarioError::NonFinite {
                            period: h,
                            sub_period: m,
                            scenario: *id,
                            value,
                        });
                    }
                    if value < 0.0 {
                        return Err(ScenarioError::Negative {
                            period: h,
                            sub_period: m,
                            scenario: *id,
                            value,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of periods.
    pub fn periods(&self) -> usize {
        self.periods
    }

    /// Number of sub-periods per period.
    pub fn sub_periods(&self) -> usize {
        self.sub_periods
    }

    /// Number of scenarios (dense columns).
    pub fn scenario_count(&self) -> usize {
        self.scenario_ids.len()
    }

    /// Samples evaluated by one period's chance constraint (`|M| * |W|`).
    pub fn samples_per_period(&self) -> usize {
        self.sub_periods * self.scenario_ids.len()
    }

    /// Original ids of the dense scenario columns.
    pub fn scenario_ids(&self) -> &[ScenarioId] {
        &self.scenario_ids
    }

    /// Original id of dense column `w`.
    pub fn scenario_id(&self, w: usize) -> ScenarioId {
        self.scenario_ids[w]
    }

    #[inline]
    fn index(&self, h: usize, m: usize, w: usize) -> usize {
        (h * self.sub_periods + m) * self.scenario_ids.len() + w
    }

    /// Realized capacity at `(h, m, w)`.
    ///
    /// Panics if any index is out of range.
    #[inline]
    pub fn value(&self, h: usize, m: usize, w: usize) -> f64 {
        self.values[self.index(h, m, w)]
    }

    /// All samples of period `h`, ordered `(m, w)` with `w` fastest.
    pub fn period_samples(&self, h: usize) -> &[f64] {
        let len = self.samples_per_period();
        &self.values[h * len..(h + 1) * len]
    }

    /// The sub-period trace of scenario column `w` within period `h`.
    pub fn scenario_trace(&self, h: usize, w: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.sub_periods).map(move |m| self.value(h, m, w))
    }

    /// Period samples sorted ascending.
    pub fn sorted_period_samples(&self, h: usize) -> Vec<f64> {
        let mut samples = self.period_samples(h).to_vec();
        samples.sort_by(|a, b| a.total_cmp(b));
        samples
    }

    /// Smallest sample of period `h`.
    pub fn period_min(&self, h: usize) -> f64 {
        self.period_samples(h)
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Largest sample of period `h`.
    pub fn period_max(&self, h: usize) -> f64 {
        self.period_samples(h)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest within-period spread `max - min` over the given periods.
    ///
    /// This is the widest gap a sensible bid (never above the period maximum)
    /// can open against any sample, and thus the smallest sound big-M constant.
    pub fn value_range(&self, periods: &[usize]) -> f64 {
        periods
            .iter()
            .map(|&h| self.period_max(h) - self.period_min(h))
            .fold(0.0, f64::max)
    }

    /// Error unless `h` names a period of this set.
    pub fn check_period(&self, h: usize) -> ScenarioResult<()> {
        if h >= self.periods {
            return Err(ScenarioError::PeriodOutOfRange {
                period: h,
                periods: self.periods,
            });
        }
        Ok(())
    }

    /// Dense column of a scenario id.
    pub fn column_of(&self, id: ScenarioId) -> Option<usize> {
        self.scenario_ids.iter().position(|s| *s == id)
    }

    /// Cut out the given scenarios (in the given order) as a new set.
    pub fn select(&self, ids: &[ScenarioId]) -> ScenarioResult<ScenarioSet> {
        if ids.is_empty() {
            return Err(ScenarioError::EmptyAxis { axis: "scenarios" });
        }
        let columns = ids
            .iter()
            .map(|id| self.column_of(*id).ok_or(ScenarioError::UnknownScenario(*id)))
            .collect::<ScenarioResult<Vec<_>>>()?;

        let mut values = Vec::with_capacity(self.periods * self.sub_periods * columns.len());
        for h in 0..self.periods {
            for m in 0..self.sub_periods {
                for &w in &columns {
                    values.push(self.value(h, m, w));
                }
            }
        }
        let set = ScenarioSet {
            periods: self.periods,
            sub_periods: self.sub_periods,
            scenario_ids: ids.to_vec(),
            values,
        };
        set.validate()?;
        Ok(set)
    }

    /// Split into `(in_sample, out_of_sample)` according to a partition.
    pub fn split(&self, partition: &ScenarioPartition) -> ScenarioResult<(ScenarioSet, ScenarioSet)> {
        let in_sample = self.select(partition.in_sample())?;
        let out_of_sample = self.select(partition.out_of_sample())?;
        Ok((in_sample, out_of_sample))
    }

    /// Ids present in both sets.
    pub fn shared_scenarios(&self, other: &ScenarioSet) -> Vec<ScenarioId> {
        self.scenario_ids
            .iter()
            .filter(|id| other.scenario_ids.contains(id))
            .copied()
            .collect()
    }
}

/// Reject empty axes and return the table length `periods * sub_periods * scenarios`.
fn check_axes(periods: usize, sub_periods: usize, scenarios: usize) -> ScenarioResult<usize> {
    if periods == 0 {
        return Err(ScenarioError::EmptyAxis { axis: "periods" });
    }
    if sub_periods == 0 {
        return Err(ScenarioError::EmptyAxis { axis: "sub-periods" });
    }
    if scenarios == 0 {
        return Err(ScenarioError::EmptyAxis { axis: "scenarios" });
    }
    periods
        .checked_mul(sub_periods)
        .and_then(|n| n.checked_mul(scenarios))
        .ok_or(ScenarioError::AxisOverflow {
            periods,
            sub_periods,
            scenarios,
        })
}
