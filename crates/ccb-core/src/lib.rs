//! # ccb-core: Scenario Data for Capacity Bidding
//!
//! Provides the data structures shared by every part of the chance-constrained
//! capacity bidding engine.
//!
//! ## Index Sets
//!
//! A bidding problem is laid out on three dense axes:
//!
//! | Axis | Symbol | Example |
//! |------|--------|---------|
//! | Period | `h` | hours of the delivery day |
//! | Sub-period | `m` | minutes within the hour |
//! | Scenario | `w` | one realized consumption / production trace |
//!
//! The reliability requirement of period `h` is evaluated over all its
//! `(m, w)` pairs.
//!
//! ## Core Data Structures
//!
//! - [`ScenarioSet`] - immutable `(h, m, w)` capacity table
//! - [`ScenarioPartition`] - disjoint in-sample / out-of-sample ids
//! - [`ReliabilityTarget`] - validated `ε` with integer budget rounding
//! - [`BiddingConfig`] - run settings, stored as TOML
//!
//! ```rust
//! use ccb_core::{ReliabilityTarget, ScenarioPartition, ScenarioSet};
//!
//! let set = ScenarioSet::from_fn(1, 3, 4, |_, m, w| 100.0 + (m * 4 + w) as f64).unwrap();
//! let partition = ScenarioPartition::split_first(4, 3).unwrap();
//! let (in_sample, out_of_sample) = set.split(&partition).unwrap();
//!
//! assert_eq!(in_sample.samples_per_period(), 9);
//! assert_eq!(out_of_sample.scenario_count(), 1);
//! assert_eq!(ReliabilityTarget::new(0.25).unwrap().violation_budget(12), 3);
//! ```

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod partition;
pub mod scenario;
pub mod target;

pub use config::{BiddingConfig, BudgetScope, SolverChoice};
pub use error::{ScenarioError, ScenarioResult};
pub use partition::ScenarioPartition;
pub use scenario::ScenarioSet;
pub use target::ReliabilityTarget;

/// Original identifier of a scenario trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(usize);

/// Dense period index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodId(usize);

impl ScenarioId {
    #[inline]
    pub fn new(value: usize) -> Self {
        ScenarioId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl PeriodId {
    #[inline]
    pub fn new(value: usize) -> Self {
        PeriodId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}
