//! Chance-Constrained Capacity Bidding
//!
//! A flexible asset offers a capacity `bid[h]` for each period. The bid must be
//! deliverable from the realized capacity in at least `1 - ε` of the sampled
//! `(sub-period, scenario)` observations of that period.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SAMPLED CHANCE CONSTRAINT                                               │
//! │  ─────────────────────────                                               │
//! │                                                                          │
//! │  max  Σ_h bid[h]                                                         │
//! │  s.t. #{ (m, w) : bid[h] > s[h,m,w] } ≤ ε · |M| · |W|     for every h    │
//! │       bid[h] ≥ 0                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Methods
//!
//! | Method | Type | Module |
//! |--------|------|--------|
//! | Big-M MILP | binary indicators, exact | [`bigm`] |
//! | ALSO-X | bisection over relaxed LPs | [`alsox`] |
//! | Per-period exact | one small MILP per period | [`exact`] |
//! | CVaR | single conservative LP | [`cvar`] |
//!
//! ## Big-M Linking
//!
//! ```text
//! bid[h] - s[h,m,w] ≤ M · z[h,m,w]
//! Σ_{m,w} z[h,m,w]  ≤ q[h]
//! ```
//!
//! With `z = 0` the sample must cover the bid; with `z = 1` the row is slack as
//! long as `M` is at least the widest gap a sensible bid can open, i.e. the
//! largest `max - min` spread of a period.
//!
//! ## Verification
//!
//! Bids are computed on in-sample scenarios and checked on a disjoint
//! out-of-sample set by [`OutOfSampleVerifier`].
//!
//! ## References
//!
//! - **Jiang & Xie (2022)**: "ALSO-X and ALSO-X+: Better convex approximations
//!   for chance constrained programs"
//! - **Rockafellar & Uryasev (2000)**: "Optimization of conditional
//!   value-at-risk"

pub mod alsox;
pub mod bigm;
pub mod compare;
pub mod cvar;
pub mod exact;
pub mod types;
pub mod verify;

pub use alsox::{AlsoXConfig, AlsoXSolution, AlsoXSolver, BisectionStep};
pub use bigm::{derive_big_m, BigMModel, BigMSolution, ChanceConstraintFormulator};
pub use compare::{compare_bids, sweep_epsilon, BidComparison, SweepRow};
pub use cvar::{conditional_value_at_risk, CvarFormulator, CvarModel, CvarSolution};
pub use exact::{ExactSolution, PerPeriodSolver, PeriodBid};
pub use types::{is_violated, realized_violations, BidSchedule, Convergence, NumericalWarning};
pub use verify::{OutOfSampleVerifier, PeriodReliability, ReliabilityReport};
