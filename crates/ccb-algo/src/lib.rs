//! # ccb-algo: Chance-Constrained Capacity Bidding Algorithms
//!
//! This crate computes capacity bids that the realized capacity of a flexible
//! asset covers with a prescribed probability, and checks those bids on
//! held-out scenarios.
//!
//! ## Bidding Methods
//!
//! | Method | Entry point | Problem Class |
//! |--------|-------------|---------------|
//! | ALSO-X | [`AlsoXSolver`] | sequence of LPs |
//! | Per-period exact | [`PerPeriodSolver`] | small MILPs |
//! | CVaR surrogate | [`CvarFormulator`] | single LP |
//!
//! ### Architecture
//!
//! - **[`ChanceConstraintFormulator`]** builds the big-M model (what to solve)
//! - **[`lp::LpBackend`]** solves a [`lp::LinearModel`] (how to solve it)
//! - **[`OutOfSampleVerifier`]** checks a bid without solving anything
//!
//! Formulations never talk to a solver library directly, so backends can be
//! swapped through [`ccb_core::SolverChoice`].
//!
//! ## Example
//!
//! ```ignore
//! use ccb_algo::{lp, AlsoXConfig, AlsoXSolver, OutOfSampleVerifier};
//! use ccb_core::{BiddingConfig, ScenarioPartition};
//!
//! let config = BiddingConfig::load_from("bidding.toml".as_ref())?;
//! let backend = lp::backend_for(config.solver)?;
//! let (in_sample, out_of_sample) = scenarios.split(&partition)?;
//!
//! let solver = AlsoXSolver::new(backend.as_ref(), AlsoXConfig::from_bidding_config(&config)?);
//! let solution = solver.solve_all(&in_sample)?;
//!
//! let report = OutOfSampleVerifier::from_bidding_config(&config)?
//!     .verify_partitioned(&solution.bids, &in_sample, &out_of_sample)?;
//! println!("{} out-of-sample violations", report.total_violations);
//! ```

pub mod chance;
pub mod error;
pub mod lp;

pub use chance::{
    compare_bids, conditional_value_at_risk, derive_big_m, realized_violations, sweep_epsilon,
    AlsoXConfig, AlsoXSolution, AlsoXSolver, BidComparison, BidSchedule, BigMModel, BigMSolution,
    BisectionStep, ChanceConstraintFormulator, Convergence, CvarFormulator, CvarModel,
    CvarSolution, ExactSolution, NumericalWarning, OutOfSampleVerifier, PerPeriodSolver,
    PeriodBid, PeriodReliability, ReliabilityReport, SweepRow,
};
pub use error::{BiddingError, BiddingResult, SolveStage, SolverFailure};
pub use lp::LpError;
