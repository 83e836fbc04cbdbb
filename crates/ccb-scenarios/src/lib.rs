//! Scenario preparation for chance-constrained bidding.
//!
//! Generates synthetic capacity traces and splits them into in-sample and
//! out-of-sample sets. Every random draw takes the RNG as an argument; a
//! [`ProfileSpec`] pins the seed for reproducible studies.

pub mod profile;
pub mod sampling;
pub mod spec;

pub use profile::RandomWalkProfile;
pub use sampling::random_partition;
pub use spec::{load_spec_from_path, save_spec_to_path, MaterializedScenarios, ProfileSpec};
