//! Solver-agnostic linear programming layer.
//!
//! Formulations build a [`LinearModel`] and hand it to an [`LpBackend`]:
//!
//! | Backend | Feature | Binaries |
//! |---------|---------|----------|
//! | [`MicrolpBackend`] | `solver-microlp` | yes |
//! | [`ClarabelBackend`] | `solver-clarabel` | no |
//! | [`HighsBackend`] | `solver-highs` | yes |

mod backend;
mod model;

#[cfg(feature = "solver-clarabel")]
pub use backend::ClarabelBackend;
#[cfg(feature = "solver-highs")]
pub use backend::HighsBackend;
#[cfg(feature = "solver-microlp")]
pub use backend::MicrolpBackend;
pub use backend::{backend_for, default_backend, LpBackend};
pub use model::{
    LinearModel, LpSolution, ObjectiveSense, Row, RowId, RowSense, VarDef, VarId, VarKind,
};

use thiserror::Error;

/// Errors raised by an LP backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LpError {
    #[error("Model '{model}' is infeasible")]
    Infeasible { model: String },

    #[error("Model '{model}' is unbounded")]
    Unbounded { model: String },

    #[error("Backend '{backend}' failed on model '{model}': {message}")]
    Backend {
        backend: &'static str,
        model: String,
        message: String,
    },

    #[error("Backend '{backend}' cannot solve models with binary variables")]
    IntegerUnsupported { backend: &'static str },

    #[error("Backend '{backend}' is not compiled in")]
    Unavailable { backend: &'static str },

    #[error("Backend returned non-finite values for model '{model}'")]
    NonFinite { model: String },
}
