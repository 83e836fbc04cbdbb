//! LP/MILP backends.
//!
//! Every backend translates a [`LinearModel`] into a `good_lp` problem and
//! reads the primal values back. Which backends exist depends on the enabled
//! `solver-*` features.

use ccb_core::SolverChoice;
#[cfg(any(
    feature = "solver-microlp",
    feature = "solver-clarabel",
    feature = "solver-highs"
))]
use good_lp::{
    constraint,
    solvers::{ResolutionError, Solver, SolverModel},
    variable, Expression, ProblemVariables, Solution, Variable,
};
#[cfg(any(
    feature = "solver-microlp",
    feature = "solver-clarabel",
    feature = "solver-highs"
))]
use web_time::Instant;

#[cfg(any(
    feature = "solver-microlp",
    feature = "solver-clarabel",
    feature = "solver-highs"
))]
use super::model::{ObjectiveSense, RowSense, VarKind};
use super::model::{LinearModel, LpSolution};
use super::LpError;

/// A solver that can handle a [`LinearModel`].
///
/// Implementations are stateless; one backend may solve many models, also
/// from several threads.
pub trait LpBackend: Send + Sync {
    /// Unique identifier (e.g. "microlp", "clarabel")
    fn id(&self) -> &'static str;

    /// Whether binary variables are honoured.
    fn supports_integers(&self) -> bool;

    /// Solve the model to optimality.
    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError>;
}

/// Pure-Rust dual simplex with branch-and-bound for binaries.
#[cfg(feature = "solver-microlp")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpBackend;

#[cfg(feature = "solver-microlp")]
impl LpBackend for MicrolpBackend {
    fn id(&self) -> &'static str {
        "microlp"
    }

    fn supports_integers(&self) -> bool {
        true
    }

    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError> {
        solve_with(self.id(), model, good_lp::solvers::microlp::microlp)
    }
}

/// Clarabel interior point. Continuous models only.
#[cfg(feature = "solver-clarabel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

#[cfg(feature = "solver-clarabel")]
impl LpBackend for ClarabelBackend {
    fn id(&self) -> &'static str {
        "clarabel"
    }

    fn supports_integers(&self) -> bool {
        false
    }

    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError> {
        if model.is_mixed_integer() {
            return Err(LpError::IntegerUnsupported { backend: self.id() });
        }
        solve_with(self.id(), model, good_lp::solvers::clarabel::clarabel)
    }
}

/// HiGHS (native library).
#[cfg(feature = "solver-highs")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsBackend;

#[cfg(feature = "solver-highs")]
impl LpBackend for HighsBackend {
    fn id(&self) -> &'static str {
        "highs"
    }

    fn supports_integers(&self) -> bool {
        true
    }

    fn solve(&self, model: &LinearModel) -> Result<LpSolution, LpError> {
        solve_with(self.id(), model, good_lp::solvers::highs::highs)
    }
}

/// Backend for a configured solver choice.
pub fn backend_for(choice: SolverChoice) -> Result<Box<dyn LpBackend>, LpError> {
    match choice {
        #[cfg(feature = "solver-microlp")]
        SolverChoice::Microlp => Ok(Box::new(MicrolpBackend)),
        #[cfg(feature = "solver-clarabel")]
        SolverChoice::Clarabel => Ok(Box::new(ClarabelBackend)),
        #[cfg(feature = "solver-highs")]
        SolverChoice::Highs => Ok(Box::new(HighsBackend)),
        #[allow(unreachable_patterns)]
        other => Err(LpError::Unavailable { backend: other.id() }),
    }
}

/// The first integer-capable backend compiled in, else any backend.
pub fn default_backend() -> Result<Box<dyn LpBackend>, LpError> {
    [SolverChoice::Microlp, SolverChoice::Highs, SolverChoice::Clarabel]
        .into_iter()
        .find_map(|choice| backend_for(choice).ok())
        .ok_or(LpError::Unavailable { backend: "any" })
}

#[cfg(any(
    feature = "solver-microlp",
    feature = "solver-clarabel",
    feature = "solver-highs"
))]
fn solve_with<S>(backend: &'static str, model: &LinearModel, solver: S) -> Result<LpSolution, LpError>
where
    S: Solver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let start = Instant::now();

    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .vars()
        .iter()
        .map(|def| {
            let mut var = variable().name(def.name.clone());
            if def.lower.is_finite() {
                var = var.min(def.lower);
            }
            if def.upper.is_finite() {
                var = var.max(def.upper);
            }
            if def.kind == VarKind::Binary {
                var = var.integer();
            }
            vars.add(var)
        })
        .collect();

    let mut objective = Expression::from(0.0);
    for (var, coef) in model.objective() {
        objective += *coef * handles[var.index()];
    }

    let unsolved = match model.sense() {
        ObjectiveSense::Maximise => vars.maximise(objective),
        ObjectiveSense::Minimise => vars.minimise(objective),
    };
    let mut problem = unsolved.using(solver);

    for row in model.rows() {
        let mut lhs = Expression::from(0.0);
        for (var, coef) in &row.terms {
            lhs += *coef * handles[var.index()];
        }
        let rhs = row.rhs;
        let c = match row.sense {
            RowSense::Le => constraint!(lhs <= rhs),
            RowSense::Ge => constraint!(lhs >= rhs),
            RowSense::Eq => constraint!(lhs == rhs),
        };
        problem.add_constraint(c);
    }

    let solution = problem.solve().map_err(|e| match e {
        ResolutionError::Infeasible => LpError::Infeasible {
            model: model.name().to_string(),
        },
        ResolutionError::Unbounded => LpError::Unbounded {
            model: model.name().to_string(),
        },
        other => LpError::Backend {
            backend,
            model: model.name().to_string(),
            message: other.to_string(),
        },
    })?;

    let values: Vec<f64> = handles.iter().map(|v| solution.value(*v)).collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(LpError::NonFinite {
            model: model.name().to_string(),
        });
    }

    let objective = model.objective_value(&values);
    Ok(LpSolution::new(values, objective, start.elapsed()))
}
