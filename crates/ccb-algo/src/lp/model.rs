//! Solver-neutral linear model.
//!
//! Formulations describe their program as a [`LinearModel`]; backends translate
//! it into whatever their solver library wants. Because the model is plain data,
//! right-hand sides and bounds can be changed between solves without rebuilding
//! anything.

use std::time::Duration;

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle to a model row (linear constraint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(usize);

impl RowId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    /// `{0, 1}`; relaxed to `[0, 1]` by [`LinearModel::relax_integrality`].
    Binary,
}

/// Variable definition. Infinite bounds mean "unbounded on that side".
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// Row comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    Le,
    Ge,
    Eq,
}

/// `Σ coef · var  (sense)  rhs`
#[derive(Debug, Clone)]
pub struct Row {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Maximise,
    Minimise,
}

/// A linear (or mixed-binary linear) program.
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    sense: ObjectiveSense,
    vars: Vec<VarDef>,
    rows: Vec<Row>,
    objective: Vec<(VarId, f64)>,
}

impl LinearModel {
    pub fn new(name: impl Into<String>, sense: ObjectiveSense) -> Self {
        Self {
            name: name.into(),
            sense,
            vars: Vec::new(),
            rows: Vec::new(),
            objective: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Add a continuous variable with the given bounds.
    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_var(VarDef {
            name: name.into(),
            lower,
            upper,
            kind: VarKind::Continuous,
        })
    }

    /// Add a `{0, 1}` variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(VarDef {
            name: name.into(),
            lower: 0.0,
            upper: 1.0,
            kind: VarKind::Binary,
        })
    }

    fn push_var(&mut self, def: VarDef) -> VarId {
        self.vars.push(def);
        VarId(self.vars.len() - 1)
    }

    /// Add a row and return its handle.
    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        sense: RowSense,
        rhs: f64,
    ) -> RowId {
        self.rows.push(Row {
            name: name.into(),
            terms,
            sense,
            rhs,
        });
        RowId(self.rows.len() - 1)
    }

    /// Add `coef · var` to the objective.
    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        self.objective.push((var, coef));
    }

    /// Replace the right-hand side of a row.
    pub fn set_rhs(&mut self, row: RowId, rhs: f64) {
        self.rows[row.0].rhs = rhs;
    }

    pub fn rhs(&self, row: RowId) -> f64 {
        self.rows[row.0].rhs
    }

    /// Replace the bounds of a variable.
    pub fn set_bounds(&mut self, var: VarId, lower: f64, upper: f64) {
        let def = &mut self.vars[var.0];
        def.lower = lower;
        def.upper = upper;
    }

    /// Turn every binary into a continuous `[0, 1]` variable.
    pub fn relax_integrality(&mut self) {
        for def in &mut self.vars {
            if def.kind == VarKind::Binary {
                def.kind = VarKind::Continuous;
                def.lower = def.lower.max(0.0);
                def.upper = def.upper.min(1.0);
            }
        }
    }

    /// Whether any variable is still integral.
    pub fn is_mixed_integer(&self) -> bool {
        self.vars.iter().any(|v| v.kind == VarKind::Binary)
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.vars[id.0]
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Evaluate the objective at a point.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|(var, coef)| coef * values[var.0])
            .sum()
    }

    /// Largest row violation at a point (0 when feasible).
    pub fn max_row_violation(&self, values: &[f64]) -> f64 {
        self.rows
            .iter()
            .map(|row| {
                let lhs: f64 = row.terms.iter().map(|(v, c)| c * values[v.0]).sum();
                match row.sense {
                    RowSense::Le => (lhs - row.rhs).max(0.0),
                    RowSense::Ge => (row.rhs - lhs).max(0.0),
                    RowSense::Eq => (lhs - row.rhs).abs(),
                }
            })
            .fold(0.0, f64::max)
    }
}

/// Primal solution read back from a backend.
#[derive(Debug, Clone)]
pub struct LpSolution {
    values: Vec<f64>,
    /// Objective value at `values`.
    pub objective: f64,
    /// Backend wall-clock time.
    pub solve_time: Duration,
}

impl LpSolution {
    pub fn new(values: Vec<f64>, objective: f64, solve_time: Duration) -> Self {
        Self {
            values,
            objective,
            solve_time,
        }
    }

    #[inline]
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
