//! Linear solvers for the assembled system.
use crate::solver::cg::{
    CgOutput, ConjugateGradient, DiagonalOperator, IdentityOperator, RelativeResidualCriterion, SolveErrorKind,
};
use crate::Real;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

pub mod cg;

pub use cg::SolveError;

/// The result of a linear solve.
///
/// A solve that stops at the iteration limit is not an error: `converged` is `false` and
/// `solution` holds the last iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome<T: Real> {
    pub solution: DVector<T>,
    pub converged: bool,
    pub iterations: usize,
}

/// A solver for sparse linear systems `A x = b`.
pub trait LinearSolver<T: Real> {
    fn solve(&self, a: &CsrMatrix<T>, b: &DVector<T>) -> Result<SolveOutcome<T>, SolveError>;
}

impl<T, S> LinearSolver<T> for &S
where
    T: Real,
    S: ?Sized + LinearSolver<T>,
{
    fn solve(&self, a: &CsrMatrix<T>, b: &DVector<T>) -> Result<SolveOutcome<T>, SolveError> {
        S::solve(self, a, b)
    }
}

/// Tolerance and iteration limit of the iterative solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative residual tolerance `||r|| <= tolerance * ||b||`.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Whether to apply the Jacobi (diagonal) preconditioner.
    pub jacobi: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
            jacobi: false,
        }
    }
}

/// Conjugate gradient for symmetric positive definite systems, starting from a zero guess.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConjugateGradientSolver {
    config: SolverConfig,
}

impl ConjugateGradientSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<T: Real> LinearSolver<T> for ConjugateGradientSolver {
    fn solve(&self, a: &CsrMatrix<T>, b: &DVector<T>) -> Result<SolveOutcome<T>, SolveError> {
        assert_eq!(a.nrows(), b.len(), "Matrix and right-hand side dimensions must agree.");
        let tolerance = T::from_f64(self.config.tolerance).unwrap_or_else(T::default_epsilon);
        let criterion = RelativeResidualCriterion::new(tolerance);
        let mut x = DVector::zeros(b.len());

        let result = if self.config.jacobi {
            ConjugateGradient::new()
                .with_operator(a)
                .with_preconditioner(DiagonalOperator::jacobi(a))
                .with_stopping_criterion(criterion)
                .with_max_iter(self.config.max_iterations)
                .solve_with_guess(b, &mut x)
        } else {
            ConjugateGradient::new()
                .with_operator(a)
                .with_preconditioner(IdentityOperator)
                .with_stopping_criterion(criterion)
                .with_max_iter(self.config.max_iterations)
                .solve_with_guess(b, &mut x)
        };

        match result {
            Ok(CgOutput { num_iterations }) => Ok(SolveOutcome {
                solution: x,
                converged: true,
                iterations: num_iterations,
            }),
            Err(SolveError {
                output,
                kind: SolveErrorKind::MaxIterationsReached { .. },
            }) => Ok(SolveOutcome {
                solution: x,
                converged: false,
                iterations: output.num_iterations,
            }),
            Err(err) => Err(err),
        }
    }
}
