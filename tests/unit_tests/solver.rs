use matrixcompare::assert_matrix_eq;
use nalgebra::{dvector, DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use poisson_amr::solver::cg::{
    ConjugateGradient, DiagonalOperator, IdentityOperator, RelativeResidualCriterion, SolveErrorKind,
};
use poisson_amr::solver::{ConjugateGradientSolver, LinearSolver, SolverConfig};

fn laplacian_1d(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            2.0
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    })
}

#[test]
fn solver_config_defaults() {
    let config = SolverConfig::default();
    assert_eq!(config.tolerance, 1e-10);
    assert_eq!(config.max_iterations, 1000);
    assert!(!config.jacobi);
    assert_eq!(ConjugateGradientSolver::default().config(), &config);
}

#[test]
fn cg_solves_spd_system() {
    let dense = laplacian_1d(20);
    let a = CsrMatrix::from(&dense);
    let b = DVector::from_fn(20, |i, _| (i as f64).sin() + 1.0);
    let expected = dense.clone().lu().solve(&b).unwrap();

    for jacobi in [false, true] {
        let solver = ConjugateGradientSolver::new(SolverConfig {
            tolerance: 1e-12,
            jacobi,
            ..SolverConfig::default()
        });
        let outcome = solver.solve(&a, &b).unwrap();
        assert!(outcome.converged);
        // At most n steps in exact arithmetic, plus some slack for rounding
        assert!(outcome.iterations <= 40);
        assert_matrix_eq!(outcome.solution, expected, comp = abs, tol = 1e-9);
    }
}

#[test]
fn cg_reports_non_convergence_with_last_iterate() {
    let a = CsrMatrix::from(&laplacian_1d(10));
    let b = DVector::repeat(10, 1.0);
    let solver = ConjugateGradientSolver::new(SolverConfig {
        max_iterations: 1,
        ..SolverConfig::default()
    });
    let outcome = solver.solve(&a, &b).unwrap();
    assert!(!outcome.converged);
    assert_eq!(outcome.iterations, 1);
    // One step of CG from zero is a multiple of b
    assert!(outcome.solution.iter().all(|&x_i| x_i > 0.0));
}

#[test]
fn cg_returns_zero_for_zero_rhs() {
    let a = CsrMatrix::from(&laplacian_1d(5));
    let b = DVector::zeros(5);
    let outcome = ConjugateGradientSolver::default().solve(&a, &b).unwrap();
    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.solution, DVector::zeros(5));
}

#[test]
fn jacobi_solves_diagonal_system_in_one_iteration() {
    let dense = DMatrix::from_diagonal(&dvector![1.0, 100.0, 1.0e4]);
    let a = CsrMatrix::from(&dense);
    let b = dvector![1.0, 1.0, 1.0];

    let jacobi = DiagonalOperator::jacobi(&a);
    assert_eq!(jacobi.diagonal(), &dvector![1.0, 1.0e-2, 1.0e-4]);

    let solver = ConjugateGradientSolver::new(SolverConfig {
        jacobi: true,
        ..SolverConfig::default()
    });
    let outcome = solver.solve(&a, &b).unwrap();
    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 1);
    assert_matrix_eq!(outcome.solution, dvector![1.0, 1.0e-2, 1.0e-4], comp = abs, tol = 1e-14);
}

#[test]
fn cg_detects_indefinite_operator() {
    let a = CsrMatrix::from(&DMatrix::from_diagonal(&dvector![1.0, -1.0]));
    let b = dvector![1.0, 1.0];
    let err = ConjugateGradientSolver::default().solve(&a, &b).unwrap_err();
    assert!(matches!(err.kind, SolveErrorKind::IndefiniteOperator));
    assert_eq!(err.output.num_iterations, 0);
}

#[test]
fn cg_with_initial_guess() {
    let dense = laplacian_1d(8);
    let a = CsrMatrix::from(&dense);
    let b = DVector::repeat(8, 1.0);
    let expected = dense.lu().solve(&b).unwrap();

    // Starting from the solution requires no iterations
    let mut x = expected.clone();
    let output = ConjugateGradient::new()
        .with_operator(&a)
        .with_preconditioner(IdentityOperator)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-10))
        .solve_with_guess(&b, &mut x)
        .unwrap();
    assert_eq!(output.num_iterations, 0);
    assert_eq!(x, expected);

    let mut x = DVector::repeat(8, 3.0);
    ConjugateGradient::new()
        .with_operator(&a)
        .with_preconditioner(IdentityOperator)
        .with_stopping_criterion(RelativeResidualCriterion::new(1e-12))
        .with_max_iter(100)
        .solve_with_guess(&b, &mut x)
        .unwrap();
    assert_matrix_eq!(x, expected, comp = abs, tol = 1e-9);
}

#[test]
fn solver_config_deserializes_partially() {
    let config: SolverConfig = serde_json::from_str(r#"{ "jacobi": true }"#).unwrap();
    assert_eq!(
        config,
        SolverConfig {
            jacobi: true,
            ..SolverConfig::default()
        }
    );
}
