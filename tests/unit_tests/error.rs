use matrixcompare::assert_scalar_eq;
use nalgebra::{dvector, point, vector, DVector, Point2, Vector2};
use poisson_amr::connectivity::Tri3d2Connectivity;
use poisson_amr::error::{
    compute_element_gradients, estimate_L2_error, estimate_error_indicators, global_error_estimate, max_nodal_error,
    recover_nodal_gradients,
};
use poisson_amr::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use poisson_amr::mesh::TriangleMesh2d;
use poisson_amr::proptest::bisected_unit_square_mesh;
use proptest::collection::vec;
use proptest::prelude::*;

fn interpolate(mesh: &TriangleMesh2d<f64>, u: impl Fn(&Point2<f64>) -> f64) -> DVector<f64> {
    DVector::from_iterator(mesh.num_vertices(), mesh.vertices().iter().map(u))
}

#[test]
fn linear_solution_has_zero_indicators() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(4, 4);
    let u_h = interpolate(&mesh, |x| 2.0 * x.x - 3.0 * x.y + 1.0);

    let (gradients, areas) = compute_element_gradients(&mesh, &u_h).unwrap();
    assert_eq!(gradients.len(), mesh.num_cells());
    assert_eq!(areas, mesh.cell_areas());
    for gradient in &gradients {
        assert!((gradient - vector![2.0, -3.0]).norm() < 1e-12);
    }

    let indicators = estimate_error_indicators(&mesh, &u_h).unwrap();
    assert_eq!(indicators.len(), mesh.num_cells());
    assert!(indicators.iter().all(|&eta| eta >= 0.0 && eta < 1e-24));
}

#[test]
fn indicators_for_single_hat_function() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    // The basis function of vertex (1, 1) is nonzero only on the second triangle
    let u_h = dvector![0.0, 0.0, 0.0, 1.0];

    let (gradients, _) = compute_element_gradients(&mesh, &u_h).unwrap();
    assert_eq!(gradients, vec![vector![0.0, 0.0], vector![1.0, 1.0]]);

    let indicators = estimate_error_indicators(&mesh, &u_h).unwrap();
    assert_scalar_eq!(indicators[0], 1.0 / 9.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(indicators[1], 1.0 / 9.0, comp = abs, tol = 1e-14);
}

#[test]
fn recovered_gradient_of_isolated_vertex_is_zero() {
    let vertices: Vec<Point2<f64>> = vec![point![0.0, 0.0], point![1.0, 0.0], point![0.0, 1.0], point![5.0, 5.0]];
    let mesh = TriangleMesh2d::from_vertices_and_connectivity(vertices, vec![Tri3d2Connectivity([0, 1, 2])]);
    let recovered = recover_nodal_gradients(&mesh, &[vector![1.0, 2.0]], &[0.5]);
    assert_eq!(
        recovered,
        vec![vector![1.0, 2.0], vector![1.0, 2.0], vector![1.0, 2.0], Vector2::zeros()]
    );
}

#[test]
fn global_estimate_is_root_of_indicator_sum() {
    assert_eq!(global_error_estimate(&[1.0, 4.0, 4.0]), 3.0);
    assert_eq!(global_error_estimate::<f64>(&[]), 0.0);
}

#[test]
fn nodal_error_of_interpolant() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3, 3);
    let u = |x: &Point2<f64>| x.x * x.y;
    let u_h = interpolate(&mesh, u);
    assert_eq!(max_nodal_error(&mesh, &u_h, u), 0.0);

    let shifted = u_h.add_scalar(0.25);
    assert_scalar_eq!(max_nodal_error(&mesh, &shifted, u), 0.25, comp = abs, tol = 1e-15);
}

#[test]
fn l2_error_is_exact_for_quadratic_differences() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3, 2);
    let zero = DVector::zeros(mesh.num_vertices());

    let constant_error = estimate_L2_error(&mesh, &zero, |_| 1.0).unwrap();
    assert_scalar_eq!(constant_error, 1.0, comp = abs, tol = 1e-14);

    // ∫ x² over the unit square is 1/3
    let quadratic_error = estimate_L2_error(&mesh, &zero, |x| x.x).unwrap();
    assert_scalar_eq!(quadratic_error, (1.0f64 / 3.0).sqrt(), comp = abs, tol = 1e-14);

    // Linear functions are represented exactly
    let linear = |x: &Point2<f64>| 1.0 + x.x - 0.5 * x.y;
    let u_h = interpolate(&mesh, linear);
    assert!(estimate_L2_error(&mesh, &u_h, linear).unwrap() < 1e-14);
}

#[test]
fn error_functions_panic_on_wrong_solution_length() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    let u_h = DVector::zeros(3);
    util::assert_panics!(estimate_error_indicators(&mesh, &u_h));
    util::assert_panics!(max_nodal_error(&mesh, &u_h, |_| 0.0));
}

fn mesh_and_solution() -> impl Strategy<Value = (TriangleMesh2d<f64>, DVector<f64>)> {
    bisected_unit_square_mesh(4, 3).prop_flat_map(|mesh| {
        let n = mesh.num_vertices();
        (Just(mesh), vec(-10.0..10.0, n).prop_map(DVector::from_vec))
    })
}

proptest! {
    #[test]
    fn indicators_are_non_negative((mesh, u_h) in mesh_and_solution()) {
        let indicators = estimate_error_indicators(&mesh, &u_h).unwrap();
        prop_assert_eq!(indicators.len(), mesh.num_cells());
        prop_assert!(indicators.iter().all(|&eta| eta >= 0.0));

        let total = global_error_estimate(&indicators);
        prop_assert!(total >= 0.0);
        prop_assert!(total.is_finite());
    }

    #[test]
    fn recovered_gradients_reproduce_linear_functions(mesh in bisected_unit_square_mesh(4, 3)) {
        let u_h = interpolate(&mesh, |x| 0.5 * x.x + 4.0 * x.y);
        let (gradients, areas) = compute_element_gradients(&mesh, &u_h).unwrap();
        for recovered in recover_nodal_gradients(&mesh, &gradients, &areas) {
            prop_assert!((recovered - vector![0.5, 4.0]).norm() < 1e-10);
        }
    }
}
