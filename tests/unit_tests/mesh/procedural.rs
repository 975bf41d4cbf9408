use nalgebra::{point, vector, Point2};
use poisson_amr::connectivity::Tri3d2Connectivity;
use poisson_amr::mesh::procedural::{
    create_rectangular_uniform_tri_mesh_2d, create_unit_square_uniform_tri_mesh_2d, is_on_rectangle_boundary,
};
use poisson_amr::proptest::unit_square_mesh;
use proptest::prelude::*;

#[test]
fn unit_square_single_cell() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    assert_eq!(
        mesh.vertices(),
        &[point![0.0, 0.0], point![0.0, 1.0], point![1.0, 0.0], point![1.0, 1.0]]
    );
    assert_eq!(
        mesh.connectivity(),
        &[Tri3d2Connectivity([0, 2, 1]), Tri3d2Connectivity([2, 3, 1])]
    );
    assert_eq!(mesh.boundary_mask(), &[true; 4]);
    assert_eq!(mesh.total_area(), 1.0);
    assert!(mesh.validate().is_ok());
}

#[test]
fn unit_square_counts_and_interior_vertices() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2, 3);
    assert_eq!(mesh.num_vertices(), 12);
    assert_eq!(mesh.num_cells(), 12);

    let interior: Vec<_> = (0..mesh.num_vertices())
        .filter(|&i| !mesh.is_boundary_vertex(i))
        .collect();
    // Vertex (i, j) has index i * (ny + 1) + j
    assert_eq!(interior, vec![5, 6]);
    assert_eq!(mesh.vertices()[5], point![0.5, 1.0 / 3.0]);
    assert_eq!(mesh.vertices()[11], point![1.0, 1.0]);

    // Topological and geometric boundary classification agree
    assert_eq!(mesh.find_boundary_vertices().len(), mesh.num_vertices() - 2);
}

#[test]
fn unit_square_is_deterministic() {
    let a = create_unit_square_uniform_tri_mesh_2d::<f64>(5, 4);
    let b = create_unit_square_uniform_tri_mesh_2d::<f64>(5, 4);
    assert_eq!(a, b);
}

#[test]
fn zero_subdivisions_give_empty_mesh() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(0, 3);
    assert_eq!(mesh.num_vertices(), 0);
    assert_eq!(mesh.num_cells(), 0);
}

#[test]
fn rectangular_mesh_with_offset() {
    let origin = point![-1.0f64, 2.0];
    let extents = vector![3.0f64, 0.5];
    let mesh = create_rectangular_uniform_tri_mesh_2d(&origin, &extents, 3, 2);
    assert_eq!(mesh.num_cells(), 12);
    assert!((mesh.total_area() - 1.5).abs() < 1e-14);
    assert_eq!(mesh.vertices().last(), Some(&point![2.0, 2.5]));
    assert!(mesh.validate().is_ok());
    assert!(mesh.check_conformity().is_ok());
    for (v, &is_boundary) in mesh.vertices().iter().zip(mesh.boundary_mask()) {
        assert_eq!(is_boundary, is_on_rectangle_boundary(v, &origin, &extents));
    }
}

proptest! {
    #[test]
    fn unit_square_meshes_are_valid_and_cover_unit_area(mesh in unit_square_mesh(8)) {
        prop_assert!(mesh.validate().is_ok());
        prop_assert!(mesh.check_conformity().is_ok());
        prop_assert!((mesh.total_area() - 1.0).abs() < 1e-12);

        let on_boundary = |v: &Point2<f64>| v.x == 0.0 || v.x == 1.0 || v.y == 0.0 || v.y == 1.0;
        for (v, &is_boundary) in mesh.vertices().iter().zip(mesh.boundary_mask()) {
            prop_assert_eq!(is_boundary, on_boundary(v));
        }
    }
}
