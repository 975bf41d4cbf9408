use super::raw_cells;
use nalgebra::point;
use poisson_amr::connectivity::{EdgeKey, Tri3d2Connectivity};
use poisson_amr::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use poisson_amr::mesh::refinement::{refine_marked, BisectionBuilder};
use poisson_amr::mesh::TriangleMesh2d;
use poisson_amr::proptest::{bisected_unit_square_mesh, mesh_with_marked_cells, unit_square_mesh};
use proptest::prelude::*;
use util::{assert_panics, find_hanging_nodes_brute_force};

fn single_triangle(vertices: [[f64; 2]; 3], conn: [usize; 3]) -> TriangleMesh2d<f64> {
    let vertices = vertices.iter().map(|&[x, y]| point![x, y]).collect();
    TriangleMesh2d::from_vertices_and_connectivity(vertices, vec![Tri3d2Connectivity(conn)])
}

fn on_unit_square_boundary(x: f64, y: f64) -> bool {
    x == 0.0 || x == 1.0 || y == 0.0 || y == 1.0
}

#[test]
fn bisect_single_right_triangle() {
    let mesh = single_triangle([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], [0, 1, 2]);
    let refined = refine_marked(&mesh, &[0]).unwrap();

    assert_eq!(refined.num_vertices(), 4);
    assert_eq!(refined.vertices()[3], point![0.5, 0.5]);
    assert_eq!(refined.boundary_mask(), &[true; 4]);
    assert_eq!(raw_cells(&refined), vec![[1, 3, 0], [3, 2, 0]]);
    assert_eq!(refined.cell_areas(), vec![0.25, 0.25]);
}

#[test]
fn bisect_propagates_to_neighbor_sharing_longest_edge() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    let refined = refine_marked(&mesh, &[0]).unwrap();

    assert_eq!(refined.num_vertices(), 5);
    assert_eq!(refined.num_cells(), 4);
    assert_eq!(refined.vertices()[4], point![0.5, 0.5]);
    assert!(!refined.is_boundary_vertex(4));
    assert_eq!(raw_cells(&refined), vec![[2, 4, 0], [4, 1, 0], [1, 4, 3], [4, 2, 3]]);
    assert!(refined.validate().is_ok());
    assert!(refined.check_conformity().is_ok());
    assert_eq!(refined.cell_areas(), vec![0.25; 4]);
}

#[test]
fn empty_marked_set_returns_unchanged_mesh() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3, 2);
    let refined = refine_marked(&mesh, &[]).unwrap();
    assert_eq!(refined, mesh);
}

#[test]
fn duplicate_marks_are_bisected_once() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    let once = refine_marked(&mesh, &[0]).unwrap();
    let twice = refine_marked(&mesh, &[0, 0]).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn refinement_is_deterministic() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(4, 4);
    let marked = [5, 17, 2, 30];
    let a = refine_marked(&mesh, &marked).unwrap();
    let b = refine_marked(&mesh, &marked).unwrap();
    assert_eq!(a, b);
}

#[test]
fn refine_marked_panics_on_out_of_bounds_index() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    assert_panics!(refine_marked(&mesh, &[2]));
}

#[test]
fn longest_edge_ties_are_broken_by_edge_key() {
    // Edges (1, 2) and (0, 2) have the same length
    let vertices = [[0.0, 0.0], [2.0, 0.0], [1.0, 3.0]];
    for conn in [[0, 1, 2], [1, 2, 0], [2, 0, 1]] {
        let mesh = single_triangle(vertices, conn);
        let mut builder = BisectionBuilder::from_mesh(&mesh).unwrap();
        let bisection = builder.bisect(0).unwrap();
        assert_eq!(bisection.edge, EdgeKey::new(0, 2));
        assert_eq!(bisection.midpoint, 3);
        assert_eq!(builder.vertices()[3], point![0.5, 1.5]);
    }
}

#[test]
fn builder_memoizes_edge_midpoints() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    let mut builder = BisectionBuilder::from_mesh(&mesh).unwrap();
    let edge = EdgeKey::new(1, 2);
    let m = builder.edge_midpoint(edge);
    assert_eq!(m, 4);
    assert_eq!(builder.edge_midpoint(edge), m);
    assert_eq!(builder.vertices().len(), 5);

    // Both triangles now have a split edge and are bisected along it
    assert_eq!(builder.split_edge(0), Some(edge));
    assert_eq!(builder.split_edge(1), Some(edge));
    let first = builder.bisect(0).unwrap();
    let second = builder.bisect(1).unwrap();
    assert_eq!(first.midpoint, m);
    assert_eq!(second.midpoint, m);
    assert_eq!(builder.num_bisections(), 2);
    assert_eq!(builder.num_arena_cells(), 6);
    assert_eq!(builder.num_active_cells(), 4);
    assert!(!builder.is_active(0));
    assert!(builder.is_active(5));

    // Retired triangles are not bisected again
    assert!(builder.bisect(0).is_none());
}

#[test]
fn finish_rejects_hanging_nodes() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1, 1);
    let mut builder = BisectionBuilder::from_mesh(&mesh).unwrap();
    builder.bisect(0).unwrap();
    let err = builder.finish().unwrap_err();
    assert_eq!(
        err,
        poisson_amr::mesh::MeshError::HangingNode {
            cell_index: 1,
            edge: EdgeKey::new(1, 2)
        }
    );
}

#[test]
fn repeated_refinement_of_corner_grades_mesh() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2, 2);
    for _ in 0..6 {
        // Always refine the triangle touching the origin
        let corner = mesh
            .connectivity()
            .iter()
            .position(|conn| conn.contains(&0))
            .unwrap();
        mesh = refine_marked(&mesh, &[corner]).unwrap();
        assert!(mesh.check_conformity().is_ok());
        assert!(find_hanging_nodes_brute_force(mesh.vertices(), &raw_cells(&mesh)).is_empty());
    }
    assert!((mesh.total_area() - 1.0).abs() < 1e-12);
    let min_area = mesh.cell_areas().into_iter().fold(f64::INFINITY, f64::min);
    assert!(min_area < 0.125 / 4.0);
    crate::export_mesh_vtk("bisection", "graded_corner", &mesh);
}

fn check_refinement(mesh: &TriangleMesh2d<f64>, marked: &[usize]) -> Result<(), TestCaseError> {
    let refined = refine_marked(mesh, marked).unwrap();

    prop_assert!(refined.validate().is_ok());
    prop_assert!(refined.check_conformity().is_ok());
    prop_assert!(find_hanging_nodes_brute_force(refined.vertices(), &raw_cells(&refined)).is_empty());
    prop_assert!((refined.total_area() - mesh.total_area()).abs() < 1e-12);

    // Coarse vertices keep their indices and classification
    let n = mesh.num_vertices();
    prop_assert_eq!(&refined.vertices()[..n], mesh.vertices());
    prop_assert_eq!(&refined.boundary_mask()[..n], mesh.boundary_mask());

    // Marked triangles no longer exist
    for &idx in marked {
        prop_assert!(!refined.connectivity().contains(&mesh.connectivity()[idx]));
    }
    if marked.is_empty() {
        prop_assert_eq!(&refined, mesh);
    } else {
        prop_assert!(refined.num_cells() > mesh.num_cells());
    }

    // Topological boundary classification of midpoints agrees with the geometry
    for (v, &is_boundary) in refined.vertices().iter().zip(refined.boundary_mask()) {
        prop_assert_eq!(is_boundary, on_unit_square_boundary(v.x, v.y));
    }
    Ok(())
}

proptest! {
    #[test]
    fn bisection_of_uniform_meshes((mesh, marked) in mesh_with_marked_cells(unit_square_mesh(5))) {
        check_refinement(&mesh, &marked)?;
    }

    #[test]
    fn bisection_of_graded_meshes((mesh, marked) in mesh_with_marked_cells(bisected_unit_square_mesh(3, 4))) {
        check_refinement(&mesh, &marked)?;
    }
}
