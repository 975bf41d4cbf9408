//! Strategies for property-based testing.
use crate::element::Tri3d2Element;
use crate::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use crate::mesh::refinement::refine_marked;
use crate::mesh::TriangleMesh2d;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use ::proptest::sample::subsequence;
use nalgebra::Point2;

pub fn point2() -> impl Strategy<Value = Point2<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range].prop_map(|[x, y]| Point2::new(x, y))
}

impl Arbitrary for Tri3d2Element<f64> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    /// Counter-clockwise triangles that are not too close to degenerate.
    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        [point2(), point2(), point2()]
            .prop_map(|[a, b, c]| {
                let element = Tri3d2Element::from_vertices([a, b, c]);
                if element.signed_area() < 0.0 {
                    Tri3d2Element::from_vertices([a, c, b])
                } else {
                    element
                }
            })
            .prop_filter("Triangle must not be degenerate", |element| {
                element.area() > 1e-2 * element.diameter().powi(2)
            })
            .boxed()
    }
}

/// Uniform unit-square meshes with between 1 and `max_cells_per_dim` cells in each direction.
pub fn unit_square_mesh(max_cells_per_dim: usize) -> impl Strategy<Value = TriangleMesh2d<f64>> {
    (1..=max_cells_per_dim, 1..=max_cells_per_dim).prop_map(|(nx, ny)| create_unit_square_uniform_tri_mesh_2d(nx, ny))
}

/// A mesh together with a (possibly empty) subset of its triangle indices, in random order.
pub fn mesh_with_marked_cells(
    mesh_strategy: impl Strategy<Value = TriangleMesh2d<f64>>,
) -> impl Strategy<Value = (TriangleMesh2d<f64>, Vec<usize>)> {
    mesh_strategy.prop_flat_map(|mesh| {
        let indices: Vec<_> = (0..mesh.num_cells()).collect();
        let num_cells = indices.len();
        let marked = subsequence(indices, 0..=num_cells).prop_shuffle();
        (Just(mesh), marked)
    })
}

/// Unit-square meshes obtained by up to `max_passes` bisection passes on random subsets.
///
/// These exercise refinement on meshes that are already graded, with triangles of many
/// different shapes and sizes.
pub fn bisected_unit_square_mesh(
    max_cells_per_dim: usize,
    max_passes: usize,
) -> impl Strategy<Value = TriangleMesh2d<f64>> {
    let pass_selections = vec(vec(any::<prop::sample::Index>(), 1..4), 0..=max_passes);
    (unit_square_mesh(max_cells_per_dim), pass_selections).prop_map(|(mut mesh, passes)| {
        for selection in passes {
            let marked: Vec<_> = selection
                .iter()
                .map(|index| index.index(mesh.num_cells()))
                .collect();
            mesh = refine_marked(&mesh, &marked).expect("Refinement of a valid mesh must succeed");
        }
        mesh
    })
}
