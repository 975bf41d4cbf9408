//! Basic procedural mesh generation routines.
use crate::connectivity::Tri3d2Connectivity;
use crate::mesh::TriangleMesh2d;
use crate::Real;
use nalgebra::{Point2, Vector2};

/// Absolute tolerance used to classify vertices as lying on the boundary of a rectangle.
pub const BOUNDARY_TOLERANCE: f64 = 1e-12;

/// Generates a uniform triangulation of the unit square `[0, 1]^2` with `nx` cells in the
/// x-direction and `ny` cells in the y-direction.
///
/// See [`create_rectangular_uniform_tri_mesh_2d`] for the vertex and triangle ordering.
pub fn create_unit_square_uniform_tri_mesh_2d<T>(nx: usize, ny: usize) -> TriangleMesh2d<T>
where
    T: Real,
{
    create_rectangular_uniform_tri_mesh_2d(&Point2::origin(), &Vector2::repeat(T::one()), nx, ny)
}

/// Generates an axis-aligned rectangular uniform triangle mesh with the given lower-left
/// corner and extents.
///
/// The grid vertex `(i, j)` at `origin + (i * hx, j * hy)` has index `i * (ny + 1) + j`.
/// Each grid cell with corners `v00, v10, v01, v11` is split along the `v10 - v01` diagonal into
/// the counter-clockwise triangles `[v00, v10, v01]` and `[v10, v11, v01]`, cell by cell in the
/// same `(i, j)` order as the vertices.
///
/// Vertices whose coordinates coincide with the sides of the rectangle (within
/// [`BOUNDARY_TOLERANCE`]) are classified as boundary vertices. If either `nx` or `ny` is zero,
/// the mesh is empty.
pub fn create_rectangular_uniform_tri_mesh_2d<T>(
    origin: &Point2<T>,
    extents: &Vector2<T>,
    nx: usize,
    ny: usize,
) -> TriangleMesh2d<T>
where
    T: Real,
{
    if nx == 0 || ny == 0 {
        return TriangleMesh2d::from_parts(Vec::new(), Vec::new(), Vec::new());
    }

    let to_t = |n: usize| T::from_usize(n).expect("Must be able to fit usize in T");
    let hx = extents.x / to_t(nx);
    let hy = extents.y / to_t(ny);
    let to_global_vertex_index = |i: usize, j: usize| i * (ny + 1) + j;

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for i in 0..=nx {
        for j in 0..=ny {
            // Snap the last row/column exactly onto the far sides of the rectangle
            let x = if i == nx { origin.x + extents.x } else { origin.x + to_t(i) * hx };
            let y = if j == ny { origin.y + extents.y } else { origin.y + to_t(j) * hy };
            vertices.push(Point2::new(x, y));
        }
    }

    let mut cells = Vec::with_capacity(2 * nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            let v00 = to_global_vertex_index(i, j);
            let v10 = to_global_vertex_index(i + 1, j);
            let v01 = to_global_vertex_index(i, j + 1);
            let v11 = to_global_vertex_index(i + 1, j + 1);
            cells.push(Tri3d2Connectivity([v00, v10, v01]));
            cells.push(Tri3d2Connectivity([v10, v11, v01]));
        }
    }

    let boundary = vertices
        .iter()
        .map(|v| is_on_rectangle_boundary(v, origin, extents))
        .collect();
    TriangleMesh2d::from_parts(vertices, cells, boundary)
}

/// Returns `true` if `x` or `y` coincides with a side of the given rectangle within
/// [`BOUNDARY_TOLERANCE`].
pub fn is_on_rectangle_boundary<T: Real>(point: &Point2<T>, origin: &Point2<T>, extents: &Vector2<T>) -> bool {
    let tol = T::from_f64(BOUNDARY_TOLERANCE).expect("Tolerance must fit in T");
    let near = |a: T, b: T| (a - b).abs() < tol;
    near(point.x, origin.x)
        || near(point.x, origin.x + extents.x)
        || near(point.y, origin.y)
        || near(point.y, origin.y + extents.y)
}
