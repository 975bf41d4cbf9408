//! Functionality for error estimation.
//!
//! The a posteriori estimator is based on gradient recovery: the gradient of a P1 solution is
//! constant on each triangle and discontinuous across edges. Averaging the element gradients
//! to the vertices gives a smoother, recovered gradient, and the difference between the two
//! indicates where the discretization error is large.
use crate::assembly::gather_global_to_local;
use crate::mesh::{MeshError, TriangleMesh2d};
use crate::Real;
use itertools::izip;
use nalgebra::{DVectorView, Point2, Vector2};
use numeric_literals::replace_float_literals;

/// The constant gradient of the discrete solution on each triangle, together with the
/// triangle areas.
///
/// # Panics
///
/// Panics if `u_h` does not have one entry per vertex.
pub fn compute_element_gradients<'a, T: Real>(
    mesh: &TriangleMesh2d<T>,
    u_h: impl Into<DVectorView<'a, T>>,
) -> Result<(Vec<Vector2<T>>, Vec<T>), MeshError> {
    let u_h = u_h.into();
    assert_eq!(u_h.len(), mesh.num_vertices(), "Solution must have one entry per vertex.");

    let mut gradients = Vec::with_capacity(mesh.num_cells());
    let mut areas = Vec::with_capacity(mesh.num_cells());
    for (cell_index, conn) in mesh.connectivity().iter().enumerate() {
        let element = mesh.element_at(cell_index)?;
        let g = element
            .gradients()
            .ok_or(MeshError::DegenerateTriangle { cell_index })?;
        let u_local = gather_global_to_local(&u_h, conn);
        gradients.push(g * u_local);
        areas.push(element.area());
    }
    Ok((gradients, areas))
}

/// Area-weighted average of the element gradients around each vertex.
///
/// Vertices without incident triangles get a zero gradient.
pub fn recover_nodal_gradients<T: Real>(
    mesh: &TriangleMesh2d<T>,
    element_gradients: &[Vector2<T>],
    areas: &[T],
) -> Vec<Vector2<T>> {
    assert_eq!(element_gradients.len(), mesh.num_cells());
    assert_eq!(areas.len(), mesh.num_cells());

    let mut weighted_sums = vec![Vector2::zeros(); mesh.num_vertices()];
    let mut total_weights = vec![T::zero(); mesh.num_vertices()];
    for (conn, gradient, &area) in izip!(mesh.connectivity(), element_gradients, areas) {
        for &v in conn.iter() {
            weighted_sums[v] += gradient * area;
            total_weights[v] += area;
        }
    }

    weighted_sums
        .into_iter()
        .zip(total_weights)
        .map(|(sum, weight)| {
            if weight > T::zero() {
                sum / weight
            } else {
                Vector2::zeros()
            }
        })
        .collect()
}

/// Computes the gradient-recovery error indicator of every triangle.
///
/// For a triangle `K` with constant discrete gradient `∇u_K` and recovered nodal gradients
/// `G_1, G_2, G_3` at its vertices, the indicator is `|K| · |mean(G_i) - ∇u_K|²`. Indicators
/// are non-negative and indexed like the triangles of the mesh.
///
/// # Errors
///
/// Fails if the mesh has invalid connectivity or degenerate triangles.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn estimate_error_indicators<'a, T: Real>(
    mesh: &TriangleMesh2d<T>,
    u_h: impl Into<DVectorView<'a, T>>,
) -> Result<Vec<T>, MeshError> {
    let (element_gradients, areas) = compute_element_gradients(mesh, u_h)?;
    let nodal_gradients = recover_nodal_gradients(mesh, &element_gradients, &areas);

    let indicators = izip!(mesh.connectivity(), &element_gradients, &areas)
        .map(|(conn, gradient, &area)| {
            let recovered = conn
                .iter()
                .fold(Vector2::zeros(), |sum, &v| sum + nodal_gradients[v])
                / 3.0;
            area * (recovered - gradient).norm_squared()
        })
        .collect();
    Ok(indicators)
}

/// The global error estimate `sqrt(Σ η_K)`.
pub fn global_error_estimate<T: Real>(indicators: &[T]) -> T {
    indicators
        .iter()
        .fold(T::zero(), |sum, &eta| sum + eta)
        .sqrt()
}

/// The maximum absolute difference between the discrete solution and `u` at the vertices.
///
/// # Panics
///
/// Panics if `u_h` does not have one entry per vertex.
pub fn max_nodal_error<'a, T: Real>(
    mesh: &TriangleMesh2d<T>,
    u_h: impl Into<DVectorView<'a, T>>,
    u: impl Fn(&Point2<T>) -> T,
) -> T {
    let u_h = u_h.into();
    assert_eq!(u_h.len(), mesh.num_vertices(), "Solution must have one entry per vertex.");
    mesh.vertices()
        .iter()
        .zip(u_h.iter())
        .map(|(x, &u_h_i)| (u_h_i - u(x)).abs())
        .fold(T::zero(), |a, b| a.max(b))
}

/// Estimate the $L^2$ error $\norm{u_h - u}_{L^2}$ with the edge-midpoint quadrature rule.
///
/// The rule is exact for quadratic polynomials on each triangle.
///
/// # Panics
///
/// Panics if `u_h` does not have one entry per vertex.
#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn estimate_L2_error<'a, T: Real>(
    mesh: &TriangleMesh2d<T>,
    u_h: impl Into<DVectorView<'a, T>>,
    u: impl Fn(&Point2<T>) -> T,
) -> Result<T, MeshError> {
    let u_h = u_h.into();
    assert_eq!(u_h.len(), mesh.num_vertices(), "Solution must have one entry per vertex.");
    mesh.validate()?;

    let quadrature_points = [Point2::new(0.5, 0.0), Point2::new(0.5, 0.5), Point2::new(0.0, 0.5)];
    let mut error_squared = T::zero();
    for (conn, element) in mesh.connectivity().iter().zip(mesh.element_iter()) {
        let u_local = gather_global_to_local(&u_h, conn);
        let weight = element.area() / 3.0;
        for xi in &quadrature_points {
            let x = element.map_reference_coords(xi);
            let u_h_at_x = element.evaluate_basis(xi).dot(&u_local);
            error_squared += weight * (u_h_at_x - u(&x)).powi(2);
        }
    }
    Ok(error_squared.sqrt())
}
