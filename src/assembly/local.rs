//! Element-level quantities for the Poisson problem.
use crate::connectivity::Tri3d2Connectivity;
use crate::element::Tri3d2Element;
use crate::mesh::MeshError;
use crate::problem::PoissonProblem;
use crate::Real;
use nalgebra::storage::Storage;
use nalgebra::{DVector, Dyn, Matrix3, Vector, Vector3};
use numeric_literals::replace_float_literals;

/// The contribution of a single triangle to the global system.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ElementContribution<T: Real> {
    /// Global indices of the element nodes, in local order.
    pub nodes: [usize; 3],
    pub stiffness: Matrix3<T>,
    pub load: Vector3<T>,
}

/// Computes the element stiffness matrix and load vector of a triangle.
///
/// The diffusivity and source are evaluated at the centroid, i.e. with one-point quadrature.
/// This is exact for constant coefficients.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn assemble_element_poisson<T, P>(
    cell_index: usize,
    conn: &Tri3d2Connectivity,
    element: &Tri3d2Element<T>,
    problem: &P,
) -> Result<ElementContribution<T>, MeshError>
where
    T: Real,
    P: ?Sized + PoissonProblem<T>,
{
    let centroid = element.centroid();
    let stiffness = element
        .stiffness_matrix(problem.diffusivity(&centroid))
        .ok_or(MeshError::DegenerateTriangle { cell_index })?;
    let load = Vector3::repeat(problem.source(&centroid) * element.area() / 3.0);
    Ok(ElementContribution {
        nodes: conn.0,
        stiffness,
        load,
    })
}

/// Gathers the nodal values of a single element from a global vector.
pub fn gather_global_to_local<T, S>(global: &Vector<T, Dyn, S>, conn: &Tri3d2Connectivity) -> Vector3<T>
where
    T: Real,
    S: Storage<T, Dyn>,
{
    Vector3::from_fn(|i, _| global[conn[i]])
}

/// Adds the element load to the global load vector.
pub fn scatter_local_to_global<T: Real>(global: &mut DVector<T>, conn: &Tri3d2Connectivity, local: &Vector3<T>) {
    for (&node, &value) in conn.iter().zip(local.iter()) {
        global[node] += value;
    }
}
