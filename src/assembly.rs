//! Assembly of the global Poisson system and imposition of boundary conditions.
//!
//! The stiffness matrix and load vector are assembled element by element into a CSR matrix
//! whose sparsity pattern is the node-to-node adjacency of the mesh. [`assemble_poisson_system`]
//! does this serially, while [`assemble_poisson_system_par`] computes element contributions
//! in parallel with `rayon` and then scatters them serially. Both produce identical systems.
use crate::assembly::local::{assemble_element_poisson, ElementContribution};
use crate::mesh::{MeshError, TriangleMesh2d};
use crate::problem::PoissonProblem;
use crate::Real;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

pub mod global;
pub mod local;

pub use global::{apply_dirichlet_bc, CsrAssembler};
pub use local::gather_global_to_local;

/// A sparse linear system `A u = b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem<T: Real> {
    pub matrix: CsrMatrix<T>,
    pub rhs: DVector<T>,
}

impl<T: Real> LinearSystem<T> {
    /// Imposes the given Dirichlet values on the rows flagged in `boundary`.
    ///
    /// See [`apply_dirichlet_bc`].
    pub fn apply_dirichlet_bc(&mut self, boundary: &[bool], values: &[T]) {
        apply_dirichlet_bc(&mut self.matrix, &mut self.rhs, boundary, values);
    }
}

/// Evaluates the Dirichlet value of the problem at every vertex.
///
/// Values are computed for all vertices, but are only meaningful where the boundary mask is set.
pub fn dirichlet_values<T, P>(mesh: &TriangleMesh2d<T>, problem: &P) -> Vec<T>
where
    T: Real,
    P: ?Sized + PoissonProblem<T>,
{
    mesh.vertices()
        .iter()
        .map(|x| problem.dirichlet_value(x))
        .collect()
}

/// Assembles the unconstrained stiffness matrix and load vector.
pub fn assemble_poisson_unconstrained<T, P>(mesh: &TriangleMesh2d<T>, problem: &P) -> Result<LinearSystem<T>, MeshError>
where
    T: Real,
    P: ?Sized + PoissonProblem<T>,
{
    mesh.validate()?;
    let contributions = mesh
        .connectivity()
        .iter()
        .enumerate()
        .map(|(cell_index, conn)| {
            let element = mesh.element_at(cell_index)?;
            assemble_element_poisson(cell_index, conn, &element, problem)
        });
    scatter_contributions(mesh, contributions)
}

/// Parallel version of [`assemble_poisson_unconstrained`].
pub fn assemble_poisson_unconstrained_par<T, P>(
    mesh: &TriangleMesh2d<T>,
    problem: &P,
) -> Result<LinearSystem<T>, MeshError>
where
    T: Real,
    P: ?Sized + Sync + PoissonProblem<T>,
{
    mesh.validate()?;
    let contributions: Vec<_> = mesh
        .connectivity()
        .par_iter()
        .enumerate()
        .map(|(cell_index, conn)| {
            let element = mesh.element_at(cell_index)?;
            assemble_element_poisson(cell_index, conn, &element, problem)
        })
        .collect::<Result<_, _>>()?;
    scatter_contributions(mesh, contributions.into_iter().map(Ok))
}

/// Assembles the Poisson system and imposes the Dirichlet data of the problem on the
/// boundary vertices of the mesh.
pub fn assemble_poisson_system<T, P>(mesh: &TriangleMesh2d<T>, problem: &P) -> Result<LinearSystem<T>, MeshError>
where
    T: Real,
    P: ?Sized + PoissonProblem<T>,
{
    let mut system = assemble_poisson_unconstrained(mesh, problem)?;
    system.apply_dirichlet_bc(mesh.boundary_mask(), &dirichlet_values(mesh, problem));
    Ok(system)
}

/// Parallel version of [`assemble_poisson_system`].
pub fn assemble_poisson_system_par<T, P>(mesh: &TriangleMesh2d<T>, problem: &P) -> Result<LinearSystem<T>, MeshError>
where
    T: Real,
    P: ?Sized + Sync + PoissonProblem<T>,
{
    let mut system = assemble_poisson_unconstrained_par(mesh, problem)?;
    system.apply_dirichlet_bc(mesh.boundary_mask(), &dirichlet_values(mesh, problem));
    Ok(system)
}

fn scatter_contributions<T: Real>(
    mesh: &TriangleMesh2d<T>,
    contributions: impl Iterator<Item = Result<ElementContribution<T>, MeshError>>,
) -> Result<LinearSystem<T>, MeshError> {
    let mut assembler = CsrAssembler::default();
    let mut matrix = assembler.assemble_zero_matrix(mesh.num_vertices(), mesh.connectivity());
    let mut rhs = DVector::zeros(mesh.num_vertices());
    for contribution in contributions {
        assembler.add_element_contribution(&mut matrix, &mut rhs, &contribution?);
    }
    Ok(LinearSystem { matrix, rhs })
}
