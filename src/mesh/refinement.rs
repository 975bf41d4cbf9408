//! Functionality and abstractions for mesh refinement.
//!
//! Two strategies are provided:
//!
//! - [`refine_marked`]: conforming longest-edge bisection of a marked subset of triangles.
//!   Neighbors are refined as needed so that no hanging nodes are created.
//! - [`refine_uniformly`]: red refinement, splitting every triangle into four. This is only
//!   conforming because it is applied to *all* triangles at once, so it ignores any marking.
//!
//! Both keep the vertices of the coarse mesh (with their indices) and append new vertices.
use crate::connectivity::{EdgeKey, Tri3d2Connectivity};
use crate::mesh::{MeshError, TriangleMesh2d};
use crate::Real;
use detail::{populate_red_refinement, EdgeMidpointLabel, IntermediateTri3d2, VertexLabel, VertexOrEdgeMidpointVertex};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

pub mod bisection;
pub mod detail;

pub use bisection::{refine_marked, BisectionBuilder, EdgeAdjacency};

/// The refinement scheme applied by the adaptive loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementStrategy {
    /// Longest-edge bisection of the marked triangles with conformity closure.
    #[default]
    Bisection,
    /// Red refinement of every triangle, regardless of marking.
    Uniform,
}

/// Refine a mesh with the given strategy.
///
/// `marked` is ignored by [`RefinementStrategy::Uniform`].
pub fn refine<T: Real>(
    mesh: &TriangleMesh2d<T>,
    marked: &[usize],
    strategy: RefinementStrategy,
) -> Result<TriangleMesh2d<T>, MeshError> {
    match strategy {
        RefinementStrategy::Bisection => refine_marked(mesh, marked),
        RefinementStrategy::Uniform => refine_uniformly(mesh),
    }
}

/// Apply one round of uniform red refinement.
///
/// Midpoints of boundary edges are classified as boundary vertices.
pub fn refine_uniformly<T: Real>(mesh: &TriangleMesh2d<T>) -> Result<TriangleMesh2d<T>, MeshError> {
    mesh.validate()?;
    let boundary_edges: FxHashSet<EdgeKey> = mesh.find_boundary_edges().into_iter().collect();

    let mut vertices = mesh.vertices().to_vec();
    let mut boundary = mesh.boundary_mask().to_vec();
    let mut midpoint_indices: FxHashMap<EdgeMidpointLabel, usize> = FxHashMap::default();
    let mut new_connectivity = Vec::with_capacity(4 * mesh.num_cells());

    // Local buffer
    let mut intermediates = Vec::new();
    for connectivity in mesh.connectivity() {
        intermediates.clear();
        populate_red_refinement(connectivity, &mut intermediates);
        for &IntermediateTri3d2(labels) in &intermediates {
            let indices = labels.map(|label| match label {
                VertexOrEdgeMidpointVertex::Vertex(VertexLabel(idx)) => idx,
                VertexOrEdgeMidpointVertex::EdgeMidpoint(midpoint) => *midpoint_indices.entry(midpoint).or_insert_with(|| {
                    let idx = vertices.len();
                    vertices.push(label.construct_vertex(mesh.vertices()));
                    boundary.push(boundary_edges.contains(&midpoint.0));
                    idx
                }),
            });
            new_connectivity.push(Tri3d2Connectivity(indices));
        }
    }

    debug!(
        "Uniform refinement: {} -> {} triangles, {} new vertices",
        mesh.num_cells(),
        new_connectivity.len(),
        midpoint_indices.len()
    );
    Ok(TriangleMesh2d::from_parts(vertices, new_connectivity, boundary))
}

/// Repeatedly applies uniform mesh refinement to the given mesh.
pub fn refine_uniformly_repeat<T: Real>(
    mesh: &TriangleMesh2d<T>,
    repeat_times: usize,
) -> Result<TriangleMesh2d<T>, MeshError> {
    let mut mesh = mesh.clone();
    for _ in 0..repeat_times {
        mesh = refine_uniformly(&mesh)?;
    }
    Ok(mesh)
}
