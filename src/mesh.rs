use crate::connectivity::{EdgeKey, Tri3d2Connectivity};
use crate::element::Tri3d2Element;
use crate::Real;
use nalgebra::{Point2, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod procedural;
pub mod refinement;

/// Structural failures of a mesh: invalid connectivity, degenerate geometry or broken conformity.
///
/// All of these are fatal for an adaptive run, since a malformed mesh can neither be assembled
/// nor refined meaningfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A triangle references a vertex that does not exist.
    VertexIndexOutOfBounds { cell_index: usize, vertex_index: usize },
    /// A triangle has zero or negative signed area, i.e. its Jacobian is singular or inverted.
    DegenerateTriangle { cell_index: usize },
    /// An edge is shared by more than two triangles, or is shared by a single triangle
    /// without lying on the boundary.
    NonConformingEdge { edge: EdgeKey, incident_cells: usize },
    /// A triangle has an edge whose midpoint is a vertex of a neighboring triangle.
    HangingNode { cell_index: usize, edge: EdgeKey },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VertexIndexOutOfBounds {
                cell_index,
                vertex_index,
            } => write!(f, "triangle {cell_index} references non-existent vertex {vertex_index}"),
            Self::DegenerateTriangle { cell_index } => {
                write!(f, "triangle {cell_index} is degenerate or inverted (non-positive area)")
            }
            Self::NonConformingEdge { edge, incident_cells } => {
                write!(f, "edge {edge} is shared by {incident_cells} triangle(s)")
            }
            Self::HangingNode { cell_index, edge } => {
                write!(f, "triangle {cell_index} has a hanging node on edge {edge}")
            }
        }
    }
}

impl std::error::Error for MeshError {}

/// Index-based data structure for conforming triangle meshes (i.e. no hanging nodes) in two
/// dimensions.
///
/// In addition to vertices and connectivity, the mesh stores a boundary classification for
/// each vertex.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct TriangleMesh2d<T: Scalar> {
    vertices: Vec<Point2<T>>,
    connectivity: Vec<Tri3d2Connectivity>,
    boundary: Vec<bool>,
}

impl<T: Scalar> TriangleMesh2d<T> {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// Vertices are classified as boundary vertices if they belong to an edge which is only
    /// referenced by a single triangle.
    ///
    /// The connectivity is not checked here. Use [`validate`](Self::validate) to check that all
    /// indices are in bounds before indexing with them.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point2<T>>, connectivity: Vec<Tri3d2Connectivity>) -> Self {
        let mut mesh = Self {
            boundary: vec![false; vertices.len()],
            vertices,
            connectivity,
        };
        for idx in mesh.find_boundary_vertices() {
            if let Some(flag) = mesh.boundary.get_mut(idx) {
                *flag = true;
            }
        }
        mesh
    }

    /// Construct a mesh with an explicit boundary classification.
    ///
    /// # Panics
    ///
    /// Panics if the boundary mask does not have one entry per vertex.
    pub fn from_parts(vertices: Vec<Point2<T>>, connectivity: Vec<Tri3d2Connectivity>, boundary: Vec<bool>) -> Self {
        assert_eq!(
            vertices.len(),
            boundary.len(),
            "Boundary mask must have one entry per vertex."
        );
        Self {
            vertices,
            connectivity,
            boundary,
        }
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Tri3d2Connectivity] {
        &self.connectivity
    }

    /// One flag per vertex, `true` if the vertex lies on the domain boundary.
    pub fn boundary_mask(&self) -> &[bool] {
        &self.boundary
    }

    pub fn is_boundary_vertex(&self, index: usize) -> bool {
        self.boundary.get(index).copied().unwrap_or(false)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    /// Reclassifies every vertex with the given predicate.
    pub fn classify_boundary_vertices(&mut self, mut is_boundary: impl FnMut(&Point2<T>) -> bool) {
        for (flag, v) in self.boundary.iter_mut().zip(&self.vertices) {
            *flag = is_boundary(v);
        }
    }

    pub fn get_element(&self, index: usize) -> Option<Tri3d2Element<T>> {
        self.connectivity
            .get(index)
            .and_then(|conn| conn.element(&self.vertices))
    }

    /// Iterate over all elements.
    ///
    /// # Panics
    ///
    /// Panics during iteration if an element references a vertex out of bounds.
    /// Call [`validate`](Self::validate) first for meshes from untrusted sources.
    pub fn element_iter<'a>(&'a self) -> impl 'a + Iterator<Item = Tri3d2Element<T>> {
        self.connectivity.iter().map(move |conn| {
            conn.element(&self.vertices)
                .expect("Mesh is not allowed to contain cells with indices out of bounds.")
        })
    }

    /// Maps each edge of the mesh to the (ascending) indices of the triangles containing it.
    ///
    /// A `BTreeMap` is used so that iteration order is deterministic.
    pub fn edge_incidence(&self) -> BTreeMap<EdgeKey, Vec<usize>> {
        let mut incidence: BTreeMap<EdgeKey, Vec<usize>> = BTreeMap::new();
        for (cell_idx, conn) in self.connectivity.iter().enumerate() {
            for edge in conn.edge_keys() {
                incidence.entry(edge).or_default().push(cell_idx);
            }
        }
        incidence
    }

    /// Finds edges which are only connected to exactly one triangle, in ascending order.
    pub fn find_boundary_edges(&self) -> Vec<EdgeKey> {
        self.edge_incidence()
            .into_iter()
            .filter(|(_, cells)| cells.len() == 1)
            .map(|(edge, _)| edge)
            .collect()
    }

    /// Returns a sorted list of vertices that are determined to be on the boundary.
    ///
    /// A vertex is considered to be a part of the boundary if it belongs to a boundary edge.
    /// This is purely topological and independent of the stored boundary mask.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        let mut indices: Vec<_> = self
            .find_boundary_edges()
            .into_iter()
            .flat_map(|edge| edge.vertices())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Checks that every edge is shared by one or two triangles, and that edges shared by a
    /// single triangle connect two boundary vertices.
    pub fn check_conformity(&self) -> Result<(), MeshError> {
        for (edge, cells) in self.edge_incidence() {
            let conforming = match cells.len() {
                1 => self.is_boundary_vertex(edge.first()) && self.is_boundary_vertex(edge.second()),
                2 => true,
                _ => false,
            };
            if !conforming {
                return Err(MeshError::NonConformingEdge {
                    edge,
                    incident_cells: cells.len(),
                });
            }
        }
        Ok(())
    }
}

impl<T: Real> TriangleMesh2d<T> {
    /// Checks that all vertex indices are in bounds and that every triangle has positive area.
    pub fn validate(&self) -> Result<(), MeshError> {
        for (cell_index, conn) in self.connectivity.iter().enumerate() {
            if let Some(&vertex_index) = conn.iter().find(|&&v| v >= self.vertices.len()) {
                return Err(MeshError::VertexIndexOutOfBounds {
                    cell_index,
                    vertex_index,
                });
            }
            let element = self.element_at(cell_index)?;
            if element.signed_area() <= T::zero() {
                return Err(MeshError::DegenerateTriangle { cell_index });
            }
        }
        Ok(())
    }

    /// Like [`get_element`](Self::get_element), but reports out-of-bounds cell connectivity
    /// as an error.
    ///
    /// # Panics
    ///
    /// Panics if `cell_index` itself is out of bounds.
    pub fn element_at(&self, cell_index: usize) -> Result<Tri3d2Element<T>, MeshError> {
        let conn = &self.connectivity[cell_index];
        conn.element(&self.vertices).ok_or_else(|| {
            let vertex_index = conn
                .iter()
                .copied()
                .find(|&v| v >= self.vertices.len())
                .unwrap_or(usize::MAX);
            MeshError::VertexIndexOutOfBounds {
                cell_index,
                vertex_index,
            }
        })
    }

    pub fn cell_areas(&self) -> Vec<T> {
        self.element_iter().map(|element| element.area()).collect()
    }

    pub fn total_area(&self) -> T {
        self.element_iter()
            .fold(T::zero(), |sum, element| sum + element.area())
    }
}
