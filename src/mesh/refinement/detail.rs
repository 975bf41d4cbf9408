//! Lower level details for uniform refinement.

use crate::connectivity::{EdgeKey, Tri3d2Connectivity};
use crate::Real;
use nalgebra::{OPoint, Point2};

/// Labels an existing vertex of the coarse mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexLabel(pub usize);

/// Labels the midpoint of an edge of the coarse mesh.
///
/// Since [`EdgeKey`] is orientation-independent, the labels of the midpoint of `(a, b)` and
/// `(b, a)` compare and hash equal, which makes neighboring triangles agree on the vertex.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EdgeMidpointLabel(pub EdgeKey);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexOrEdgeMidpointVertex {
    Vertex(VertexLabel),
    EdgeMidpoint(EdgeMidpointLabel),
}

impl From<VertexLabel> for VertexOrEdgeMidpointVertex {
    fn from(label: VertexLabel) -> Self {
        Self::Vertex(label)
    }
}

impl From<EdgeMidpointLabel> for VertexOrEdgeMidpointVertex {
    fn from(label: EdgeMidpointLabel) -> Self {
        Self::EdgeMidpoint(label)
    }
}

impl VertexOrEdgeMidpointVertex {
    pub fn construct_vertex<T: Real>(&self, all_vertices: &[Point2<T>]) -> Point2<T> {
        match self {
            Self::Vertex(VertexLabel(idx)) => all_vertices[*idx],
            Self::EdgeMidpoint(EdgeMidpointLabel(edge)) => {
                let [a, b] = edge.vertices().map(|idx| all_vertices[idx]);
                OPoint::from((a.coords + b.coords) / T::from_subset(&2.0))
            }
        }
    }
}

pub fn edge_midpoint(vertices: [usize; 2]) -> EdgeMidpointLabel {
    EdgeMidpointLabel(EdgeKey::from(vertices))
}

pub fn vertex(vertex: usize) -> VertexLabel {
    VertexLabel(vertex)
}

/// A child triangle expressed in terms of vertex labels, independent of final vertex indices.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntermediateTri3d2(pub [VertexOrEdgeMidpointVertex; 3]);

/// Produces the four children of red refinement.
///
/// With `d`, `e`, `f` the midpoints of the edges `ab`, `bc`, `ca`, the children are the three
/// corner triangles and the center triangle `def`, all with the orientation of the parent.
pub fn populate_red_refinement(connectivity: &Tri3d2Connectivity, intermediates: &mut Vec<IntermediateTri3d2>) {
    let &Tri3d2Connectivity([a, b, c]) = connectivity;
    let d = edge_midpoint([a, b]).into();
    let e = edge_midpoint([b, c]).into();
    let f = edge_midpoint([c, a]).into();
    let [a, b, c] = [a, b, c].map(|vertex_idx| vertex(vertex_idx).into());

    intermediates.extend_from_slice(&[
        IntermediateTri3d2([a, d, f]),
        IntermediateTri3d2([d, b, e]),
        IntermediateTri3d2([f, e, c]),
        IntermediateTri3d2([d, e, f]),
    ]);
}
