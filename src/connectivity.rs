//! Index-based connectivity for triangles and their edges.
use crate::element::Tri3d2Element;
use nalgebra::{Point2, Scalar};
use serde::{Deserialize, Serialize};
use std::cmp::{max, min};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Connectivity for a two-dimensional linear triangle.
///
/// The vertices are expected to be ordered counter-clockwise. Local edge `i` connects
/// local vertices `i` and `(i + 1) % 3`, so that the vertex opposite to edge `i` is
/// local vertex `(i + 2) % 3`.
///
/// ```text
/// 2
/// |`\
/// |  `\
/// |    `\
/// |      `\
/// 0--------1
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Tri3d2Connectivity(pub [usize; 3]);

impl Tri3d2Connectivity {
    pub fn vertex_indices(&self) -> &[usize] {
        &self.0
    }

    /// The (orientation-independent) keys of the three edges, indexed by local edge.
    pub fn edge_keys(&self) -> [EdgeKey; 3] {
        let [a, b, c] = self.0;
        [EdgeKey::new(a, b), EdgeKey::new(b, c), EdgeKey::new(c, a)]
    }

    /// Constructs the element described by this connectivity.
    ///
    /// Returns `None` if any of the vertex indices are out of bounds.
    pub fn element<T: Scalar>(&self, vertices: &[Point2<T>]) -> Option<Tri3d2Element<T>> {
        Some(Tri3d2Element::from_vertices([
            vertices.get(self.0[0]).cloned()?,
            vertices.get(self.0[1]).cloned()?,
            vertices.get(self.0[2]).cloned()?,
        ]))
    }
}

impl From<[usize; 3]> for Tri3d2Connectivity {
    fn from(indices: [usize; 3]) -> Self {
        Self(indices)
    }
}

impl Deref for Tri3d2Connectivity {
    type Target = [usize; 3];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Tri3d2Connectivity {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// The identity of an edge: an unordered pair of vertex indices, stored as `(min, max)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct EdgeKey([usize; 2]);

impl EdgeKey {
    pub fn new(a: usize, b: usize) -> Self {
        Self([min(a, b), max(a, b)])
    }

    pub fn vertices(&self) -> [usize; 2] {
        self.0
    }

    pub fn first(&self) -> usize {
        self.0[0]
    }

    pub fn second(&self) -> usize {
        self.0[1]
    }
}

impl From<[usize; 2]> for EdgeKey {
    fn from([a, b]: [usize; 2]) -> Self {
        Self::new(a, b)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0[0], self.0[1])
    }
}
