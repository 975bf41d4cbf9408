//! Conforming longest-edge bisection.
//!
//! A triangle is bisected by connecting the midpoint of its longest edge to the opposite
//! vertex. Bisecting a single triangle leaves a hanging node on the neighbor sharing the
//! bisected edge, so the neighbor is queued for bisection as well. A child that inherits an
//! edge which has already been split is queued too, which repeats until no triangle has a
//! split edge. Since every triangle is bisected along its own longest edge, the closure
//! terminates for any valid input mesh.
//!
//! Edge midpoints are memoized per edge, so the two triangles sharing an edge always end up
//! referencing the same midpoint vertex.
use crate::connectivity::{EdgeKey, Tri3d2Connectivity};
use crate::mesh::{MeshError, TriangleMesh2d};
use crate::Real;
use log::debug;
use nalgebra::{OPoint, Point2};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Maps each edge to the active triangles that contain it.
#[derive(Debug, Clone, Default)]
pub struct EdgeAdjacency {
    incident: FxHashMap<EdgeKey, Vec<usize>>,
}

impl EdgeAdjacency {
    pub fn from_connectivity(connectivity: &[Tri3d2Connectivity]) -> Self {
        let mut adjacency = Self::default();
        for (cell_index, conn) in connectivity.iter().enumerate() {
            adjacency.insert(cell_index, conn);
        }
        adjacency
    }

    pub fn insert(&mut self, cell_index: usize, conn: &Tri3d2Connectivity) {
        for edge in conn.edge_keys() {
            self.incident.entry(edge).or_default().push(cell_index);
        }
    }

    pub fn remove(&mut self, cell_index: usize, conn: &Tri3d2Connectivity) {
        for edge in conn.edge_keys() {
            if let Some(cells) = self.incident.get_mut(&edge) {
                cells.retain(|&c| c != cell_index);
                if cells.is_empty() {
                    self.incident.remove(&edge);
                }
            }
        }
    }

    pub fn incident_cells(&self, edge: &EdgeKey) -> &[usize] {
        self.incident
            .get(edge)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The outcome of bisecting a single triangle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bisection {
    /// The edge that was split.
    pub edge: EdgeKey,
    /// The index of the midpoint vertex of `edge`.
    pub midpoint: usize,
    /// Arena indices of the two children.
    pub children: [usize; 2],
}

/// Incremental longest-edge bisection of a mesh.
///
/// Triangles live in an arena: bisecting a triangle retires it and appends its two children,
/// so arena indices stay valid while refining. Vertices of the original mesh keep their
/// indices and midpoints are appended in the order they are created.
#[derive(Debug, Clone)]
pub struct BisectionBuilder<T: Real> {
    vertices: Vec<Point2<T>>,
    boundary: Vec<bool>,
    cells: Vec<Tri3d2Connectivity>,
    active: Vec<bool>,
    midpoints: FxHashMap<EdgeKey, usize>,
    adjacency: EdgeAdjacency,
    num_bisections: usize,
}

impl<T: Real> BisectionBuilder<T> {
    /// Prepares the given mesh for refinement.
    ///
    /// The mesh must be valid and conforming.
    pub fn from_mesh(mesh: &TriangleMesh2d<T>) -> Result<Self, MeshError> {
        mesh.validate()?;
        mesh.check_conformity()?;
        let cells = mesh.connectivity().to_vec();
        Ok(Self {
            vertices: mesh.vertices().to_vec(),
            boundary: mesh.boundary_mask().to_vec(),
            active: vec![true; cells.len()],
            adjacency: EdgeAdjacency::from_connectivity(&cells),
            cells,
            midpoints: FxHashMap::default(),
            num_bisections: 0,
        })
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    /// Number of triangles in the arena, including retired ones.
    pub fn num_arena_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_active_cells(&self) -> usize {
        self.active.iter().filter(|&&active| active).count()
    }

    pub fn num_bisections(&self) -> usize {
        self.num_bisections
    }

    pub fn is_active(&self, cell_index: usize) -> bool {
        self.active.get(cell_index).copied().unwrap_or(false)
    }

    pub fn cell(&self, cell_index: usize) -> Option<&Tri3d2Connectivity> {
        self.cells.get(cell_index)
    }

    /// The local index of the longest edge of the given triangle.
    ///
    /// Lengths are compared exactly. Among edges of equal length, the one with the smallest
    /// [`EdgeKey`] is chosen, so that the choice does not depend on how the triangle's
    /// vertices are rotated.
    pub fn longest_edge(&self, cell_index: usize) -> usize {
        let conn = &self.cells[cell_index];
        let keys = conn.edge_keys();
        let lengths = keys.map(|edge| {
            let [a, b] = edge.vertices();
            (self.vertices[b] - self.vertices[a]).norm_squared()
        });

        let mut longest = 0;
        for i in 1..3 {
            let longer = lengths[i] > lengths[longest];
            let tied = lengths[i] == lengths[longest] && keys[i] < keys[longest];
            if longer || tied {
                longest = i;
            }
        }
        longest
    }

    /// Returns the index of the midpoint vertex of the given edge, creating it if needed.
    ///
    /// Repeated calls for the same edge return the same index. A new midpoint is a boundary
    /// vertex if the edge currently belongs to exactly one active triangle.
    pub fn edge_midpoint(&mut self, edge: EdgeKey) -> usize {
        if let Some(&idx) = self.midpoints.get(&edge) {
            return idx;
        }
        let [a, b] = edge.vertices();
        let midpoint = OPoint::from((self.vertices[a].coords + self.vertices[b].coords) / T::from_subset(&2.0));
        let idx = self.vertices.len();
        self.vertices.push(midpoint);
        self.boundary
            .push(self.adjacency.incident_cells(&edge).len() == 1);
        self.midpoints.insert(edge, idx);
        idx
    }

    /// Returns an edge of the given triangle that has already been split, if any.
    pub fn split_edge(&self, cell_index: usize) -> Option<EdgeKey> {
        self.cells[cell_index]
            .edge_keys()
            .into_iter()
            .find(|edge| self.midpoints.contains_key(edge))
    }

    /// Bisects a single active triangle along its longest edge.
    ///
    /// With the longest edge connecting local vertices `i` and `j = (i + 1) % 3`, `k` the
    /// opposite vertex and `m` the edge midpoint, the children are `[v_i, m, v_k]` and
    /// `[m, v_j, v_k]`, which preserves the orientation of the parent.
    ///
    /// Returns `None` if the triangle has already been retired.
    ///
    /// # Panics
    ///
    /// Panics if `cell_index` is out of bounds.
    pub fn bisect(&mut self, cell_index: usize) -> Option<Bisection> {
        if !self.active[cell_index] {
            return None;
        }
        let conn = self.cells[cell_index];
        let i = self.longest_edge(cell_index);
        let edge = conn.edge_keys()[i];
        let (v_i, v_j, v_k) = (conn[i], conn[(i + 1) % 3], conn[(i + 2) % 3]);
        // Must be created before the parent leaves the adjacency, so that the boundary
        // classification still sees it
        let m = self.edge_midpoint(edge);

        self.active[cell_index] = false;
        self.adjacency.remove(cell_index, &conn);

        let mut children = [0; 2];
        for (child, child_conn) in children.iter_mut().zip([[v_i, m, v_k], [m, v_j, v_k]]) {
            let child_conn = Tri3d2Connectivity(child_conn);
            *child = self.cells.len();
            self.adjacency.insert(*child, &child_conn);
            self.cells.push(child_conn);
            self.active.push(true);
        }

        self.num_bisections += 1;
        Some(Bisection {
            edge,
            midpoint: m,
            children,
        })
    }

    /// Bisects the marked triangles and everything needed to keep the mesh conforming.
    ///
    /// Triangles are processed first-in first-out starting from the marked ones in the given
    /// order, and indices that refer to already retired triangles are skipped.
    ///
    /// # Panics
    ///
    /// Panics if a marked index is not a valid arena index.
    pub fn refine(&mut self, marked: &[usize]) {
        let mut worklist: VecDeque<usize> = marked.iter().copied().collect();
        while let Some(cell_index) = worklist.pop_front() {
            let bisection = match self.bisect(cell_index) {
                Some(bisection) => bisection,
                None => continue,
            };
            worklist.extend(self.adjacency.incident_cells(&bisection.edge));
            for child in bisection.children {
                if self.split_edge(child).is_some() {
                    worklist.push_back(child);
                }
            }
        }
    }

    /// Collects the active triangles, in arena order, into a new mesh.
    ///
    /// Fails if an active triangle still has a hanging node, or if the result is not
    /// conforming.
    pub fn finish(self) -> Result<TriangleMesh2d<T>, MeshError> {
        for cell_index in (0..self.cells.len()).filter(|&idx| self.active[idx]) {
            if let Some(edge) = self.split_edge(cell_index) {
                return Err(MeshError::HangingNode { cell_index, edge });
            }
        }

        let connectivity: Vec<_> = self
            .cells
            .iter()
            .zip(&self.active)
            .filter_map(|(conn, &active)| active.then_some(*conn))
            .collect();

        debug!(
            "Bisection: {} bisections, {} new vertices, {} active triangles",
            self.num_bisections,
            self.midpoints.len(),
            connectivity.len()
        );

        let mesh = TriangleMesh2d::from_parts(self.vertices, connectivity, self.boundary);
        mesh.check_conformity()?;
        Ok(mesh)
    }
}

/// Refine the marked triangles of a mesh by conforming longest-edge bisection.
///
/// The result contains every vertex of `mesh` with unchanged index. Unmarked triangles may be
/// refined as well where needed to avoid hanging nodes. An empty marked set returns a copy of
/// the mesh.
///
/// # Panics
///
/// Panics if a marked index is out of bounds.
pub fn refine_marked<T: Real>(mesh: &TriangleMesh2d<T>, marked: &[usize]) -> Result<TriangleMesh2d<T>, MeshError> {
    assert!(
        marked.iter().all(|&idx| idx < mesh.num_cells()),
        "Marked triangle indices must be in bounds."
    );
    let mut builder = BisectionBuilder::from_mesh(mesh)?;
    builder.refine(marked);
    builder.finish()
}
