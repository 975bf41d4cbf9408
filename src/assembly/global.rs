use crate::assembly::local::{scatter_local_to_global, ElementContribution};
use crate::connectivity::Tri3d2Connectivity;
use crate::Real;
use nalgebra::{DVector, Matrix3};
use nalgebra_sparse::csr::CsrRowMut;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeSet;

/// An assembler for CSR matrices over a fixed node-to-node sparsity pattern.
#[derive(Debug, Clone, Default)]
pub struct CsrAssembler {
    // Reused between elements
    sorted_permutation: Vec<usize>,
}

impl CsrAssembler {
    /// Computes the node-to-node sparsity pattern of the given connectivity.
    ///
    /// Every node gets a diagonal entry, even if no element references it, so that the
    /// diagonal can always be modified in place.
    pub fn assemble_pattern(&self, num_nodes: usize, connectivity: &[Tri3d2Connectivity]) -> SparsityPattern {
        // A BTreeSet stores each entry exactly once and yields them sorted by (row, col),
        // which is exactly the CSR order
        let mut matrix_entries = BTreeSet::new();
        for i in 0..num_nodes {
            matrix_entries.insert((i, i));
        }
        for conn in connectivity {
            for &node_i in conn.iter() {
                for &node_j in conn.iter() {
                    matrix_entries.insert((node_i, node_j));
                }
            }
        }

        let mut offsets = Vec::with_capacity(num_nodes + 1);
        let mut column_indices = Vec::with_capacity(matrix_entries.len());

        offsets.push(0);
        for (i, j) in matrix_entries {
            while i + 1 > offsets.len() {
                // New row. Every row has a diagonal entry, so rows are never empty
                offsets.push(column_indices.len());
            }
            column_indices.push(j);
        }
        while offsets.len() < num_nodes + 1 {
            offsets.push(column_indices.len());
        }

        SparsityPattern::try_from_offsets_and_indices(num_nodes, num_nodes, offsets, column_indices)
            .expect("Pattern data must be valid by definition")
    }

    /// Creates a zero matrix with the sparsity pattern of the given connectivity.
    pub fn assemble_zero_matrix<T: Real>(&self, num_nodes: usize, connectivity: &[Tri3d2Connectivity]) -> CsrMatrix<T> {
        let pattern = self.assemble_pattern(num_nodes, connectivity);
        let nnz = pattern.nnz();
        CsrMatrix::try_from_pattern_and_values(pattern, vec![T::zero(); nnz])
            .expect("CSR data must be valid by definition")
    }

    /// Adds an element contribution to the global matrix and load vector.
    ///
    /// # Panics
    ///
    /// Panics if the matrix pattern does not contain the node-to-node entries of the element.
    pub fn add_element_contribution<T: Real>(
        &mut self,
        matrix: &mut CsrMatrix<T>,
        rhs: &mut DVector<T>,
        contribution: &ElementContribution<T>,
    ) {
        let nodes = &contribution.nodes;
        self.sorted_permutation.clear();
        self.sorted_permutation.extend(0..nodes.len());
        self.sorted_permutation
            .sort_unstable_by_key(|&i| nodes[i]);

        for (local_row, &global_row) in nodes.iter().enumerate() {
            let mut csr_row = matrix.row_mut(global_row);
            add_element_row_to_csr_row(
                &mut csr_row,
                nodes,
                &self.sorted_permutation,
                &contribution.stiffness,
                local_row,
            );
        }
        scatter_local_to_global(rhs, &Tri3d2Connectivity(*nodes), &contribution.load);
    }
}

/// Add a row of a local element matrix to the provided row of a CSR matrix.
///
/// `sorted_permutation` holds the local node indices ordered so that the corresponding
/// global indices are ascending, which lets us find all columns in a single sweep of the row.
fn add_element_row_to_csr_row<T: Real>(
    row: &mut CsrRowMut<T>,
    nodes: &[usize; 3],
    sorted_permutation: &[usize],
    element_matrix: &Matrix3<T>,
    local_row: usize,
) {
    let (column_indices, values) = row.cols_and_values_mut();
    let mut csr_col_idx_iter = column_indices.iter().copied().enumerate();

    for &local_col in sorted_permutation {
        let global_col = nodes[local_col];
        let (csr_idx, _) = csr_col_idx_iter
            .find(|&(_, col)| col == global_col)
            .expect("Could not find column index associated with node in CSR row");
        values[csr_idx] += element_matrix[(local_row, local_col)];
    }
}

/// Imposes Dirichlet boundary conditions on an assembled system in place.
///
/// Every row `i` with `boundary[i] == true` becomes the identity row with right-hand side
/// `values[i]`. In the remaining rows, boundary columns are eliminated by moving
/// `A_ij * values[j]` to the right-hand side. The matrix stays symmetric and its sparsity
/// pattern is unchanged; eliminated entries are stored as explicit zeros.
///
/// # Panics
///
/// Panics if the dimensions of `matrix`, `rhs`, `boundary` and `values` do not agree.
pub fn apply_dirichlet_bc<T: Real>(matrix: &mut CsrMatrix<T>, rhs: &mut DVector<T>, boundary: &[bool], values: &[T]) {
    let n = matrix.nrows();
    assert_eq!(n, matrix.ncols(), "Matrix must be square.");
    assert_eq!(n, rhs.len(), "Right-hand side must have one entry per row.");
    assert_eq!(n, boundary.len(), "Boundary mask must have one entry per row.");
    assert_eq!(n, values.len(), "Boundary values must have one entry per row.");

    // Row i only reads its own entries, so a single pass suffices
    for i in 0..n {
        let mut row = matrix.row_mut(i);
        let (cols, entries) = row.cols_and_values_mut();
        if boundary[i] {
            for (&j, a_ij) in cols.iter().zip(entries) {
                *a_ij = if j == i { T::one() } else { T::zero() };
            }
            rhs[i] = values[i];
        } else {
            for (&j, a_ij) in cols.iter().zip(entries) {
                if boundary[j] {
                    rhs[i] -= *a_ij * values[j];
                    *a_ij = T::zero();
                }
            }
        }
    }
}
