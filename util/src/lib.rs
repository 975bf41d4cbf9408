use nalgebra::Point2;

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// A vertex lying in the interior of a triangle edge it does not belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HangingNode {
    pub vertex: usize,
    pub cell: usize,
    pub edge: [usize; 2],
}

/// Finds all vertices that lie in the interior of an edge of a triangle without being one of
/// its vertices.
///
/// This compares every vertex against every edge and is only meant for small test meshes.
/// It does not rely on connectivity being consistent, so it can be used to check the
/// connectivity-based conformity checks of the library.
pub fn find_hanging_nodes_brute_force(vertices: &[Point2<f64>], cells: &[[usize; 3]]) -> Vec<HangingNode> {
    let mut hanging = Vec::new();
    for (cell_idx, cell) in cells.iter().enumerate() {
        for i in 0..3 {
            let edge = [cell[i], cell[(i + 1) % 3]];
            let a = vertices[edge[0]];
            let b = vertices[edge[1]];
            let ab = b - a;
            let length_squared = ab.norm_squared();

            for (v_idx, v) in vertices.iter().enumerate() {
                if cell.contains(&v_idx) {
                    continue;
                }
                let av = v - a;
                let cross = ab.x * av.y - ab.y * av.x;
                let t = ab.dot(&av) / length_squared;
                let on_line = cross.abs() <= 1e-10 * length_squared;
                if on_line && t > 1e-12 && t < 1.0 - 1e-12 {
                    hanging.push(HangingNode {
                        vertex: v_idx,
                        cell: cell_idx,
                        edge,
                    });
                }
            }
        }
    }
    hanging
}
