//! The linear (P1) triangle element.
use crate::Real;
use itertools::Itertools;
use nalgebra::{distance, Matrix2, Matrix2x3, Matrix3, OPoint, Point2, Scalar, Vector2, Vector3};
use numeric_literals::replace_float_literals;

/// A finite element representing linear basis functions on a triangle, in two dimensions.
///
/// The reference element is the triangle with corners (0, 0), (1, 0), (0, 1), on which the
/// basis functions are `1 - ξ - η`, `ξ` and `η`. Their (constant) reference gradients are
/// `[-1, -1]`, `[1, 0]` and `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> Tri3d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 3] {
        &self.vertices
    }
}

impl<T> Tri3d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)])
    }

    /// Gradients of the reference basis functions, stored column-wise.
    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference_gradients() -> Matrix2x3<T> {
        Matrix2x3::from_columns(&[
            Vector2::new(-1.0, -1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0)
        ])
    }

    /// The Jacobian of the affine map from the reference triangle, `J = [x1 - x0, x2 - x0]`.
    ///
    /// The map is affine, so the Jacobian is constant over the element.
    pub fn reference_jacobian(&self) -> Matrix2<T> {
        let [x0, x1, x2] = &self.vertices;
        Matrix2::from_columns(&[x1 - x0, x2 - x0])
    }

    /// Twice the signed area. Positive for counter-clockwise triangles.
    pub fn jacobian_determinant(&self) -> T {
        self.reference_jacobian().determinant()
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn signed_area(&self) -> T {
        0.5 * self.jacobian_determinant()
    }

    pub fn area(&self) -> T {
        self.signed_area().abs()
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn centroid(&self) -> Point2<T> {
        let [x0, x1, x2] = &self.vertices;
        OPoint::from((x0.coords + x1.coords + x2.coords) / 3.0)
    }

    /// Maps a point in the reference triangle to the physical triangle.
    pub fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        self.vertices[0] + self.reference_jacobian() * xi.coords
    }

    /// Evaluates the three basis functions at the given reference coordinates.
    pub fn evaluate_basis(&self, xi: &Point2<T>) -> Vector3<T> {
        Vector3::new(T::one() - xi.x - xi.y, xi.x, xi.y)
    }

    /// Physical gradients of the basis functions, stored column-wise.
    ///
    /// These are obtained by applying `J^{-T}` to the reference gradients. Returns `None` if
    /// the element is degenerate or inverted, i.e. if the Jacobian determinant is not positive.
    pub fn gradients(&self) -> Option<Matrix2x3<T>> {
        let j = self.reference_jacobian();
        if j.determinant() <= T::zero() {
            return None;
        }
        let j_inv_t = j.try_inverse()?.transpose();
        Some(j_inv_t * Self::reference_gradients())
    }

    /// The element stiffness matrix `κ |K| G^T G` for a constant diffusivity `κ`.
    ///
    /// Returns `None` under the same conditions as [`gradients`](Self::gradients).
    pub fn stiffness_matrix(&self, diffusivity: T) -> Option<Matrix3<T>> {
        let g = self.gradients()?;
        Some(g.transpose() * g * (diffusivity * self.area()))
    }

    /// Squared lengths of the three edges, indexed by local edge.
    pub fn edge_lengths_squared(&self) -> [T; 3] {
        let v = &self.vertices;
        [0, 1, 2].map(|i| (v[(i + 1) % 3] - v[i]).norm_squared())
    }

    pub fn diameter(&self) -> T {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(x, y)| distance(x, y))
            .fold(T::zero(), |a, b| a.max(b))
    }
}
