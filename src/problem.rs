//! Definitions of Poisson problems `-∇·(κ ∇u) = f` with Dirichlet data `u = g`.
use crate::Real;
use nalgebra::{Point2, Vector2};
use numeric_literals::replace_float_literals;

/// Coefficient, source and boundary data of a Poisson problem.
pub trait PoissonProblem<T: Real> {
    /// The diffusivity `κ(x)`.
    fn diffusivity(&self, x: &Point2<T>) -> T;

    /// The source term `f(x)`.
    fn source(&self, x: &Point2<T>) -> T;

    /// The Dirichlet boundary value `g(x)`.
    fn dirichlet_value(&self, x: &Point2<T>) -> T;
}

impl<T, P> PoissonProblem<T> for &P
where
    T: Real,
    P: ?Sized + PoissonProblem<T>,
{
    fn diffusivity(&self, x: &Point2<T>) -> T {
        P::diffusivity(self, x)
    }

    fn source(&self, x: &Point2<T>) -> T {
        P::source(self, x)
    }

    fn dirichlet_value(&self, x: &Point2<T>) -> T {
        P::dirichlet_value(self, x)
    }
}

/// A problem with a known exact solution, used for verification.
pub trait ExactSolution<T: Real> {
    fn solution(&self, x: &Point2<T>) -> T;

    fn solution_gradient(&self, x: &Point2<T>) -> Vector2<T>;
}

/// A Poisson problem defined by closures.
#[derive(Debug, Clone, Copy)]
pub struct FnPoissonProblem<K, F, G> {
    diffusivity: K,
    source: F,
    dirichlet: G,
}

impl<K, F, G> FnPoissonProblem<K, F, G> {
    pub fn new(diffusivity: K, source: F, dirichlet: G) -> Self {
        Self {
            diffusivity,
            source,
            dirichlet,
        }
    }
}

impl<T, K, F, G> PoissonProblem<T> for FnPoissonProblem<K, F, G>
where
    T: Real,
    K: Fn(&Point2<T>) -> T,
    F: Fn(&Point2<T>) -> T,
    G: Fn(&Point2<T>) -> T,
{
    fn diffusivity(&self, x: &Point2<T>) -> T {
        (self.diffusivity)(x)
    }

    fn source(&self, x: &Point2<T>) -> T {
        (self.source)(x)
    }

    fn dirichlet_value(&self, x: &Point2<T>) -> T {
        (self.dirichlet)(x)
    }
}

/// The manufactured problem on the unit square with exact solution `u = sin(πx) sin(πy)`.
///
/// This gives `κ = 1`, `f = 2π² sin(πx) sin(πy)` and `g = u`, which vanishes on the boundary of
/// the unit square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManufacturedSineProblem;

impl<T: Real> PoissonProblem<T> for ManufacturedSineProblem {
    fn diffusivity(&self, _x: &Point2<T>) -> T {
        T::one()
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn source(&self, x: &Point2<T>) -> T {
        let pi = T::pi();
        2.0 * pi * pi * self.solution(x)
    }

    fn dirichlet_value(&self, x: &Point2<T>) -> T {
        self.solution(x)
    }
}

impl<T: Real> ExactSolution<T> for ManufacturedSineProblem {
    fn solution(&self, x: &Point2<T>) -> T {
        let pi = T::pi();
        (pi * x.x).sin() * (pi * x.y).sin()
    }

    fn solution_gradient(&self, x: &Point2<T>) -> Vector2<T> {
        let pi = T::pi();
        let (sx, cx) = (pi * x.x).sin_cos();
        let (sy, cy) = (pi * x.y).sin_cos();
        Vector2::new(pi * cx * sy, pi * sx * cy)
    }
}
