//! The adaptive solve-estimate-mark-refine loop.
//!
//! [`AdaptiveLoop`] is an explicit state machine:
//!
//! ```text
//! Initial -> Assembled -> Solved -> Estimated -> Marked -> Refined -> Assembled -> ...
//!                                      |
//!                                      +-> Finished
//! ```
//!
//! Each call to [`AdaptiveLoop::step`] performs one transition. A transition that fails moves
//! the loop into the terminal `Failed` state, and every later step returns
//! [`AdaptiveError::Halted`]. The loop owns the current mesh;
//! the system, solution and indicators of a generation are dropped once the mesh is refined.
//! After `cycles` refinements the loop assembles, solves and estimates once more, so the final
//! mesh, solution and indicators always belong together.
use crate::assembly::{assemble_poisson_system, assemble_poisson_system_par, LinearSystem};
use crate::error::{estimate_error_indicators, global_error_estimate};
use crate::io::vtk::FiniteElementMeshDataSetBuilder;
use crate::marking::mark_top_fraction;
use crate::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use crate::mesh::refinement::{refine, RefinementStrategy};
use crate::mesh::{MeshError, TriangleMesh2d};
use crate::problem::{ManufacturedSineProblem, PoissonProblem};
use crate::solver::{ConjugateGradientSolver, LinearSolver, SolveError, SolveOutcome, SolverConfig};
use crate::Real;
use log::{debug, error, info, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;
use std::path::PathBuf;

/// Configuration of an adaptive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Number of cells of the initial unit-square mesh in the x-direction.
    pub nx: usize,
    /// Number of cells of the initial unit-square mesh in the y-direction.
    pub ny: usize,
    /// Number of refinement cycles.
    pub cycles: usize,
    /// Fraction of triangles marked for refinement in each cycle, in `(0, 1]`.
    pub refine_fraction: f64,
    pub strategy: RefinementStrategy,
    pub solver: SolverConfig,
    /// Compute element contributions in parallel.
    pub parallel_assembly: bool,
    /// If set, a VTK snapshot is written to this directory after every estimate.
    pub output_dir: Option<PathBuf>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            nx: 8,
            ny: 8,
            cycles: 4,
            refine_fraction: 0.3,
            strategy: RefinementStrategy::default(),
            solver: SolverConfig::default(),
            parallel_assembly: false,
            output_dir: None,
        }
    }
}

impl AdaptiveConfig {
    pub fn with_resolution(self, nx: usize, ny: usize) -> Self {
        Self { nx, ny, ..self }
    }

    pub fn with_cycles(self, cycles: usize) -> Self {
        Self { cycles, ..self }
    }

    pub fn with_refine_fraction(self, refine_fraction: f64) -> Self {
        Self {
            refine_fraction,
            ..self
        }
    }

    pub fn with_strategy(self, strategy: RefinementStrategy) -> Self {
        Self { strategy, ..self }
    }

    pub fn with_solver(self, solver: SolverConfig) -> Self {
        Self { solver, ..self }
    }

    pub fn with_parallel_assembly(self, parallel_assembly: bool) -> Self {
        Self {
            parallel_assembly,
            ..self
        }
    }

    pub fn with_output_dir(self, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: Some(output_dir.into()),
            ..self
        }
    }

    /// Checks the configuration before any work is done.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.refine_fraction > 0.0 && self.refine_fraction <= 1.0) {
            return Err(ConfigError::InvalidRefineFraction(self.refine_fraction));
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(ConfigError::EmptyInitialMesh { nx: self.nx, ny: self.ny });
        }
        if !(self.solver.tolerance > 0.0) {
            return Err(ConfigError::InvalidSolverTolerance(self.solver.tolerance));
        }
        if self.solver.max_iterations == 0 {
            return Err(ConfigError::ZeroSolverIterations);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidRefineFraction(f64),
    EmptyInitialMesh { nx: usize, ny: usize },
    InvalidSolverTolerance(f64),
    ZeroSolverIterations,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRefineFraction(fraction) => {
                write!(f, "refine fraction must be in (0, 1], got {fraction}")
            }
            Self::EmptyInitialMesh { nx, ny } => {
                write!(f, "initial mesh must have at least one cell in each direction, got {nx}x{ny}")
            }
            Self::InvalidSolverTolerance(tol) => write!(f, "solver tolerance must be positive, got {tol}"),
            Self::ZeroSolverIterations => write!(f, "solver must be allowed at least one iteration"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fatal failures of an adaptive run.
#[derive(Debug)]
pub enum AdaptiveError {
    Config(ConfigError),
    Mesh(MeshError),
    Solver(SolveError),
    Export { path: PathBuf, message: String },
    /// A previous step failed, so the loop cannot continue.
    Halted,
}

impl fmt::Display for AdaptiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Mesh(err) => write!(f, "mesh error: {err}"),
            Self::Solver(err) => write!(f, "solver error: {err}"),
            Self::Export { path, message } => {
                write!(f, "failed to export {}: {message}", path.display())
            }
            Self::Halted => write!(f, "adaptive loop was halted by an earlier failure"),
        }
    }
}

impl std::error::Error for AdaptiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Mesh(err) => Some(err),
            Self::Solver(err) => Some(err),
            Self::Export { .. } | Self::Halted => None,
        }
    }
}

impl From<ConfigError> for AdaptiveError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<MeshError> for AdaptiveError {
    fn from(err: MeshError) -> Self {
        Self::Mesh(err)
    }
}

impl From<SolveError> for AdaptiveError {
    fn from(err: SolveError) -> Self {
        Self::Solver(err)
    }
}

/// Statistics of one generation of the adaptive loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport<T> {
    pub cycle: usize,
    pub num_vertices: usize,
    pub num_triangles: usize,
    pub solver_iterations: usize,
    pub converged: bool,
    /// The global estimate `sqrt(Σ η_K)`.
    pub estimated_error: T,
    pub max_indicator: T,
    /// Number of triangles marked for refinement, zero for the final generation.
    pub num_marked: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdaptiveState<T: Real> {
    Initial,
    Assembled {
        system: LinearSystem<T>,
    },
    Solved {
        solution: DVector<T>,
        converged: bool,
        iterations: usize,
    },
    Estimated {
        solution: DVector<T>,
        indicators: Vec<T>,
    },
    Marked {
        marked: Vec<usize>,
    },
    Refined,
    Finished {
        solution: DVector<T>,
        indicators: Vec<T>,
    },
    /// A transition failed. The data of the interrupted generation is gone.
    Failed,
}

impl<T: Real> AdaptiveState<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Assembled { .. } => "Assembled",
            Self::Solved { .. } => "Solved",
            Self::Estimated { .. } => "Estimated",
            Self::Marked { .. } => "Marked",
            Self::Refined => "Refined",
            Self::Finished { .. } => "Finished",
            Self::Failed => "Failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// The final mesh, solution and indicators of an adaptive run, with per-cycle statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveOutput<T: Real> {
    pub mesh: TriangleMesh2d<T>,
    pub solution: DVector<T>,
    pub indicators: Vec<T>,
    pub reports: Vec<CycleReport<T>>,
}

/// Adaptive finite element loop for a Poisson problem.
pub struct AdaptiveLoop<T: Real, P, S = ConjugateGradientSolver> {
    config: AdaptiveConfig,
    problem: P,
    solver: S,
    mesh: TriangleMesh2d<T>,
    state: AdaptiveState<T>,
    cycle: usize,
    reports: Vec<CycleReport<T>>,
}

impl<T, P> AdaptiveLoop<T, P, ConjugateGradientSolver>
where
    T: Real,
    P: PoissonProblem<T> + Sync,
{
    /// Creates a loop on the unit-square mesh described by the configuration, solving with
    /// conjugate gradient.
    pub fn new(config: AdaptiveConfig, problem: P) -> Result<Self, AdaptiveError> {
        config.validate()?;
        let mesh = create_unit_square_uniform_tri_mesh_2d(config.nx, config.ny);
        let solver = ConjugateGradientSolver::new(config.solver);
        Self::with_mesh_and_solver(config, problem, mesh, solver)
    }
}

impl<T, P, S> AdaptiveLoop<T, P, S>
where
    T: Real,
    P: PoissonProblem<T> + Sync,
    S: LinearSolver<T>,
{
    /// Creates a loop starting from an arbitrary mesh and solver.
    ///
    /// The initial resolution in the configuration is ignored, but the remaining settings are
    /// still validated.
    pub fn with_mesh_and_solver(
        config: AdaptiveConfig,
        problem: P,
        mesh: TriangleMesh2d<T>,
        solver: S,
    ) -> Result<Self, AdaptiveError> {
        config.validate()?;
        mesh.validate()?;
        mesh.check_conformity()?;
        Ok(Self {
            config,
            problem,
            solver,
            mesh,
            state: AdaptiveState::Initial,
            cycle: 0,
            reports: Vec::new(),
        })
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn mesh(&self) -> &TriangleMesh2d<T> {
        &self.mesh
    }

    pub fn state(&self) -> &AdaptiveState<T> {
        &self.state
    }

    /// The index of the current generation, i.e. the number of refinements so far.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn reports(&self) -> &[CycleReport<T>] {
        &self.reports
    }

    /// Performs a single state transition.
    ///
    /// Stepping a finished loop does nothing. If the transition fails, the loop ends up in
    /// [`AdaptiveState::Failed`] and all further steps return [`AdaptiveError::Halted`].
    pub fn step(&mut self) -> Result<(), AdaptiveError> {
        let state = mem::replace(&mut self.state, AdaptiveState::Failed);
        let from = state.name();
        match self.transition(state) {
            Ok(next) => {
                self.state = next;
                debug!("Adaptive loop transition: {} -> {}", from, self.state.name());
                Ok(())
            }
            Err(err) => {
                error!("Adaptive loop failed in state {} (cycle {}): {}", from, self.cycle, err);
                Err(err)
            }
        }
    }

    fn transition(&mut self, state: AdaptiveState<T>) -> Result<AdaptiveState<T>, AdaptiveError> {
        let next = match state {
            AdaptiveState::Initial | AdaptiveState::Refined => AdaptiveState::Assembled {
                system: self.assemble()?,
            },
            AdaptiveState::Assembled { system } => {
                let SolveOutcome {
                    solution,
                    converged,
                    iterations,
                } = self.solver.solve(&system.matrix, &system.rhs)?;
                if !converged {
                    warn!(
                        "Cycle {}: solver did not converge within {} iterations, using last iterate",
                        self.cycle, iterations
                    );
                }
                AdaptiveState::Solved {
                    solution,
                    converged,
                    iterations,
                }
            }
            AdaptiveState::Solved {
                solution,
                converged,
                iterations,
            } => {
                let indicators = estimate_error_indicators(&self.mesh, &solution)?;
                self.record_cycle(&solution, &indicators, converged, iterations)?;
                AdaptiveState::Estimated { solution, indicators }
            }
            AdaptiveState::Estimated { solution, indicators } => {
                if self.cycle >= self.config.cycles {
                    AdaptiveState::Finished { solution, indicators }
                } else {
                    let marked = mark_top_fraction(&indicators, self.config.refine_fraction);
                    if let Some(report) = self.reports.last_mut() {
                        report.num_marked = marked.len();
                    }
                    AdaptiveState::Marked { marked }
                }
            }
            AdaptiveState::Marked { marked } => {
                self.mesh = refine(&self.mesh, &marked, self.config.strategy)?;
                self.cycle += 1;
                debug!(
                    "Cycle {}: refined mesh has {} vertices and {} triangles",
                    self.cycle,
                    self.mesh.num_vertices(),
                    self.mesh.num_cells()
                );
                AdaptiveState::Refined
            }
            finished @ AdaptiveState::Finished { .. } => finished,
            AdaptiveState::Failed => return Err(AdaptiveError::Halted),
        };
        Ok(next)
    }

    /// Steps until the loop is finished and returns the final generation.
    pub fn run_to_completion(mut self) -> Result<AdaptiveOutput<T>, AdaptiveError> {
        while !self.state.is_finished() {
            self.step()?;
        }
        match self.state {
            AdaptiveState::Finished { solution, indicators } => Ok(AdaptiveOutput {
                mesh: self.mesh,
                solution,
                indicators,
                reports: self.reports,
            }),
            _ => unreachable!("Loop only terminates in the finished state or with an error"),
        }
    }

    fn assemble(&self) -> Result<LinearSystem<T>, MeshError> {
        if self.config.parallel_assembly {
            assemble_poisson_system_par(&self.mesh, &self.problem)
        } else {
            assemble_poisson_system(&self.mesh, &self.problem)
        }
    }

    fn record_cycle(
        &mut self,
        solution: &DVector<T>,
        indicators: &[T],
        converged: bool,
        iterations: usize,
    ) -> Result<(), AdaptiveError> {
        let estimated_error = global_error_estimate(indicators);
        let max_indicator = indicators
            .iter()
            .fold(T::zero(), |max, &eta| max.max(eta));
        info!(
            "Cycle {}: {} vertices, {} triangles, {} CG iterations, estimated error {}",
            self.cycle,
            self.mesh.num_vertices(),
            self.mesh.num_cells(),
            iterations,
            estimated_error
        );
        if let Some(output_dir) = &self.config.output_dir {
            let path = output_dir.join(format!("solution_cycle{}.vtu", self.cycle));
            FiniteElementMeshDataSetBuilder::from_mesh(&self.mesh)
                .with_title(format!("Adaptive Poisson, cycle {}", self.cycle))
                .with_point_scalar_attributes("solution", solution.as_slice())
                .with_cell_scalar_attributes("error_indicator", indicators)
                .try_export(&path)
                .map_err(|err| AdaptiveError::Export {
                    message: err.to_string(),
                    path,
                })?;
        }
        self.reports.push(CycleReport {
            cycle: self.cycle,
            num_vertices: self.mesh.num_vertices(),
            num_triangles: self.mesh.num_cells(),
            solver_iterations: iterations,
            converged,
            estimated_error,
            max_indicator,
            num_marked: 0,
        });

        Ok(())
    }
}

/// Runs the adaptive loop for [`ManufacturedSineProblem`] with default solver settings and
/// returns the final mesh, solution and error indicators.
pub fn run(
    nx: usize,
    ny: usize,
    cycles: usize,
    refine_fraction: f64,
) -> Result<(TriangleMesh2d<f64>, DVector<f64>, Vec<f64>), AdaptiveError> {
    let config = AdaptiveConfig::default()
        .with_resolution(nx, ny)
        .with_cycles(cycles)
        .with_refine_fraction(refine_fraction);
    let AdaptiveOutput {
        mesh,
        solution,
        indicators,
        ..
    } = AdaptiveLoop::<f64, _>::new(config, ManufacturedSineProblem)?.run_to_completion()?;
    Ok((mesh, solution, indicators))
}
