//! Adaptive linear finite elements for the Poisson equation on triangle meshes.
//!
//! The crate is organized around the adaptive cycle
//!
//! ```text
//! assemble -> solve -> estimate -> mark -> refine -> assemble -> ...
//! ```
//!
//! with each stage available on its own: [`assembly`] builds and constrains the linear system,
//! [`solver`] provides an iterative solver, [`error`] computes gradient-recovery error
//! indicators, [`marking`] selects elements and [`mesh::refinement`] refines them without
//! introducing hanging nodes. [`adaptive`] ties everything together.
use nalgebra::RealField;

pub mod adaptive;
pub mod assembly;
pub mod connectivity;
pub mod element;
pub mod error;
pub mod io;
pub mod marking;
pub mod mesh;
pub mod problem;
pub mod solver;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;

pub use adaptive::run;

/// Real scalar types supported by the crate.
///
/// Used as a trait alias for the traits frequently needed by generic routines.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
