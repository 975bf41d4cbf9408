//! Export of meshes and fields for visualization.
pub mod vtk;
