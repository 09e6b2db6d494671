//! Command-line utilities for neuroimaging volumes
//!
//! Label statistics (per-structure count sums and Jacobian-integrated
//! volumes), dense displacement fields of spatial transforms and their
//! Jacobian determinants, tag-point transform fitting and sampling, and
//! surface-normal projection of displacement fields. Volumes are NIfTI-1;
//! transforms and tags use the MNI text formats.

#![forbid(unsafe_code)]

/// Label accumulation, displacement, Jacobian, sampling and surface passes
pub mod analysis;
/// File formats, command-line plumbing and error handling
pub mod io;
/// Interpolation and optimisation
pub mod math;
/// Voxel grids, vector fields and masks
pub mod spatial;
/// Per-binary argument parsing and entry points
pub mod tools;
/// Spatial transforms and transform fitting
pub mod transform;

pub use io::error::{Result, ToolError};
