//! Voxel lattices and their world-space placement
//!
//! This module contains:
//! - Grid geometry with voxel/world conversion
//! - Scalar volumes and vector fields
//! - Bit-packed inclusion masks

/// Grid geometry, scalar volumes and vector fields
pub mod grid;
/// Thresholded inclusion masks
pub mod mask;

pub use grid::{GridGeometry, VectorField, VoxelGrid};
