//! Per-voxel and per-vertex passes that produce each tool's output

/// Label accumulator and report
pub mod accumulate;
/// Displacement field of a transform over a grid
pub mod displacement;
/// Jacobian determinants and smoothing of displacement fields
pub mod jacobian;
/// Sparse tag sampling of a transform
pub mod sampling;
/// Displacement projected onto surface normals
pub mod surface;
