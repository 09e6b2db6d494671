//! Sparse sampling of a transform into tag point pairs

use crate::spatial::grid::GridGeometry;
use crate::spatial::mask::VoxelMask;
use crate::transform::general::GeneralTransform;
use nalgebra::Point3;

/// Sample `transform` on a lattice of every `stride`-th voxel
///
/// Indices `0, s, 2s, …` are visited while they stay below `size - s` on each
/// axis, so the far border of the grid is never sampled. Each visited voxel
/// that passes the optional mask yields `(transform(world), world)`.
pub fn sample_transform_tags(
    geometry: &GridGeometry,
    transform: &GeneralTransform,
    mask: Option<&VoxelMask>,
    stride: usize,
) -> Vec<(Point3<f64>, Point3<f64>)> {
    let stride = stride.max(1);
    let axis = |n: usize| (0..n.saturating_sub(stride)).step_by(stride);
    let [n0, n1, n2] = geometry.sizes;

    let mut pairs = Vec::new();
    for i in axis(n0) {
        for j in axis(n1) {
            for k in axis(n2) {
                if mask.is_some_and(|m| !m.contains([i, j, k])) {
                    continue;
                }
                let world = geometry.voxel_to_world([i as f64, j as f64, k as f64]);
                pairs.push((transform.transform_point(&world), world));
            }
        }
    }
    pairs
}
