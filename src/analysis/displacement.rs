//! Dense displacement fields sampled from a spatial transform

use crate::io::progress::SliceProgress;
use crate::spatial::grid::{GridGeometry, VectorField};
use crate::transform::general::GeneralTransform;

/// Evaluate `transform(p) - p` at the world position of every voxel of `geometry`
///
/// The field shares the reference geometry; progress advances once per slice
/// of the first axis.
pub fn displacement_field(
    geometry: &GridGeometry,
    transform: &GeneralTransform,
    progress: &SliceProgress,
) -> VectorField {
    let mut field = VectorField::zeros(geometry.clone());
    let [n0, n1, n2] = geometry.sizes;

    for i in 0..n0 {
        for j in 0..n1 {
            for k in 0..n2 {
                let world = geometry.voxel_to_world([i as f64, j as f64, k as f64]);
                let displacement = transform.displacement(&world);
                field.set_vector([i, j, k], displacement.into());
            }
        }
        progress.advance();
    }
    progress.finish();

    field
}
