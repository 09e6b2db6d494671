//! Jacobian determinants of displacement fields
//!
//! The Jacobian of `x -> x + u(x)` is `I + du/dx`. Derivatives of `u` are
//! taken along voxel axes by central differences, one-sided on the border
//! and zero along an axis of a single voxel, then mapped onto world axes
//! through the inverse of the grid's voxel-to-world matrix.

use crate::io::error::{Result, computation_error, invalid_parameter};
use crate::io::progress::SliceProgress;
use crate::spatial::grid::{VectorField, VoxelGrid};
use log::debug;
use nalgebra::{Matrix3, Vector3};
use ndarray::{Array4, Axis};

// FWHM = 2 * sqrt(2 ln 2) * sigma
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

/// Determinant of the Jacobian of `x -> x + field(x)` at every voxel
///
/// Progress advances once per slice of the first axis.
///
/// # Errors
///
/// Returns an error if the field's voxel axes are degenerate
pub fn jacobian_determinant(field: &VectorField, progress: &SliceProgress) -> Result<VoxelGrid> {
    let geometry = &field.geometry;
    let world_to_voxel = geometry
        .voxel_to_world
        .fixed_view::<3, 3>(0, 0)
        .into_owned()
        .try_inverse()
        .ok_or_else(|| computation_error("jacobian determinant", &"voxel axes are degenerate"))?;

    let mut determinant = VoxelGrid::zeros(geometry.clone());
    let [n0, n1, n2] = geometry.sizes;
    for i in 0..n0 {
        for j in 0..n1 {
            for k in 0..n2 {
                let index = [i, j, k];
                let gradient = Matrix3::from_columns(&[
                    voxel_derivative(field, index, 0),
                    voxel_derivative(field, index, 1),
                    voxel_derivative(field, index, 2),
                ]);
                let jacobian = Matrix3::identity() + gradient * world_to_voxel;
                if let Some(slot) = determinant.data.get_mut(index) {
                    *slot = jacobian.determinant();
                }
            }
        }
        progress.advance();
    }
    progress.finish();

    Ok(determinant)
}

// d(field)/d(voxel index) along `axis`
fn voxel_derivative(field: &VectorField, index: [usize; 3], axis: usize) -> Vector3<f64> {
    let size = field.geometry.sizes.get(axis).copied().unwrap_or(1);
    let position = index.get(axis).copied().unwrap_or(0);
    if size < 2 {
        return Vector3::zeros();
    }

    let lower = position.saturating_sub(1);
    let upper = (position + 1).min(size - 1);
    let at = |offset: usize| {
        let mut neighbour = index;
        if let Some(slot) = neighbour.get_mut(axis) {
            *slot = offset;
        }
        field
            .vector_at(neighbour)
            .map_or_else(Vector3::zeros, Vector3::from)
    };
    (at(upper) - at(lower)) / (upper - lower) as f64
}

/// Natural logarithm of every determinant
///
/// # Errors
///
/// Returns a computation error naming the first voxel whose determinant is
/// not positive (a folded transform)
pub fn log_determinant(mut determinant: VoxelGrid) -> Result<VoxelGrid> {
    for ((i, j, k), value) in determinant.data.indexed_iter_mut() {
        if *value <= 0.0 || !value.is_finite() {
            return Err(computation_error(
                "log determinant",
                &format!("determinant {value} at voxel ({i}, {j}, {k}) is not positive"),
            ));
        }
        *value = value.ln();
    }
    Ok(determinant)
}

/// Gaussian-smooth every component of a displacement field
///
/// `fwhm` is in world units; each axis uses its own voxel spacing. Borders
/// replicate the edge voxel.
///
/// # Errors
///
/// Returns an error if `fwhm` is not a positive finite number
pub fn smooth_field(field: &VectorField, fwhm: f64) -> Result<VectorField> {
    if !(fwhm.is_finite() && fwhm > 0.0) {
        return Err(invalid_parameter("smooth", &fwhm, &"FWHM must be positive"));
    }
    let sigma = fwhm / FWHM_PER_SIGMA;

    let mut data = field.data.clone();
    for (axis, separation) in field.geometry.separations.iter().enumerate() {
        let kernel = gaussian_kernel(sigma / separation.abs());
        debug!("smoothing axis {axis} with a {}-tap kernel", kernel.len());
        convolve_axis(&mut data, axis, &kernel);
    }
    VectorField::new(field.geometry.clone(), data)
}

// Normalised kernel of radius ceil(3 sigma), sigma in voxels
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as usize;
    let weights: Vec<f64> = (0..=2 * radius)
        .map(|tap| {
            let x = tap as f64 - radius as f64;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

// Convolve along spatial `axis` of a `[c, i, j, k]` array, replicating edges
fn convolve_axis(data: &mut Array4<f64>, axis: usize, kernel: &[f64]) {
    let radius = kernel.len() / 2;
    for mut lane in data.lanes_mut(Axis(axis + 1)) {
        let original = lane.to_vec();
        let last = original.len().saturating_sub(1);
        for (position, slot) in lane.iter_mut().enumerate() {
            *slot = kernel
                .iter()
                .enumerate()
                .map(|(tap, weight)| {
                    let source = (position + tap).saturating_sub(radius).min(last);
                    original.get(source).copied().unwrap_or(0.0) * weight
                })
                .sum();
        }
    }
}
