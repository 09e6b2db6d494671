//! Sampling of gridded values at fractional voxel coordinates
//!
//! Voxel centres sit at integer coordinates. A coordinate is inside the grid
//! while it lies within half a voxel of the outermost centres; anything
//! further out reads as the caller's outside value.

use ndarray::ArrayView3;

/// Interpolation scheme used when sampling between voxel centres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Value of the closest voxel centre
    #[default]
    NearestNeighbour,
    /// Trilinear blend of the eight surrounding voxel centres
    Trilinear,
}

/// Sample `data` at a fractional voxel coordinate
pub fn sample(
    data: &ArrayView3<'_, f64>,
    voxel: [f64; 3],
    method: Interpolation,
    outside_value: f64,
) -> f64 {
    let (n0, n1, n2) = data.dim();
    let sizes = [n0, n1, n2];

    if !voxel
        .iter()
        .zip(sizes.iter())
        .all(|(&v, &n)| n > 0 && v >= -0.5 && v <= n as f64 - 0.5)
    {
        return outside_value;
    }

    match method {
        Interpolation::NearestNeighbour => {
            let index = nearest_index(voxel, sizes);
            data.get(index).copied().unwrap_or(outside_value)
        }
        Interpolation::Trilinear => trilinear(data, voxel, sizes, outside_value),
    }
}

// Half-way points round up, then clamp into the grid
fn nearest_index(voxel: [f64; 3], sizes: [usize; 3]) -> [usize; 3] {
    let mut index = [0usize; 3];
    for ((slot, &v), &n) in index.iter_mut().zip(voxel.iter()).zip(sizes.iter()) {
        let rounded = (v + 0.5).floor().max(0.0) as usize;
        *slot = rounded.min(n.saturating_sub(1));
    }
    index
}

fn trilinear(
    data: &ArrayView3<'_, f64>,
    voxel: [f64; 3],
    sizes: [usize; 3],
    outside_value: f64,
) -> f64 {
    let mut low = [0usize; 3];
    let mut high = [0usize; 3];
    let mut fraction = [0.0f64; 3];

    for axis in 0..3 {
        let n = sizes.get(axis).copied().unwrap_or(1);
        let last = n.saturating_sub(1) as f64;
        let v = voxel.get(axis).copied().unwrap_or(0.0).clamp(0.0, last);
        let floor = v.floor();
        let lo = floor as usize;
        if let Some(slot) = low.get_mut(axis) {
            *slot = lo;
        }
        if let Some(slot) = high.get_mut(axis) {
            *slot = (lo + 1).min(n.saturating_sub(1));
        }
        if let Some(slot) = fraction.get_mut(axis) {
            *slot = v - floor;
        }
    }

    let mut total = 0.0;
    for corner in 0..8u8 {
        let mut index = [0usize; 3];
        let mut weight = 1.0;
        for axis in 0..3 {
            let use_high = corner & (1 << axis) != 0;
            let f = fraction.get(axis).copied().unwrap_or(0.0);
            let (source, w) = if use_high {
                (&high, f)
            } else {
                (&low, 1.0 - f)
            };
            if let (Some(slot), Some(&i)) = (index.get_mut(axis), source.get(axis)) {
                *slot = i;
            }
            weight *= w;
        }
        if weight == 0.0 {
            continue;
        }
        let Some(&value) = data.get(index) else {
            return outside_value;
        };
        total = weight.mul_add(value, total);
    }
    total
}
