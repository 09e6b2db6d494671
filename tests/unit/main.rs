//! Unit tests mirroring the `src/` tree, one file per source file


use nalgebra::Point3;
use ndarray::Array3;
use neurovol::io::volume::{OutputType, WriteOptions, write_volume};
use neurovol::spatial::grid::{GridGeometry, VoxelGrid};
use std::path::{Path, PathBuf};

/// Axis-aligned geometry with unit spacing and the origin at voxel zero
pub fn unit_geometry(sizes: [usize; 3]) -> GridGeometry {
    GridGeometry::axis_aligned(sizes, [0.0; 3], [1.0; 3]).unwrap()
}

/// Grid whose values are listed in `[i, j, k]` order with `k` fastest
pub fn grid_from(sizes: [usize; 3], values: Vec<f64>) -> VoxelGrid {
    let [n0, n1, n2] = sizes;
    let data = Array3::from_shape_vec((n0, n1, n2), values).unwrap();
    VoxelGrid::new(unit_geometry(sizes), data).unwrap()
}

/// Write `grid` as a float volume named `name` inside `dir`
pub fn write_grid(dir: &Path, name: &str, grid: &VoxelGrid) -> PathBuf {
    let path = dir.join(name);
    let options = WriteOptions {
        output_type: OutputType::Float,
        ..WriteOptions::default()
    };
    write_volume(&path, grid, &options).unwrap();
    path
}

/// Whether two points agree to within `tolerance` on every axis
pub fn points_close(a: &Point3<f64>, b: &Point3<f64>, tolerance: f64) -> bool {
    (a - b).amax() < tolerance
}
