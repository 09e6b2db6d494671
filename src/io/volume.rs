//! NIfTI-1 volume input and output
//!
//! Volumes are decoded through the `nifti` crate and converted to real
//! values with the header's scaling applied. Output files are laid out by
//! hand as single-file NIfTI-1 (`.nii`), gzip compressed when the name ends
//! in `.gz`. Integer output types map a real range onto the full integer
//! range through `scl_slope`/`scl_inter`.
//!
//! The writer in `nifti` always stores `scl_slope = 1` and `scl_inter = 0`,
//! so it cannot describe those scaled outputs. Its `ndarray_volumes` feature
//! is also built on ndarray 0.15 while this crate uses 0.16.

use crate::io::error::{Result, ToolError, WithPath};
use crate::spatial::grid::{GridGeometry, VectorField, VoxelGrid};
use flate2::Compression;
use flate2::write::GzEncoder;
use nalgebra::Matrix4;
use ndarray::{Array3, Array4};
use nifti::volume::{NiftiVolume, RandomAccessNiftiVolume};
use nifti::{NiftiHeader, NiftiObject, ReaderOptions};
use num_traits::{Bounded, NumCast, Zero};
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER_SIZE: usize = 348;
const VOXEL_OFFSET: usize = 352;
const INTENT_VECTOR: i16 = 1007;
const UNITS_MM: u8 = 2;
const DESCRIPTION_LENGTH: usize = 80;

/// Sample type of a written volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// Unsigned 8-bit integers
    Byte,
    /// Signed 16-bit integers
    #[default]
    Short,
    /// Signed 32-bit integers
    Int,
    /// Single-precision floating point
    Float,
    /// Double-precision floating point
    Double,
}

impl OutputType {
    /// NIfTI `datatype` code
    pub const fn datatype_code(self) -> i16 {
        match self {
            Self::Byte => 2,
            Self::Short => 4,
            Self::Int => 8,
            Self::Float => 16,
            Self::Double => 64,
        }
    }

    /// Bits per stored sample
    pub const fn bits_per_sample(self) -> i16 {
        match self {
            Self::Byte => 8,
            Self::Short => 16,
            Self::Int | Self::Float => 32,
            Self::Double => 64,
        }
    }

    /// Whether samples are stored as scaled integers
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int)
    }

    /// Representable stored range
    pub const fn stored_range(self) -> (f64, f64) {
        match self {
            Self::Byte => (0.0, 255.0),
            Self::Short => (i16::MIN as f64, i16::MAX as f64),
            Self::Int => (i32::MIN as f64, i32::MAX as f64),
            Self::Float => (f32::MIN as f64, f32::MAX as f64),
            Self::Double => (f64::MIN, f64::MAX),
        }
    }
}

/// Linear map from stored samples to real values: `real = stored * slope + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    /// Multiplier applied to stored samples
    pub slope: f64,
    /// Offset added after the multiplier
    pub intercept: f64,
}

impl Scaling {
    /// Scaling that stores real values directly
    pub const IDENTITY: Self = Self {
        slope: 1.0,
        intercept: 0.0,
    };

    /// Scaling for `output_type` so that `real_range` spans the stored range
    ///
    /// Floating point types always use the identity scaling.
    pub fn for_range(output_type: OutputType, real_range: (f64, f64)) -> Self {
        if !output_type.is_integer() {
            return Self::IDENTITY;
        }
        let (stored_min, stored_max) = output_type.stored_range();
        let (real_min, real_max) = real_range;
        let slope = (real_max - real_min) / (stored_max - stored_min);
        if slope.is_finite() && slope > 0.0 {
            Self {
                slope,
                intercept: stored_min.mul_add(-slope, real_min),
            }
        } else {
            Self {
                slope: 1.0,
                intercept: real_min - stored_min,
            }
        }
    }

    /// Stored (unrounded) sample for a real value
    pub fn to_stored(self, real: f64) -> f64 {
        (real - self.intercept) / self.slope
    }
}

/// Options controlling how a volume is written
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Sample type on disk
    pub output_type: OutputType,
    /// Real range mapped onto integer types; `None` uses the data's own range
    pub real_range: Option<(f64, f64)>,
    /// Provenance text stored in the header description field
    pub description: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            output_type: OutputType::Float,
            real_range: None,
            description: String::new(),
        }
    }
}

/// Read a scalar volume, applying the header's intensity scaling
///
/// Trailing axes of length one are ignored, so 2-D and singleton 4-D files
/// read as 3-D grids.
///
/// # Errors
///
/// Returns an error if the file cannot be decoded or has more than three
/// non-singleton axes
pub fn read_volume(path: &Path) -> Result<VoxelGrid> {
    let object = open(path)?;
    let geometry = geometry_from_header(path, object.header())?;
    let volume = object.volume();

    let dims: Vec<usize> = volume.dim().iter().map(|&d| d as usize).collect();
    if dims.iter().skip(3).any(|&d| d != 1) {
        return Err(read_error(
            path,
            &format!("expected a 3-D volume, found dimensions {dims:?}"),
        ));
    }

    let [n0, n1, n2] = geometry.sizes;
    let mut coords = volume.dim().to_vec();
    let mut data = Array3::zeros((n0, n1, n2));
    for ((i, j, k), slot) in data.indexed_iter_mut() {
        for (axis, coordinate) in coords.iter_mut().enumerate() {
            *coordinate = match axis {
                0 => i as _,
                1 => j as _,
                2 => k as _,
                _ => 0,
            };
        }
        *slot = volume
            .get_f64(&coords)
            .map_err(|e| read_error(path, &e))?;
    }

    VoxelGrid::new(geometry, data)
}

/// Read only the lattice geometry of a volume
///
/// # Errors
///
/// Returns an error if the file cannot be decoded
pub fn read_geometry(path: &Path) -> Result<GridGeometry> {
    let object = open(path)?;
    geometry_from_header(path, object.header())
}

/// Read a 3-component vector field
///
/// Accepts the 5-D layout `(nx, ny, nz, 1, 3)` written by [`write_vector_field`]
/// and the 4-D layout `(nx, ny, nz, 3)`.
///
/// # Errors
///
/// Returns an error if the file cannot be decoded or has no 3-component axis
pub fn read_vector_field(path: &Path) -> Result<VectorField> {
    let object = open(path)?;
    let geometry = geometry_from_header(path, object.header())?;
    let volume = object.volume();

    let dims: Vec<usize> = volume.dim().iter().map(|&d| d as usize).collect();
    let component_axis = match dims.as_slice() {
        [_, _, _, 3] => 3,
        [_, _, _, 1, 3] => 4,
        _ => {
            return Err(read_error(
                path,
                &format!("expected a 3-component vector field, found dimensions {dims:?}"),
            ));
        }
    };

    let [n0, n1, n2] = geometry.sizes;
    let mut coords = volume.dim().to_vec();
    let mut data = Array4::zeros((3, n0, n1, n2));
    for ((c, i, j, k), slot) in data.indexed_iter_mut() {
        for (axis, coordinate) in coords.iter_mut().enumerate() {
            *coordinate = match axis {
                0 => i as _,
                1 => j as _,
                2 => k as _,
                a if a == component_axis => c as _,
                _ => 0,
            };
        }
        *slot = volume
            .get_f64(&coords)
            .map_err(|e| read_error(path, &e))?;
    }

    VectorField::new(geometry, data)
}

/// Write a scalar volume
///
/// # Errors
///
/// Returns an error if the lattice is too large for NIfTI-1 or the file
/// cannot be written
pub fn write_volume(path: &Path, grid: &VoxelGrid, options: &WriteOptions) -> Result<()> {
    let [n0, n1, n2] = grid.geometry.sizes;
    let range = options.real_range.unwrap_or_else(|| value_range(grid.data.iter()));
    let scaling = Scaling::for_range(options.output_type, range);

    let mut samples = Vec::with_capacity(grid.data.len());
    for k in 0..n2 {
        for j in 0..n1 {
            for i in 0..n0 {
                samples.push(grid.data.get([i, j, k]).copied().unwrap_or(0.0));
            }
        }
    }

    let header = encode_header(
        path,
        &grid.geometry,
        &[n0, n1, n2],
        0,
        scaling,
        options,
    )?;
    write_file(path, &header, &samples, options.output_type, scaling)
}

/// Write a displacement field as a 5-D NIfTI vector volume
///
/// # Errors
///
/// Returns an error if the lattice is too large for NIfTI-1 or the file
/// cannot be written
pub fn write_vector_field(path: &Path, field: &VectorField, options: &WriteOptions) -> Result<()> {
    let [n0, n1, n2] = field.geometry.sizes;
    let range = options.real_range.unwrap_or_else(|| value_range(field.data.iter()));
    let scaling = Scaling::for_range(options.output_type, range);

    let mut samples = Vec::with_capacity(field.data.len());
    for c in 0..3 {
        for k in 0..n2 {
            for j in 0..n1 {
                for i in 0..n0 {
                    samples.push(field.data.get([c, i, j, k]).copied().unwrap_or(0.0));
                }
            }
        }
    }

    let header = encode_header(
        path,
        &field.geometry,
        &[n0, n1, n2, 1, 3],
        INTENT_VECTOR,
        scaling,
        options,
    )?;
    write_file(path, &header, &samples, options.output_type, scaling)
}

fn open(path: &Path) -> Result<nifti::InMemNiftiObject> {
    ReaderOptions::new()
        .read_file(path)
        .map_err(|e| read_error(path, &e))
}

fn read_error(path: &Path, reason: &impl ToString) -> ToolError {
    ToolError::VolumeRead {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_error(path: &Path, reason: &impl ToString) -> ToolError {
    ToolError::VolumeWrite {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn geometry_from_header(path: &Path, header: &NiftiHeader) -> Result<GridGeometry> {
    let rank = (header.dim[0] as usize).clamp(1, 7);
    let size = |axis: usize| {
        header
            .dim
            .get(axis)
            .filter(|_| axis <= rank)
            .map_or(1, |&d| (d as usize).max(1))
    };
    let sizes = [size(1), size(2), size(3)];

    let affine = if header.sform_code > 0 {
        sform_affine(header)
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        pixdim_affine(header)
    };

    GridGeometry::new(sizes, affine).map_err(|e| read_error(path, &e))
}

fn sform_affine(header: &NiftiHeader) -> Matrix4<f64> {
    let row = |r: &[f32; 4]| [r[0] as f64, r[1] as f64, r[2] as f64, r[3] as f64];
    let [x, y, z] = [row(&header.srow_x), row(&header.srow_y), row(&header.srow_z)];
    Matrix4::new(
        x[0], x[1], x[2], x[3], //
        y[0], y[1], y[2], y[3], //
        z[0], z[1], z[2], z[3], //
        0.0, 0.0, 0.0, 1.0,
    )
}

// Quaternion form: rotation from (b, c, d), voxel sizes from pixdim, qfac in pixdim[0]
fn qform_affine(header: &NiftiHeader) -> Matrix4<f64> {
    let b = header.quatern_b as f64;
    let c = header.quatern_c as f64;
    let d = header.quatern_d as f64;
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let dx = header.pixdim[1] as f64;
    let dy = header.pixdim[2] as f64;
    let dz = qfac * header.pixdim[3] as f64;

    let r11 = a * a + b * b - c * c - d * d;
    let r12 = 2.0 * (b * c - a * d);
    let r13 = 2.0 * (b * d + a * c);
    let r21 = 2.0 * (b * c + a * d);
    let r22 = a * a + c * c - b * b - d * d;
    let r23 = 2.0 * (c * d - a * b);
    let r31 = 2.0 * (b * d - a * c);
    let r32 = 2.0 * (c * d + a * b);
    let r33 = a * a + d * d - c * c - b * b;

    Matrix4::new(
        r11 * dx, r12 * dy, r13 * dz, header.quatern_x as f64, //
        r21 * dx, r22 * dy, r23 * dz, header.quatern_y as f64, //
        r31 * dx, r32 * dy, r33 * dz, header.quatern_z as f64, //
        0.0, 0.0, 0.0, 1.0,
    )
}

fn pixdim_affine(header: &NiftiHeader) -> Matrix4<f64> {
    let spacing = |axis: usize| {
        let value = header.pixdim.get(axis).map_or(1.0, |&v| v as f64);
        if value == 0.0 { 1.0 } else { value }
    };
    Matrix4::new(
        spacing(1), 0.0, 0.0, 0.0, //
        0.0, spacing(2), 0.0, 0.0, //
        0.0, 0.0, spacing(3), 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

fn value_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min > max { (0.0, 0.0) } else { (min, max) }
}

fn encode_header(
    path: &Path,
    geometry: &GridGeometry,
    dims: &[usize],
    intent_code: i16,
    scaling: Scaling,
    options: &WriteOptions,
) -> Result<Vec<u8>> {
    let mut header = vec![0u8; VOXEL_OFFSET];

    put(&mut header, 0, &(HEADER_SIZE as i32).to_le_bytes());
    put(&mut header, 38, b"r");

    let mut dim = [1i16; 8];
    if let Some(rank) = dim.first_mut() {
        *rank = dims.len() as i16;
    }
    for (slot, &size) in dim.iter_mut().skip(1).zip(dims.iter()) {
        *slot = i16::try_from(size).map_err(|e| {
            write_error(path, &format!("dimension {size} exceeds NIfTI-1 limits: {e}"))
        })?;
    }
    for (index, value) in dim.iter().enumerate() {
        put(&mut header, 40 + index * 2, &value.to_le_bytes());
    }

    put(&mut header, 68, &intent_code.to_le_bytes());
    put(&mut header, 70, &options.output_type.datatype_code().to_le_bytes());
    put(&mut header, 72, &options.output_type.bits_per_sample().to_le_bytes());

    let mut pixdim = [1.0f32; 8];
    for (slot, separation) in pixdim.iter_mut().skip(1).zip(geometry.separations.iter()) {
        *slot = separation.abs() as f32;
    }
    for (index, value) in pixdim.iter().enumerate() {
        put(&mut header, 76 + index * 4, &value.to_le_bytes());
    }

    put(&mut header, 108, &(VOXEL_OFFSET as f32).to_le_bytes());
    put(&mut header, 112, &(scaling.slope as f32).to_le_bytes());
    put(&mut header, 116, &(scaling.intercept as f32).to_le_bytes());
    put(&mut header, 123, &[UNITS_MM]);

    let description = options.description.as_bytes();
    let kept = description.len().min(DESCRIPTION_LENGTH - 1);
    put(&mut header, 148, description.get(..kept).unwrap_or_default());

    // sform_code = 1 (scanner anatomical)
    put(&mut header, 254, &1i16.to_le_bytes());
    for (row, offset) in [280usize, 296, 312].into_iter().enumerate() {
        for column in 0..4 {
            let value = geometry
                .voxel_to_world
                .get((row, column))
                .copied()
                .unwrap_or(0.0);
            put(&mut header, offset + column * 4, &(value as f32).to_le_bytes());
        }
    }

    put(&mut header, 344, b"n+1\0");
    Ok(header)
}

fn put(buffer: &mut [u8], offset: usize, bytes: &[u8]) {
    if let Some(target) = buffer.get_mut(offset..offset + bytes.len()) {
        target.copy_from_slice(bytes);
    }
}

fn write_file(
    path: &Path,
    header: &[u8],
    samples: &[f64],
    output_type: OutputType,
    scaling: Scaling,
) -> Result<()> {
    let mut payload = Vec::with_capacity(
        header.len() + samples.len() * (output_type.bits_per_sample() as usize / 8),
    );
    payload.extend_from_slice(header);
    match output_type {
        OutputType::Byte => encode_samples::<u8>(samples, scaling, &mut payload),
        OutputType::Short => encode_samples::<i16>(samples, scaling, &mut payload),
        OutputType::Int => encode_samples::<i32>(samples, scaling, &mut payload),
        OutputType::Float => encode_samples::<f32>(samples, scaling, &mut payload),
        OutputType::Double => encode_samples::<f64>(samples, scaling, &mut payload),
    }

    let file = std::fs::File::create(path).with_path(path, "create volume")?;
    let mut writer = BufWriter::new(file);
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        encoder.write_all(&payload).with_path(path, "write volume")?;
        writer = encoder.finish().with_path(path, "compress volume")?;
    } else {
        writer.write_all(&payload).with_path(path, "write volume")?;
    }
    writer.flush().with_path(path, "flush volume")
}

/// Sample type that can be stored in an output volume
trait StoredSample: Bounded + NumCast + Zero + Copy {
    const INTEGER: bool;

    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! stored_sample {
    ($($ty:ty => $integer:expr),* $(,)?) => {
        $(
            impl StoredSample for $ty {
                const INTEGER: bool = $integer;

                fn extend_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

stored_sample!(u8 => true, i16 => true, i32 => true, f32 => false, f64 => false);

fn encode_samples<T: StoredSample>(samples: &[f64], scaling: Scaling, out: &mut Vec<u8>) {
    let low = T::min_value().to_f64().unwrap_or(f64::MIN);
    let high = T::max_value().to_f64().unwrap_or(f64::MAX);
    for &real in samples {
        let mut stored = scaling.to_stored(real);
        if T::INTEGER {
            stored = stored.round();
        }
        let sample = if stored.is_nan() {
            T::zero()
        } else {
            <T as NumCast>::from(stored.clamp(low, high)).unwrap_or_else(T::zero)
        };
        sample.extend_le(out);
    }
}
