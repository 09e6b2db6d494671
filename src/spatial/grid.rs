//! Voxel grids with world-space geometry
//!
//! A grid is a regular 3-D lattice of samples together with the affine map
//! from voxel indices to world coordinates. Scalar volumes and 3-component
//! displacement fields share the same geometry type so that conformance
//! checks and coordinate conversions are written once.

use crate::io::error::{Result, ToolError, invalid_parameter};
use crate::math::interpolation::{Interpolation, sample};
use nalgebra::{Matrix4, Point3, Vector4};
use ndarray::{Array3, Array4, ArrayView3, Axis};

/// Size, spacing and world placement of a voxel lattice
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    /// Number of voxels along each axis, in file order
    pub sizes: [usize; 3],
    /// Signed voxel spacing along each axis
    pub separations: [f64; 3],
    /// Homogeneous map from voxel indices to world coordinates
    pub voxel_to_world: Matrix4<f64>,
    world_to_voxel: Matrix4<f64>,
}

impl GridGeometry {
    /// Build a geometry from an explicit voxel-to-world affine
    ///
    /// Separations are the lengths of the affine's axis columns, carrying the
    /// sign of the column's diagonal entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the affine cannot be inverted
    pub fn new(sizes: [usize; 3], voxel_to_world: Matrix4<f64>) -> Result<Self> {
        let world_to_voxel = voxel_to_world.try_inverse().ok_or_else(|| {
            invalid_parameter(
                "voxel_to_world",
                &format!("{voxel_to_world:?}"),
                &"affine is not invertible",
            )
        })?;

        let mut separations = [0.0; 3];
        for (axis, separation) in separations.iter_mut().enumerate() {
            let column = voxel_to_world.fixed_view::<3, 1>(0, axis);
            let diagonal = voxel_to_world.get((axis, axis)).copied().unwrap_or(0.0);
            let sign = if diagonal < 0.0 { -1.0 } else { 1.0 };
            *separation = sign * column.norm();
        }

        Ok(Self {
            sizes,
            separations,
            voxel_to_world,
            world_to_voxel,
        })
    }

    /// Build an axis-aligned geometry from starts and separations
    ///
    /// # Errors
    ///
    /// Returns an error if any separation is zero
    pub fn axis_aligned(sizes: [usize; 3], starts: [f64; 3], separations: [f64; 3]) -> Result<Self> {
        let mut affine = Matrix4::identity();
        for axis in 0..3 {
            if let Some(entry) = affine.get_mut((axis, axis)) {
                *entry = separations.get(axis).copied().unwrap_or(1.0);
            }
            if let Some(entry) = affine.get_mut((axis, 3)) {
                *entry = starts.get(axis).copied().unwrap_or(0.0);
            }
        }
        Self::new(sizes, affine)
    }

    /// World coordinate of voxel index zero
    pub fn starts(&self) -> [f64; 3] {
        let origin = |row: usize| self.voxel_to_world.get((row, 3)).copied().unwrap_or(0.0);
        [origin(0), origin(1), origin(2)]
    }

    /// Total number of voxels
    pub const fn voxel_count(&self) -> usize {
        self.sizes[0] * self.sizes[1] * self.sizes[2]
    }

    /// Absolute volume of a single voxel
    pub fn voxel_volume(&self) -> f64 {
        (self.separations[0] * self.separations[1] * self.separations[2]).abs()
    }

    /// Convert a (possibly fractional) voxel coordinate to world space
    pub fn voxel_to_world(&self, voxel: [f64; 3]) -> Point3<f64> {
        let world = self.voxel_to_world * Vector4::new(voxel[0], voxel[1], voxel[2], 1.0);
        Point3::new(world.x, world.y, world.z)
    }

    /// Convert a world point to fractional voxel coordinates
    pub fn world_to_voxel(&self, world: &Point3<f64>) -> [f64; 3] {
        let voxel = self.world_to_voxel * world.to_homogeneous();
        [voxel.x, voxel.y, voxel.z]
    }

    /// Fail unless `other` has the same voxel lattice sizes
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ShapeMismatch`] when any axis size differs
    pub fn ensure_conformant(&self, other: &Self) -> Result<()> {
        if self.sizes == other.sizes {
            Ok(())
        } else {
            Err(ToolError::ShapeMismatch {
                expected: self.sizes,
                found: other.sizes,
            })
        }
    }
}

/// Scalar volume: one real value per voxel
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// Lattice placement
    pub geometry: GridGeometry,
    /// Voxel values indexed `[i, j, k]`
    pub data: Array3<f64>,
}

impl VoxelGrid {
    /// Pair a geometry with voxel data of matching shape
    ///
    /// # Errors
    ///
    /// Returns an error if the array shape differs from the geometry sizes
    pub fn new(geometry: GridGeometry, data: Array3<f64>) -> Result<Self> {
        let (n0, n1, n2) = data.dim();
        if [n0, n1, n2] != geometry.sizes {
            return Err(ToolError::ShapeMismatch {
                expected: geometry.sizes,
                found: [n0, n1, n2],
            });
        }
        Ok(Self { geometry, data })
    }

    /// Grid filled with zeros
    pub fn zeros(geometry: GridGeometry) -> Self {
        let [n0, n1, n2] = geometry.sizes;
        Self {
            data: Array3::zeros((n0, n1, n2)),
            geometry,
        }
    }

    /// Value at an integer voxel index
    pub fn get(&self, index: [usize; 3]) -> Option<f64> {
        self.data.get(index).copied()
    }
}

/// Three-component vector volume with the component axis first
#[derive(Debug, Clone)]
pub struct VectorField {
    /// Lattice placement of the spatial axes
    pub geometry: GridGeometry,
    /// Components indexed `[c, i, j, k]` with `c` in `0..3`
    pub data: Array4<f64>,
}

impl VectorField {
    /// Pair a geometry with component data of shape `(3, n0, n1, n2)`
    ///
    /// # Errors
    ///
    /// Returns an error if the array shape does not match the geometry
    pub fn new(geometry: GridGeometry, data: Array4<f64>) -> Result<Self> {
        let (components, n0, n1, n2) = data.dim();
        if components != 3 {
            return Err(invalid_parameter(
                "components",
                &components,
                &"vector fields carry exactly 3 components",
            ));
        }
        if [n0, n1, n2] != geometry.sizes {
            return Err(ToolError::ShapeMismatch {
                expected: geometry.sizes,
                found: [n0, n1, n2],
            });
        }
        Ok(Self { geometry, data })
    }

    /// Field of zero vectors
    pub fn zeros(geometry: GridGeometry) -> Self {
        let [n0, n1, n2] = geometry.sizes;
        Self {
            data: Array4::zeros((3, n0, n1, n2)),
            geometry,
        }
    }

    /// Vector stored at an integer voxel index
    pub fn vector_at(&self, index: [usize; 3]) -> Option<[f64; 3]> {
        let [i, j, k] = index;
        Some([
            *self.data.get([0, i, j, k])?,
            *self.data.get([1, i, j, k])?,
            *self.data.get([2, i, j, k])?,
        ])
    }

    /// Store a vector at an integer voxel index, ignoring indices outside the grid
    pub fn set_vector(&mut self, index: [usize; 3], vector: [f64; 3]) {
        let [i, j, k] = index;
        for (component, value) in vector.into_iter().enumerate() {
            if let Some(slot) = self.data.get_mut([component, i, j, k]) {
                *slot = value;
            }
        }
    }

    /// View of one component as a scalar volume
    pub fn component(&self, component: usize) -> ArrayView3<'_, f64> {
        self.data.index_axis(Axis(0), component.min(2))
    }

    /// Sample all three components at a world point
    pub fn sample_world(&self, world: &Point3<f64>, method: Interpolation) -> [f64; 3] {
        let voxel = self.geometry.world_to_voxel(world);
        [
            sample(&self.component(0), voxel, method, 0.0),
            sample(&self.component(1), voxel, method, 0.0),
            sample(&self.component(2), voxel, method, 0.0),
        ]
    }
}
