//! Bit-packed voxel inclusion masks

use crate::io::configuration::MASK_THRESHOLD;
use crate::io::error::Result;
use crate::spatial::grid::{GridGeometry, VoxelGrid};
use bitvec::prelude::{BitVec, Lsb0};

/// One inclusion bit per voxel, laid out in the grid's logical order
#[derive(Debug, Clone)]
pub struct VoxelMask {
    sizes: [usize; 3],
    bits: BitVec<usize, Lsb0>,
}

impl VoxelMask {
    /// Threshold a mask volume: voxels with value `>= MASK_THRESHOLD` are included
    pub fn from_grid(grid: &VoxelGrid) -> Self {
        let bits = grid.data.iter().map(|&v| v >= MASK_THRESHOLD).collect();
        Self {
            sizes: grid.geometry.sizes,
            bits,
        }
    }

    /// Threshold a mask volume that must share `reference`'s lattice
    ///
    /// # Errors
    ///
    /// Returns a shape mismatch error if the lattices differ
    pub fn conformant_with(reference: &GridGeometry, grid: &VoxelGrid) -> Result<Self> {
        reference.ensure_conformant(&grid.geometry)?;
        Ok(Self::from_grid(grid))
    }

    /// Whether the voxel at `index` is included (indices outside are excluded)
    pub fn contains(&self, index: [usize; 3]) -> bool {
        let [i, j, k] = index;
        let [n0, n1, n2] = self.sizes;
        if i >= n0 || j >= n1 || k >= n2 {
            return false;
        }
        let flat = (i * n1 + j) * n2 + k;
        self.bits.get(flat).is_some_and(|bit| *bit)
    }

    /// Number of included voxels
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }
}
