//! Per-label accumulation of a value volume over a segmentation
//!
//! Label volumes are frequently stored as near-integers (a label of 2 may
//! read back as 1.98 or 2.02), so every label voxel is rounded half-up before
//! it is used as a table key. Only labels actually present get an entry, so
//! sparse label sets such as `2, 4, 8, 13` and very large label ids cost one
//! slot each.

use crate::io::configuration::LABEL_ROUNDING_OFFSET;
use crate::io::error::{Result, ToolError};
use crate::spatial::grid::VoxelGrid;
use std::collections::BTreeMap;
use std::io::Write;

/// How a value voxel contributes to its label's total
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccumulationRule {
    /// Add the value as-is
    Sum,
    /// Add `voxel_volume * exp(value)`, treating values as log Jacobians
    JacobianVolume {
        /// Absolute volume of one voxel
        voxel_volume: f64,
    },
}

impl AccumulationRule {
    /// Jacobian rule with the voxel volume taken from a label grid's header
    pub fn jacobian_for(labels: &VoxelGrid) -> Self {
        Self::JacobianVolume {
            voxel_volume: labels.geometry.voxel_volume(),
        }
    }

    /// Contribution of a single value voxel
    pub fn contribution(self, value: f64) -> f64 {
        match self {
            Self::Sum => value,
            Self::JacobianVolume { voxel_volume } => voxel_volume * value.exp(),
        }
    }
}

/// Round a label voxel value half-up to its integer label
pub fn round_label(value: f64) -> i64 {
    (value + LABEL_ROUNDING_OFFSET).floor() as i64
}

/// Accumulated totals keyed by label
///
/// Labels between zero and the largest observed label that never occur read
/// as a zero total.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelTable {
    totals: BTreeMap<usize, f64>,
}

impl LabelTable {
    /// Accumulate `values` into the labels of `labels`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The two grids do not share voxel lattice sizes
    /// - A label voxel is not finite or rounds to a negative label
    pub fn accumulate(labels: &VoxelGrid, values: &VoxelGrid, rule: AccumulationRule) -> Result<Self> {
        labels.geometry.ensure_conformant(&values.geometry)?;

        let mut totals = BTreeMap::new();
        for (voxel, (&raw, &value)) in labels.data.iter().zip(values.data.iter()).enumerate() {
            let label = checked_label(raw, voxel)?;
            *totals.entry(label).or_insert(0.0) += rule.contribution(value);
        }

        Ok(Self { totals })
    }

    /// Largest observed label plus one, the extent of the implied dense table
    pub fn len(&self) -> usize {
        self.totals
            .last_key_value()
            .map_or(0, |(&label, _)| label.saturating_add(1))
    }

    /// Whether no label was observed
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Total for one label, zero for labels never seen
    pub fn total(&self, label: usize) -> f64 {
        self.totals.get(&label).copied().unwrap_or(0.0)
    }

    /// Labels with a non-zero total in ascending order
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.totals
            .iter()
            .filter(|&(_, &total)| total != 0.0)
            .map(|(&label, &total)| (label, total))
    }

    /// Write one `label, total` line per non-zero label
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails
    pub fn write_report<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for (label, total) in self.entries() {
            writeln!(out, "{label}, {total:.6}")?;
        }
        out.flush()
    }
}

fn checked_label(raw: f64, voxel: usize) -> Result<usize> {
    if !raw.is_finite() {
        return Err(ToolError::InvalidLabel { value: raw, voxel });
    }
    let label = round_label(raw);
    if label < 0 {
        return Err(ToolError::NegativeLabel { label, voxel });
    }
    usize::try_from(label)
        .ok()
        .ok_or(ToolError::InvalidLabel { value: raw, voxel })
}
