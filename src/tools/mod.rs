//! One module per command-line tool
//!
//! Each module owns the tool's clap argument struct, the immutable
//! configuration built from it and the `run` function its binary calls.

/// `compute_counts_for_labels`
pub mod counts;
/// `compute_determinant`
pub mod determinant;
/// `minc_displacement`
pub mod displacement;
/// `object_volume_dot_product`
pub mod dot_product;
/// `label_volumes_from_jacobians`
pub mod jacobians;
/// `tagtoxfm`
pub mod tagtoxfm;
/// `xfm2tag`
pub mod xfm2tag;

use crate::analysis::accumulate::{AccumulationRule, LabelTable};
use crate::io::error::{Result, WithPath};
use crate::io::volume::read_volume;
use crate::spatial::grid::VoxelGrid;
use log::info;
use std::io::Write;
use std::path::Path;

/// Accumulate `values` per label of `structures` and write the `label, total` report
///
/// # Errors
///
/// Returns an error if either volume cannot be read, the volumes are not
/// conformant, a label is invalid, or the report cannot be written
pub fn label_report<W, R>(structures: &Path, values: &Path, rule: R, out: &mut W) -> Result<()>
where
    W: Write,
    R: FnOnce(&VoxelGrid) -> AccumulationRule,
{
    let labels = read_volume(structures)?;
    let value_grid = read_volume(values)?;
    let rule = rule(&labels);

    let table = LabelTable::accumulate(&labels, &value_grid, rule)?;
    info!(
        "accumulated {} voxels into {} label slots",
        labels.geometry.voxel_count(),
        table.len()
    );
    table
        .write_report(out)
        .with_path(Path::new("<stdout>"), "write report")
}
