//! Integrate Jacobian determinants into per-label volumes

use crate::analysis::accumulate::AccumulationRule;
use crate::io::cli::ToolCommand;
use crate::io::error::Result;
use crate::tools::label_report;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "label_volumes_from_jacobians", version)]
#[command(
    about = "Compute the volume of every labelled structure from log Jacobians",
    long_about = "Takes a structure segmentation map and a volume of log Jacobian \
                  determinants. Each voxel contributes voxel_volume * exp(jacobian) to \
                  its label, where the voxel volume comes from the segmentation header.\n\n\
                  The output is a list of all label numbers and their volumes, separated \
                  by a comma."
)]
/// Command-line arguments for `label_volumes_from_jacobians`
pub struct Cli {
    /// Structure segmentation volume
    #[arg(value_name = "STRUCTURES")]
    pub structures: PathBuf,

    /// Log Jacobian determinant volume
    #[arg(value_name = "JACOBIANS")]
    pub jacobians: PathBuf,
}

impl ToolCommand for Cli {}

/// Run the tool, writing the report to `out`
///
/// # Errors
///
/// Returns an error if either volume cannot be read, the volumes differ in
/// shape, or a label is invalid
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    label_report(
        &cli.structures,
        &cli.jacobians,
        AccumulationRule::jacobian_for,
        out,
    )
}
