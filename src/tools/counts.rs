//! Sum a count volume within every label of a segmentation

use crate::analysis::accumulate::AccumulationRule;
use crate::io::cli::ToolCommand;
use crate::io::error::Result;
use crate::tools::label_report;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "compute_counts_for_labels", version)]
#[command(
    about = "Add up the counts in every labelled structure",
    long_about = "Needs two inputs: a structure segmentation map and a map with counts. \
                  Determines the total number of counts in a structure by adding up all \
                  counts for each of the labels.\n\nThe output is a list of all label \
                  numbers and the number of counts for that label, separated by a comma."
)]
/// Command-line arguments for `compute_counts_for_labels`
pub struct Cli {
    /// Structure segmentation volume
    #[arg(value_name = "STRUCTURES")]
    pub structures: PathBuf,

    /// Volume of counts to add up per label
    #[arg(value_name = "COUNTS")]
    pub counts: PathBuf,
}

impl ToolCommand for Cli {}

/// Run the tool, writing the report to `out`
///
/// # Errors
///
/// Returns an error if either volume cannot be read, the volumes differ in
/// shape, or a label is invalid
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    label_report(&cli.structures, &cli.counts, |_| AccumulationRule::Sum, out)
}
