//! Dense displacement field of a transform over a reference grid

use crate::analysis::displacement::displacement_field;
use crate::io::cli::{
    OutputTypeArgs, ToolCommand, command_history, ensure_input_exists, ensure_output_writable,
};
use crate::io::configuration::DISPLACEMENT_REAL_RANGE;
use crate::io::error::Result;
use crate::io::progress::SliceProgress;
use crate::io::volume::{OutputType, WriteOptions, read_geometry, write_vector_field};
use crate::io::xfm::read_transform_file;
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "minc_displacement", version)]
#[command(
    about = "Evaluate a transform at every voxel of a reference volume and store the displacements"
)]
/// Command-line arguments for `minc_displacement`
pub struct Cli {
    /// Print progress information
    #[arg(long)]
    pub verbose: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    pub clobber: bool,

    /// Output sample type
    #[command(flatten)]
    pub output_type: OutputTypeArgs,

    /// Reference volume defining the sampling grid
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Transform file to evaluate
    #[arg(value_name = "XFM")]
    pub transform: PathBuf,

    /// Displacement volume to write
    #[arg(value_name = "OUTPUT_GRID")]
    pub output: PathBuf,
}

impl ToolCommand for Cli {
    fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    /// Reference volume
    pub reference: PathBuf,
    /// Transform file
    pub transform: PathBuf,
    /// Output displacement volume
    pub output: PathBuf,
    /// Output sample type
    pub output_type: OutputType,
    /// Show progress
    pub verbose: bool,
}

impl Config {
    /// Check the inputs exist and the output may be written
    ///
    /// # Errors
    ///
    /// Returns an error if an input is missing or the output exists without
    /// `-clobber`
    pub fn from_cli(cli: Cli) -> Result<Self> {
        ensure_input_exists(&cli.input)?;
        ensure_input_exists(&cli.transform)?;
        ensure_output_writable(&cli.output, cli.clobber)?;
        Ok(Self {
            reference: cli.input,
            transform: cli.transform,
            output: cli.output,
            output_type: cli.output_type.output_type(),
            verbose: cli.verbose,
        })
    }

    /// Volume write settings: integer types use the fixed displacement range
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            output_type: self.output_type,
            real_range: self
                .output_type
                .is_integer()
                .then_some(DISPLACEMENT_REAL_RANGE),
            description: command_history(),
        }
    }
}

/// Run the tool
///
/// # Errors
///
/// Returns an error if validation fails, an input cannot be read, or the
/// output cannot be written
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(cli)?;

    let geometry = read_geometry(&config.reference)?;
    info!(
        "Grid of {:?} voxels starting at {:?}",
        geometry.sizes,
        geometry.starts()
    );
    let transform = read_transform_file(&config.transform)?.transform;
    info!("Number of transforms to be applied: {}", transform.len());

    let progress = SliceProgress::new(geometry.sizes[0], "Processing", config.verbose);
    let field = displacement_field(&geometry, &transform, &progress);

    info!("Outputting volume.");
    write_vector_field(&config.output, &field, &config.write_options())
}
