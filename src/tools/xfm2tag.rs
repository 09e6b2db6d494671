//! Sample a transform on a sparse voxel lattice into a tag file

use crate::analysis::sampling::sample_transform_tags;
use crate::io::cli::{ToolCommand, ensure_input_exists, ensure_output_writable};
use crate::io::configuration::{SAMPLED_TAG_COMMENT, TAG_SAMPLING_STRIDE};
use crate::io::error::Result;
use crate::io::tags::{TagSet, write_tag_file};
use crate::io::volume::{read_geometry, read_volume};
use crate::io::xfm::read_transform_file;
use crate::spatial::mask::VoxelMask;
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "xfm2tag", version)]
#[command(
    about = "Write a tag file sampling a transform every few voxels of a reference volume"
)]
/// Command-line arguments for `xfm2tag`
pub struct Cli {
    /// Print progress information
    #[arg(long)]
    pub verbose: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    pub clobber: bool,

    /// Only sample voxels where this volume is at least 0.5
    #[arg(long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Reference volume defining the sampling lattice
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Transform file to sample
    #[arg(value_name = "XFM")]
    pub transform: PathBuf,

    /// Tag file to write
    #[arg(value_name = "OUTPUT.TAG")]
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
    /// Optional inclusion mask
    pub mask: Option<PathBuf>,
    /// Output tag file
    pub output: PathBuf,
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
        if let Some(mask) = &cli.mask {
            ensure_input_exists(mask)?;
        }
        ensure_output_writable(&cli.output, cli.clobber)?;
        Ok(Self {
            reference: cli.input,
            transform: cli.transform,
            mask: cli.mask,
            output: cli.output,
        })
    }
}

/// Run the tool
///
/// # Errors
///
/// Returns an error if an input cannot be read, the mask does not match the
/// reference lattice, or the tag file cannot be written
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(cli)?;

    let geometry = read_geometry(&config.reference)?;
    let mask = config
        .mask
        .as_deref()
        .map(|path| VoxelMask::conformant_with(&geometry, &read_volume(path)?))
        .transpose()?;
    let transform = read_transform_file(&config.transform)?.transform;

    let pairs = sample_transform_tags(&geometry, &transform, mask.as_ref(), TAG_SAMPLING_STRIDE);
    info!("sampled {} tag points", pairs.len());

    write_tag_file(&config.output, &TagSet::from_pairs(SAMPLED_TAG_COMMENT, pairs))
}
