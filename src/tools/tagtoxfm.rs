//! Fit a transform to tag point correspondences
//!
//! The transform maps volume two onto volume one; `-inverse` swaps the point
//! sets first.

use crate::io::cli::{ToolCommand, ensure_output_writable, resolve_input, with_default_suffix};
use crate::io::configuration::{TAG_FILE_SUFFIX, TRANSFORM_FILE_SUFFIX};
use crate::io::error::Result;
use crate::io::tags::read_tag_file;
use crate::io::xfm::write_transform_file;
use crate::transform::fit::{TransformFamily, fit_transform};
use clap::{Args, Parser};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tagtoxfm", version)]
#[command(
    about = "Compute a transform from a tag point file",
    long_about = "Computes the transformation mapping volume two to volume one from the \
                  tag points of a two-volume tag file. Default transformation type is -lsq6."
)]
/// Command-line arguments for `tagtoxfm`
pub struct Cli {
    /// Transformation type
    #[command(flatten)]
    pub family: FamilyArgs,

    /// Swap tags, then compute the transform
    #[arg(long)]
    pub inverse: bool,

    /// Overwrite any existing transform file
    #[arg(long, overrides_with = "noclobber")]
    pub clobber: bool,

    /// Do not overwrite any existing transform file
    #[arg(long, overrides_with = "clobber")]
    pub noclobber: bool,

    /// Print fit information
    #[arg(long)]
    pub verbose: bool,

    /// Tag file with two volumes
    #[arg(value_name = "INFILE.TAG")]
    pub tags: PathBuf,

    /// Transform file to write
    #[arg(value_name = "OUTFILE.XFM")]
    pub output: PathBuf,
}

impl ToolCommand for Cli {
    fn verbose(&self) -> bool {
        self.verbose
    }
}

/// Mutually exclusive transformation type flags
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[group(multiple = false)]
// One flag per family, as on the historical command line
#[allow(clippy::struct_excessive_bools)]
pub struct FamilyArgs {
    /// 6 parameter (scale = 1.0) least-squares linear transformation
    #[arg(long)]
    pub lsq6: bool,
    /// 7 parameter (one scale) least-squares linear transformation
    #[arg(long)]
    pub lsq7: bool,
    /// 9 parameter least-squares linear transformation
    #[arg(long)]
    pub lsq9: bool,
    /// 10 parameter least-squares linear transformation
    #[arg(long)]
    pub lsq10: bool,
    /// 12 parameter least-squares linear transformation
    #[arg(long)]
    pub lsq12: bool,
    /// Thin-plate spline non-linear transformation
    #[arg(long)]
    pub tps: bool,
}

impl FamilyArgs {
    /// Selected family, `lsq6` when no flag is given
    pub const fn family(self) -> TransformFamily {
        if self.lsq7 {
            TransformFamily::Lsq7
        } else if self.lsq9 {
            TransformFamily::Lsq9
        } else if self.lsq10 {
            TransformFamily::Lsq10
        } else if self.lsq12 {
            TransformFamily::Lsq12
        } else if self.tps {
            TransformFamily::Tps
        } else {
            TransformFamily::Lsq6
        }
    }
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    /// Tag file as named on the command line
    pub tag_name: PathBuf,
    /// Tag file actually read
    pub tags: PathBuf,
    /// Transform file to write
    pub output: PathBuf,
    /// Transform family to fit
    pub family: TransformFamily,
    /// Swap the point sets before fitting
    pub inverse: bool,
}

impl Config {
    /// Resolve file names and check the output may be written
    ///
    /// # Errors
    ///
    /// Returns an error if the tag file is missing or the output exists
    /// without `-clobber`
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let tags = resolve_input(&cli.tags, TAG_FILE_SUFFIX)?;
        let output = with_default_suffix(&cli.output, TRANSFORM_FILE_SUFFIX);
        ensure_output_writable(&output, cli.clobber && !cli.noclobber)?;
        Ok(Self {
            tag_name: cli.tags,
            tags,
            output,
            family: cli.family.family(),
            inverse: cli.inverse,
        })
    }

    /// Comment block recorded in the transform file
    pub fn comment(&self) -> String {
        format!(
            " Created from tag file {}\n using {}{}",
            self.tag_name.display(),
            self.family.description(),
            if self.inverse { " with -inverse" } else { "" }
        )
    }
}

/// Run the tool
///
/// # Errors
///
/// Returns an error if the tag file is unreadable or does not hold two
/// volumes, there are too few points for the family, the fit fails, or the
/// transform cannot be written
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(cli)?;

    let tags = read_tag_file(&config.tags)?;
    let (volume1, volume2) = tags.point_lists(&config.tags)?;
    let (target, source) = if config.inverse {
        (volume2, volume1)
    } else {
        (volume1, volume2)
    };
    info!(
        "fitting {} to {} point pairs",
        config.family.name(),
        source.len()
    );

    let transform = fit_transform(&source, &target, config.family)?;
    write_transform_file(&config.output, &transform, &config.comment())
}
