//! Jacobian determinant of a transform over a reference grid

use crate::analysis::displacement::displacement_field;
use crate::analysis::jacobian::{jacobian_determinant, log_determinant, smooth_field};
use crate::io::cli::{ToolCommand, command_history, ensure_input_exists, ensure_output_writable};
use crate::io::error::{Result, invalid_parameter};
use crate::io::progress::SliceProgress;
use crate::io::volume::{OutputType, WriteOptions, read_geometry, write_volume};
use crate::io::xfm::read_transform_file;
use crate::transform::general::GeneralTransform;
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "compute_determinant", version)]
#[command(about = "Compute the Jacobian determinant of a transform over a reference volume")]
/// Command-line arguments for `compute_determinant`
pub struct Cli {
    /// Print progress information
    #[arg(long)]
    pub verbose: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    pub clobber: bool,

    /// Only use the thin-plate spline and grid parts of the transform
    #[arg(long)]
    pub non_linear_only: bool,

    /// Gaussian FWHM (world units) applied to the displacements first
    #[arg(long, value_name = "FWHM")]
    pub smooth: Option<f64>,

    /// Write the natural logarithm of the determinant
    #[arg(long)]
    pub log: bool,

    /// Reference volume defining the sampling grid
    #[arg(value_name = "INPUT_LIKE")]
    pub input: PathBuf,

    /// Transform file to differentiate
    #[arg(value_name = "XFM")]
    pub transform: PathBuf,

    /// Determinant volume to write
    #[arg(value_name = "OUTPUT")]
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
    /// Output determinant volume
    pub output: PathBuf,
    /// Drop the linear parts of the transform
    pub non_linear_only: bool,
    /// Smoothing FWHM, if any
    pub smooth: Option<f64>,
    /// Write `ln(det)` instead of `det`
    pub log: bool,
    /// Show progress
    pub verbose: bool,
}

impl Config {
    /// Check the inputs exist, the output may be written and the FWHM is usable
    ///
    /// # Errors
    ///
    /// Returns an error if an input is missing, the output exists without
    /// `-clobber`, or `-smooth` is not a positive number
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if let Some(fwhm) = cli.smooth.filter(|fwhm| !(fwhm.is_finite() && *fwhm > 0.0)) {
            return Err(invalid_parameter("smooth", &fwhm, &"FWHM must be positive"));
        }
        ensure_input_exists(&cli.input)?;
        ensure_input_exists(&cli.transform)?;
        ensure_output_writable(&cli.output, cli.clobber)?;
        Ok(Self {
            reference: cli.input,
            transform: cli.transform,
            output: cli.output,
            non_linear_only: cli.non_linear_only,
            smooth: cli.smooth,
            log: cli.log,
            verbose: cli.verbose,
        })
    }

    /// Determinants are always written as floats
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            output_type: OutputType::Float,
            real_range: None,
            description: command_history(),
        }
    }

    /// The transform actually differentiated
    pub fn select_parts(&self, transform: GeneralTransform) -> GeneralTransform {
        if !self.non_linear_only {
            return transform;
        }
        transform.non_linear().unwrap_or_else(|| {
            warn!("transform has no non-linear part; determinant is 1 everywhere");
            GeneralTransform::identity()
        })
    }
}

/// Run the tool
///
/// # Errors
///
/// Returns an error if validation fails, an input cannot be read, `-log` meets
/// a non-positive determinant, or the output cannot be written
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_cli(cli)?;

    let geometry = read_geometry(&config.reference)?;
    info!(
        "Grid of {:?} voxels starting at {:?}",
        geometry.sizes,
        geometry.starts()
    );
    let transform = config.select_parts(read_transform_file(&config.transform)?.transform);
    info!("Number of transforms to be applied: {}", transform.len());

    let progress = SliceProgress::new(geometry.sizes[0], "Displacement", config.verbose);
    let mut field = displacement_field(&geometry, &transform, &progress);
    if let Some(fwhm) = config.smooth {
        info!("Smoothing displacements with FWHM {fwhm}");
        field = smooth_field(&field, fwhm)?;
    }

    let progress = SliceProgress::new(geometry.sizes[0], "Determinant", config.verbose);
    let mut determinant = jacobian_determinant(&field, &progress)?;
    if config.log {
        determinant = log_determinant(determinant)?;
    }

    info!("Outputting volume.");
    write_volume(&config.output, &determinant, &config.write_options())
}
