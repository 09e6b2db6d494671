//! Tool constants and runtime configuration defaults

// Label rounding: stored labels are often near-integers such as 1.98 or 2.02
/// Offset added before flooring a label voxel value
pub const LABEL_ROUNDING_OFFSET: f64 = 0.5;

// Transform fitting preconditions
/// Minimum point pairs for every linear least-squares family
pub const MIN_POINTS_LINEAR: usize = 4;
/// Minimum point pairs for a thin-plate spline fit
pub const MIN_POINTS_TPS: usize = 6;

// Sparse tag sampling
/// Voxel stride between sampled tag points on every axis
pub const TAG_SAMPLING_STRIDE: usize = 5;
/// Mask voxels at or above this value are included
pub const MASK_THRESHOLD: f64 = 0.5;
/// Comment written at the top of sampled tag files
pub const SAMPLED_TAG_COMMENT: &str = "Tagfile from xfm";

// Displacement output
/// Real range mapped onto integer output types for displacement fields
pub const DISPLACEMENT_REAL_RANGE: (f64, f64) = (-100.0, 100.0);

// Numerical inversion of non-linear transforms
/// Maximum fixed-point iterations when inverting a non-linear transform
pub const INVERSE_MAX_ITERATIONS: usize = 50;
/// Stop inverting once the residual drops below this distance (world units)
pub const INVERSE_TOLERANCE: f64 = 1e-6;

// Simplex optimisation for the 9 and 10 parameter fits
/// Maximum simplex iterations
pub const SIMPLEX_MAX_ITERATIONS: usize = 20_000;
/// Relative spread of simplex values at which the search stops
pub const SIMPLEX_TOLERANCE: f64 = 1e-12;
/// Initial simplex step for rotation parameters (radians)
pub const SIMPLEX_ROTATION_STEP: f64 = 0.05;
/// Initial simplex step for translation parameters (world units)
pub const SIMPLEX_TRANSLATION_STEP: f64 = 1.0;
/// Initial simplex step for scale and shear parameters
pub const SIMPLEX_SCALE_STEP: f64 = 0.05;

// File naming
/// Default suffix for tag point files
pub const TAG_FILE_SUFFIX: &str = "tag";
/// Default suffix for transform files
pub const TRANSFORM_FILE_SUFFIX: &str = "xfm";

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
