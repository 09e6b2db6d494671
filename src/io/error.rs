//! Error types shared by every tool in the crate

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all tool operations
#[derive(Debug)]
pub enum ToolError {
    /// A required input file does not exist
    MissingInput {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Output file exists and overwriting was not requested
    OutputExists {
        /// Path of the existing output
        path: PathBuf,
    },

    /// Failed to open or decode a volume file
    VolumeRead {
        /// Path to the volume file
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// Failed to encode or write a volume file
    VolumeWrite {
        /// Path where the write was attempted
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// Two grids that must share a voxel lattice do not
    ShapeMismatch {
        /// Sizes of the first grid
        expected: [usize; 3],
        /// Sizes of the second grid
        found: [usize; 3],
    },

    /// A label voxel rounded to a negative label
    NegativeLabel {
        /// Rounded label value
        label: i64,
        /// Flat voxel index where it occurred
        voxel: usize,
    },

    /// A label voxel holds a value that cannot be rounded to a label
    InvalidLabel {
        /// Raw voxel value
        value: f64,
        /// Flat voxel index where it occurred
        voxel: usize,
    },

    /// Text input (tag, transform or object file) is malformed
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Description of what is wrong
        reason: String,
    },

    /// Geometry input has the wrong number or type of objects
    InvalidGeometry {
        /// File being read
        path: PathBuf,
        /// Description of what is wrong
        reason: String,
    },

    /// Not enough point pairs for the requested transform family
    InsufficientPoints {
        /// Family being fitted
        family: &'static str,
        /// Minimum number of point pairs
        required: usize,
        /// Number of point pairs provided
        found: usize,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Numerical computation produced no usable result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { path } => write!(f, "Couldn't find {}", path.display()),
            Self::OutputExists { path } => {
                write!(
                    f,
                    "{} exists! (use -clobber to overwrite)",
                    path.display()
                )
            }
            Self::VolumeRead { path, reason } => {
                write!(f, "Error opening volume '{}': {reason}", path.display())
            }
            Self::VolumeWrite { path, reason } => {
                write!(f, "Error writing volume '{}': {reason}", path.display())
            }
            Self::ShapeMismatch { expected, found } => {
                write!(
                    f,
                    "Dimensions of two volumes must be the same ({}x{}x{} vs {}x{}x{})",
                    expected[0], expected[1], expected[2], found[0], found[1], found[2]
                )
            }
            Self::NegativeLabel { label, voxel } => {
                write!(f, "Label {label} at voxel {voxel} is negative")
            }
            Self::InvalidLabel { value, voxel } => {
                write!(f, "Label value {value} at voxel {voxel} is not a finite number")
            }
            Self::Parse { path, reason } => {
                write!(f, "Error reading '{}': {reason}", path.display())
            }
            Self::InvalidGeometry { path, reason } => {
                write!(f, "Invalid geometry in '{}': {reason}", path.display())
            }
            Self::InsufficientPoints {
                family,
                required,
                found,
            } => {
                write!(
                    f,
                    "Need at least {required} points for {family} (only {found})"
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for tool results
pub type Result<T> = std::result::Result<T, ToolError>;

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Attaches the file path and operation to raw I/O failures
pub trait WithPath<T> {
    /// Convert an I/O error into a [`ToolError::FileSystem`] naming `path`
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path and operation applied
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T> WithPath<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T> {
        self.map_err(|source| ToolError::FileSystem {
            path: path.to_path_buf(),
            operation,
            source,
        })
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> ToolError {
    ToolError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> ToolError {
    ToolError::Computation {
        operation,
        reason: reason.to_string(),
    }
}

/// Create a parse error for a text input file
pub fn parse_error(path: &Path, reason: &impl ToString) -> ToolError {
    ToolError::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
