//! Command-line plumbing shared by every tool binary
//!
//! Tools keep the historical single-dash long options (`-clobber`,
//! `-verbose`); they are rewritten to GNU form before clap sees them, so both
//! spellings work.

use crate::io::error::{Result, ToolError};
use crate::io::volume::OutputType;
use clap::{Args, Parser};
use log::LevelFilter;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Arguments every tool exposes to the shared driver
pub trait ToolCommand: Parser {
    /// Whether informational logging and progress bars are requested
    fn verbose(&self) -> bool {
        false
    }
}

/// Rewrite `-word` options to `--word`
///
/// The program name, short options (`-h`), negative numbers and everything
/// after a bare `--` are left untouched.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(position, arg)| {
            if position == 0 || passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let mut chars = text.chars();
            let legacy = chars.next() == Some('-')
                && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.next().is_some();
            if legacy {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

/// Parse `args`, set up logging and run a tool, mapping the outcome to an exit code
///
/// Help and version requests exit with success; usage errors and every
/// [`ToolError`] returned by `run` exit with failure.
pub fn execute<C, I, T, F>(args: I, run: F) -> ExitCode
where
    C: ToolCommand,
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    F: FnOnce(C) -> Result<()>,
{
    let args = normalize_legacy_flags(args);
    let program = args
        .first()
        .map(|p| {
            Path::new(p)
                .file_name()
                .map_or_else(|| p.to_string_lossy(), |name| name.to_string_lossy())
                .into_owned()
        })
        .unwrap_or_default();

    let cli = match C::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose());
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&program, &err);
            ExitCode::FAILURE
        }
    }
}

// Allow print for the final user-facing diagnostic
#[allow(clippy::print_stderr)]
fn report_error(program: &str, err: &ToolError) {
    eprintln!("{program}: {err}");
}

/// Initialise `env_logger`: `info` when verbose, `warn` otherwise, `RUST_LOG` overrides
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

/// Fail unless `path` exists
///
/// # Errors
///
/// Returns [`ToolError::MissingInput`] naming the path
pub fn ensure_input_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ToolError::MissingInput {
            path: path.to_path_buf(),
        })
    }
}

/// Fail if `path` exists and overwriting was not requested
///
/// # Errors
///
/// Returns [`ToolError::OutputExists`] naming the path
pub fn ensure_output_writable(path: &Path, clobber: bool) -> Result<()> {
    if !clobber && path.exists() {
        Err(ToolError::OutputExists {
            path: path.to_path_buf(),
        })
    } else {
        Ok(())
    }
}

/// Locate an input file, retrying with `suffix` when the name has no extension
///
/// # Errors
///
/// Returns [`ToolError::MissingInput`] if neither name exists
pub fn resolve_input(path: &Path, suffix: &str) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if path.extension().is_none() {
        let suffixed = path.with_extension(suffix);
        if suffixed.exists() {
            return Ok(suffixed);
        }
    }
    Err(ToolError::MissingInput {
        path: path.to_path_buf(),
    })
}

/// Append `suffix` to an output name that has no extension
pub fn with_default_suffix(path: &Path, suffix: &str) -> PathBuf {
    if path.extension().is_none() {
        path.with_extension(suffix)
    } else {
        path.to_path_buf()
    }
}

/// The invoking command line, recorded in output file headers
pub fn command_history() -> String {
    std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mutually exclusive output sample type flags
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[group(multiple = false)]
// One flag per sample type, as on the historical command line
#[allow(clippy::struct_excessive_bools)]
pub struct OutputTypeArgs {
    /// Write 8-bit unsigned samples
    #[arg(long)]
    pub byte: bool,
    /// Write 16-bit signed samples (default)
    #[arg(long)]
    pub short: bool,
    /// Write 32-bit signed samples
    #[arg(long)]
    pub int: bool,
    /// Write 32-bit floating point samples
    #[arg(long)]
    pub float: bool,
    /// Write 64-bit floating point samples
    #[arg(long)]
    pub double: bool,
}

impl OutputTypeArgs {
    /// Selected type, `short` when no flag is given
    pub const fn output_type(self) -> OutputType {
        if self.byte {
            OutputType::Byte
        } else if self.int {
            OutputType::Int
        } else if self.float {
            OutputType::Float
        } else if self.double {
            OutputType::Double
        } else {
            OutputType::Short
        }
    }
}
