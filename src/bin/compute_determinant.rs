//! Jacobian determinant of a transform sampled on a reference grid

use neurovol::io::cli::execute;
use neurovol::tools::determinant::run;
use std::process::ExitCode;

fn main() -> ExitCode {
    execute(std::env::args_os(), run)
}
