//! Fit a transform to the point pairs of a tag file

use neurovol::io::cli::execute;
use neurovol::tools::tagtoxfm::run;
use std::process::ExitCode;

fn main() -> ExitCode {
    execute(std::env::args_os(), run)
}
