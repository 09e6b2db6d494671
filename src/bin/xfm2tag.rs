//! Sample a transform into a tag file

use neurovol::io::cli::execute;
use neurovol::tools::xfm2tag::run;
use std::process::ExitCode;

fn main() -> ExitCode {
    execute(std::env::args_os(), run)
}
