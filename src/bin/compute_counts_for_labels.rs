//! Sum a count volume within every label of a segmentation

use neurovol::io::cli::execute;
use neurovol::tools::counts::{Cli, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    execute(std::env::args_os(), |cli: Cli| {
        run(&cli, &mut std::io::stdout().lock())
    })
}
