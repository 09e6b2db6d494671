//! Per-label volumes integrated from log Jacobian determinants

use neurovol::io::cli::execute;
use neurovol::tools::jacobians::{Cli, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    execute(std::env::args_os(), |cli: Cli| {
        run(&cli, &mut std::io::stdout().lock())
    })
}
