//! Surface-normal component of a displacement field at every mesh vertex

use neurovol::io::cli::execute;
use neurovol::tools::dot_product::{Cli, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    execute(std::env::args_os(), |cli: Cli| run(&cli))
}
