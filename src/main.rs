//! tilebank - Command-line tool for deduplicating tiles and allocating palette banks

use std::process::ExitCode;

use tilebank::cli;

fn main() -> ExitCode {
    cli::run()
}
