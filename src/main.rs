//! pbn - Command-line tool for normalizing puzzle-set XML documents

use std::process::ExitCode;

use pbnset::cli;

fn main() -> ExitCode {
    cli::run()
}
