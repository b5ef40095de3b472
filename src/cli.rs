//! Command-line interface implementation

use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::diag::Diagnostics;
use crate::loader::parse;
use crate::render::render_to_string;

/// Exit codes: clap itself exits 2 on usage errors
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;

/// pbn - Parse puzzle-set XML and write the canonical form
#[derive(Parser)]
#[command(name = "pbn")]
#[command(about = "Parse paint-by-number puzzle-set XML and write the canonical form")]
#[command(version)]
pub struct Cli {
    /// Input puzzle-set XML file
    pub input: PathBuf,

    /// Write output here instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let bytes = match fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("error: {}: {}", cli.input.display(), err);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let mut diagnostics = Diagnostics::new();
    let set = match parse(&bytes, &mut diagnostics) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("error: {}", err);
            for diagnostic in diagnostics.iter() {
                eprintln!("error: {}", diagnostic);
            }
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let xml = render_to_string(&set);
    let result = match &cli.output {
        Some(path) => fs::write(path, &xml),
        None => io::stdout().write_all(xml.as_bytes()),
    };
    if let Err(err) = result {
        eprintln!("error: {}", err);
        return ExitCode::from(EXIT_ERROR);
    }

    ExitCode::from(EXIT_SUCCESS)
}
