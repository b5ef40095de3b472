//! pbnset - Library for loading, normalizing, and re-serializing
//! paint-by-number (nonogram) puzzle-set XML documents
//!
//! This library provides functionality to:
//! - Parse puzzle-set XML into a compact, arena-backed model
//! - Validate documents, collecting a diagnostic per defect
//! - Normalize palettes, clues, and grid images into canonical form
//! - Render the normalized model back to deterministic XML
//!
//! # Quick Start
//!
//! ```no_run
//! use pbnset::{parse, render_to_string, Diagnostics};
//! use std::fs;
//!
//! let bytes = fs::read("puzzles.xml").unwrap();
//! let mut diagnostics = Diagnostics::new();
//!
//! match parse(&bytes, &mut diagnostics) {
//!     Ok(set) => print!("{}", render_to_string(&set)),
//!     Err(err) => {
//!         eprintln!("{}", err);
//!         for diagnostic in diagnostics.iter() {
//!             eprintln!("{}", diagnostic);
//!         }
//!     }
//! }
//! ```
//!
//! Parsing either succeeds with a fully-normalized [`PuzzleSet`] or fails
//! after the whole document has been examined, leaving every recorded
//! [`Diagnostic`] in the caller's list. Rendering a parsed set and parsing
//! the output again yields an equal set.

pub mod cli;
pub mod color;
pub mod diag;
pub mod image;
pub mod loader;
pub mod model;
mod normalize;
pub mod render;
pub mod store;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Diagnostics
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, SourceLocation};

// Parsing
pub use loader::{parse, parse_stream, Error};

// Core data types
pub use model::{Cell, Clue, Color, Image, Puzzle, PuzzleSet, Solution, SolutionKind};

// Rendering
pub use render::{render, render_to_string};
