//! Diagnostic collection for puzzle-set parsing
//!
//! The loader records a diagnostic for every defect it finds and keeps going
//! wherever a degraded-but-valid result exists. A document with any recorded
//! diagnostic fails as a whole once parsing finishes; the collected list is
//! handed back to the caller for reporting.

use std::fmt;

/// Everything the loader and normalizer can complain about.
///
/// The set is closed: tooling can match on it exhaustively. Only the XML
/// variant carries a payload (the tokenizer's message); the rest identify
/// the defect by position alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    XmlMalformed(String),
    IllegalContent,
    UnrecognizedElement,
    UnrecognizedAttribute,
    PuzzleTypeUnsupported,
    PuzzleTooManyColors,
    PuzzleColorUndefined,
    PuzzleMissingClues,
    PuzzleMissingGoal,
    ColorMissingName,
    ColorInvalidChar,
    ColorInvalidRgb,
    ColorDuplicateName,
    ColorDuplicateChar,
    CluesInvalidType,
    CluesMissingType,
    CluesDuplicate,
    ClueInvalidCount,
    SolutionInvalidType,
    SolutionMissingImage,
    SolutionDuplicateImage,
    SolutionIndeterminateImage,
    ImageInvalid,
    ImageMismatchedDimensions,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::XmlMalformed(msg) => write!(f, "xml_malformed: {}", msg),
            DiagnosticKind::IllegalContent => write!(f, "illegal_content"),
            DiagnosticKind::UnrecognizedElement => write!(f, "unrecognized_element"),
            DiagnosticKind::UnrecognizedAttribute => write!(f, "unrecognized_attribute"),
            DiagnosticKind::PuzzleTypeUnsupported => write!(f, "puzzle_type_unsupported"),
            DiagnosticKind::PuzzleTooManyColors => write!(f, "puzzle_too_many_colors"),
            DiagnosticKind::PuzzleColorUndefined => write!(f, "puzzle_color_undefined"),
            DiagnosticKind::PuzzleMissingClues => write!(f, "puzzle_missing_clues"),
            DiagnosticKind::PuzzleMissingGoal => write!(f, "puzzle_missing_goal"),
            DiagnosticKind::ColorMissingName => write!(f, "color_missing_name"),
            DiagnosticKind::ColorInvalidChar => write!(f, "color_invalid_char"),
            DiagnosticKind::ColorInvalidRgb => write!(f, "color_invalid_rgb"),
            DiagnosticKind::ColorDuplicateName => write!(f, "color_duplicate_name"),
            DiagnosticKind::ColorDuplicateChar => write!(f, "color_duplicate_char"),
            DiagnosticKind::CluesInvalidType => write!(f, "clues_invalid_type"),
            DiagnosticKind::CluesMissingType => write!(f, "clues_missing_type"),
            DiagnosticKind::CluesDuplicate => write!(f, "clues_duplicate"),
            DiagnosticKind::ClueInvalidCount => write!(f, "clue_invalid_count"),
            DiagnosticKind::SolutionInvalidType => write!(f, "solution_invalid_type"),
            DiagnosticKind::SolutionMissingImage => write!(f, "solution_missing_image"),
            DiagnosticKind::SolutionDuplicateImage => write!(f, "solution_duplicate_image"),
            DiagnosticKind::SolutionIndeterminateImage => {
                write!(f, "solution_indeterminate_image")
            }
            DiagnosticKind::ImageInvalid => write!(f, "image_invalid"),
            DiagnosticKind::ImageMismatchedDimensions => {
                write!(f, "image_mismatched_dimensions")
            }
        }
    }
}

/// A 1-based line and column in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u64,
    pub column: u64,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One recorded defect: what went wrong and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}

/// Append-only list of diagnostics collected over one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, location: SourceLocation) {
        self.list.push(Diagnostic { kind, location });
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter()
    }

    /// Whether any recorded diagnostic has the given kind.
    pub fn contains(&self, kind: &DiagnosticKind) -> bool {
        self.list.iter().any(|d| d.kind == *kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            DiagnosticKind::PuzzleTooManyColors.to_string(),
            "puzzle_too_many_colors"
        );
        assert_eq!(
            DiagnosticKind::SolutionIndeterminateImage.to_string(),
            "solution_indeterminate_image"
        );
        assert_eq!(
            DiagnosticKind::XmlMalformed("boom".into()).to_string(),
            "xml_malformed: boom"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            kind: DiagnosticKind::ClueInvalidCount,
            location: SourceLocation { line: 3, column: 14 },
        };
        assert_eq!(d.to_string(), "clue_invalid_count at 3:14");
    }

    #[test]
    fn test_collection() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push(DiagnosticKind::ImageInvalid, SourceLocation::default());
        assert_eq!(diags.len(), 1);
        assert!(diags.contains(&DiagnosticKind::ImageInvalid));
        assert!(!diags.contains(&DiagnosticKind::IllegalContent));
    }
}
