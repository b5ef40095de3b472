//! XML-event-driven puzzle-set loading
//!
//! The loader is a recursive-descent consumer of pull-parser events. Each
//! element handler whitelists its attributes and child elements, records a
//! diagnostic for anything outside the whitelist, and degrades locally
//! wherever a structurally-valid result still exists (unknown subtrees are
//! skipped, invalid values fall back to defaults). Parsed puzzles accumulate
//! in per-puzzle scratch state and are committed to the store once their
//! closing tag is seen.

use std::io::Read;

use thiserror::Error;
use xml::attribute::OwnedAttribute;
use xml::common::Position;
use xml::reader::{ErrorKind, EventReader, ParserConfig, XmlEvent};

use crate::color::parse_rgb;
use crate::diag::{DiagnosticKind, Diagnostics, SourceLocation};
use crate::image::{parse_image, ImageText};
use crate::model::{Clue, PuzzleSet, SolutionKind};
use crate::normalize;
use crate::store::{PuzzleRecord, Store, StringIndex};

/// Failure of a whole parse.
///
/// Diagnostic-level defects accumulate in the caller's [`Diagnostics`] list;
/// when any are present at the end of the document the parse fails with
/// [`Error::InvalidPbn`]. Malformed XML and I/O problems short-circuit.
#[derive(Debug, Error)]
pub enum Error {
    /// The document was processed but diagnostics were recorded.
    #[error("document is not a valid puzzle set")]
    InvalidPbn,
    /// The tokenizer could not continue; position of the defect included.
    #[error("malformed XML at {line}:{column}: {message}")]
    MalformedXml {
        line: u64,
        column: u64,
        message: String,
    },
    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a puzzle-set document from memory.
///
/// On success the returned set is fully normalized. On failure the partial
/// set is discarded; `diagnostics` keeps everything that was recorded.
pub fn parse(bytes: &[u8], diagnostics: &mut Diagnostics) -> Result<PuzzleSet, Error> {
    parse_stream(std::io::Cursor::new(bytes), diagnostics)
}

/// Parse a puzzle-set document from a reader.
///
/// Events are consumed on demand; the document is never buffered whole.
pub fn parse_stream<R: Read>(
    reader: R,
    diagnostics: &mut Diagnostics,
) -> Result<PuzzleSet, Error> {
    let config = ParserConfig::new()
        .ignore_comments(true)
        .cdata_to_characters(false)
        .coalesce_characters(true);

    let mut loader = Loader {
        reader: config.create_reader(reader),
        diagnostics,
        store: Store::new(),
    };
    // Record 0 is the synthetic root; its fields are filled at end of document.
    loader.store.push_puzzle(PuzzleRecord::default());
    loader.document()?;

    if loader.diagnostics.is_empty() {
        Ok(PuzzleSet::from_store(loader.store))
    } else {
        Err(Error::InvalidPbn)
    }
}

/// Per-puzzle state between `<puzzle>` and its commit.
#[derive(Debug, Default)]
pub(crate) struct PuzzleScratch {
    pub location: SourceLocation,
    pub source: String,
    pub id: String,
    pub title: String,
    pub author: String,
    pub author_id: String,
    pub copyright: String,
    pub description: String,
    pub default_color: String,
    pub background_color: String,
    pub colors: Vec<ScratchColor>,
    pub row_lines: Option<Vec<Vec<ScratchClue>>>,
    pub column_lines: Option<Vec<Vec<ScratchClue>>>,
    pub solutions: Vec<ScratchSolution>,
    pub notes: Vec<String>,
}

impl PuzzleScratch {
    fn new(location: SourceLocation) -> Self {
        PuzzleScratch {
            location,
            default_color: "black".to_string(),
            background_color: "white".to_string(),
            ..PuzzleScratch::default()
        }
    }
}

#[derive(Debug)]
pub(crate) struct ScratchColor {
    pub name: String,
    pub ch: Option<u8>,
    pub rgb: [u8; 3],
    pub location: SourceLocation,
}

#[derive(Debug)]
pub(crate) struct ScratchClue {
    /// Color attribute value; `None` means the puzzle's default color.
    pub color: Option<String>,
    pub count: u32,
    pub location: SourceLocation,
}

#[derive(Debug)]
pub(crate) struct ScratchSolution {
    pub kind: SolutionKind,
    pub id: String,
    pub image: ImageText,
    pub notes: Vec<String>,
    pub location: SourceLocation,
}

/// Set-wide metadata gathered from the root element's children.
#[derive(Debug, Default)]
struct RootScratch {
    source: String,
    title: String,
    author: String,
    author_id: String,
    copyright: String,
    notes: Vec<String>,
}

/// Which side a `clues` element describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClueSide {
    Rows,
    Columns,
}

struct Loader<'d, R: Read> {
    reader: EventReader<R>,
    diagnostics: &'d mut Diagnostics,
    store: Store,
}

impl<R: Read> Loader<'_, R> {
    /// Pull the next event, promoting tokenizer failures to fatal errors.
    fn next(&mut self) -> Result<XmlEvent, Error> {
        match self.reader.next() {
            Ok(event) => Ok(event),
            Err(e) => {
                if let ErrorKind::Io(io_error) = e.kind() {
                    return Err(Error::Io(std::io::Error::new(
                        io_error.kind(),
                        io_error.to_string(),
                    )));
                }
                let position = e.position();
                let location = SourceLocation {
                    line: position.row + 1,
                    column: position.column + 1,
                };
                let message = match e.kind() {
                    ErrorKind::Syntax(msg) => msg.to_string(),
                    ErrorKind::Utf8(err) => err.to_string(),
                    _ => "unexpected end of document".to_string(),
                };
                self.diagnostics
                    .push(DiagnosticKind::XmlMalformed(message.clone()), location);
                Err(Error::MalformedXml {
                    line: location.line,
                    column: location.column,
                    message,
                })
            }
        }
    }

    /// 1-based position of the event most recently pulled.
    fn location(&self) -> SourceLocation {
        let position = self.reader.position();
        SourceLocation {
            line: position.row + 1,
            column: position.column + 1,
        }
    }

    fn report(&mut self, kind: DiagnosticKind) {
        let location = self.location();
        self.diagnostics.push(kind, location);
    }

    /// Consume events until the current element's end tag.
    fn skip_subtree(&mut self) -> Result<(), Error> {
        let mut depth = 1u32;
        while depth > 0 {
            match self.next()? {
                XmlEvent::StartElement { .. } => depth += 1,
                XmlEvent::EndElement { .. } => depth -= 1,
                XmlEvent::EndDocument => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Collect the text content of the current element.
    ///
    /// Character data and CDATA are taken literally; nested markup is
    /// illegal content but still consumed.
    fn collect_text(&mut self) -> Result<String, Error> {
        let mut text = String::new();
        loop {
            match self.next()? {
                XmlEvent::Characters(chunk)
                | XmlEvent::CData(chunk)
                | XmlEvent::Whitespace(chunk) => text.push_str(&chunk),
                XmlEvent::StartElement { .. } => {
                    self.report(DiagnosticKind::IllegalContent);
                    self.skip_subtree()?;
                }
                XmlEvent::ProcessingInstruction { .. } => {
                    self.report(DiagnosticKind::IllegalContent);
                }
                XmlEvent::EndElement { .. } | XmlEvent::EndDocument => break,
                _ => {}
            }
        }
        Ok(text)
    }

    /// Text content with surrounding whitespace removed.
    fn text_content(&mut self) -> Result<String, Error> {
        Ok(self.collect_text()?.trim().to_string())
    }

    /// Flag any non-markup event a structural element must not contain.
    fn illegal_structural_content(&mut self, event: &XmlEvent) {
        match event {
            XmlEvent::Characters(text) => {
                if !text.trim().is_empty() {
                    self.report(DiagnosticKind::IllegalContent);
                }
            }
            XmlEvent::CData(_) | XmlEvent::ProcessingInstruction { .. } => {
                self.report(DiagnosticKind::IllegalContent);
            }
            _ => {}
        }
    }

    /// Process the whole document and commit the root record.
    fn document(&mut self) -> Result<(), Error> {
        let mut root = RootScratch::default();
        let mut saw_root = false;
        loop {
            match self.next()? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    if !saw_root && name.local_name == "puzzleset" {
                        saw_root = true;
                        self.puzzle_set(&attributes, &mut root)?;
                    } else {
                        self.report(DiagnosticKind::UnrecognizedElement);
                        self.skip_subtree()?;
                    }
                }
                XmlEvent::ProcessingInstruction { .. } => {
                    self.report(DiagnosticKind::IllegalContent);
                }
                XmlEvent::EndDocument => break,
                _ => {}
            }
        }

        let record = PuzzleRecord {
            source: self.store.intern_string(&root.source),
            title: self.store.intern_string(&root.title),
            author: self.store.intern_string(&root.author),
            author_id: self.store.intern_string(&root.author_id),
            copyright: self.store.intern_string(&root.copyright),
            notes: {
                let indices: Vec<StringIndex> = root
                    .notes
                    .iter()
                    .map(|note| self.store.intern_string(note))
                    .collect();
                self.store.push_slice(&indices)
            },
            ..PuzzleRecord::default()
        };
        self.store.puzzle_records_mut()[0] = record;
        Ok(())
    }

    /// `<puzzleset>`: set-wide metadata plus the puzzles themselves.
    fn puzzle_set(
        &mut self,
        attributes: &[OwnedAttribute],
        root: &mut RootScratch,
    ) -> Result<(), Error> {
        for _attribute in attributes {
            self.report(DiagnosticKind::UnrecognizedAttribute);
        }
        loop {
            let event = self.next()?;
            match event {
                XmlEvent::StartElement {
                    ref name,
                    ref attributes,
                    ..
                } => match name.local_name.as_str() {
                    "source" => root.source = self.text_content()?,
                    "title" => root.title = self.text_content()?,
                    "author" => root.author = self.text_content()?,
                    "authorid" => root.author_id = self.text_content()?,
                    "copyright" => root.copyright = self.text_content()?,
                    "puzzle" => self.puzzle(attributes)?,
                    "note" => {
                        let note = self.text_content()?;
                        root.notes.push(note);
                    }
                    _ => {
                        self.report(DiagnosticKind::UnrecognizedElement);
                        self.skip_subtree()?;
                    }
                },
                XmlEvent::EndElement { .. } | XmlEvent::EndDocument => break,
                other => self.illegal_structural_content(&other),
            }
        }
        Ok(())
    }

    /// `<puzzle>`: one grid puzzle, committed on its end tag.
    fn puzzle(&mut self, attributes: &[OwnedAttribute]) -> Result<(), Error> {
        let mut scratch = PuzzleScratch::new(self.location());
        let mut supported = true;
        for attribute in attributes {
            match attribute.name.local_name.as_str() {
                "type" => {
                    if attribute.value != "grid" {
                        self.report(DiagnosticKind::PuzzleTypeUnsupported);
                        supported = false;
                    }
                }
                "defaultcolor" => scratch.default_color = attribute.value.clone(),
                "backgroundcolor" => scratch.background_color = attribute.value.clone(),
                _ => self.report(DiagnosticKind::UnrecognizedAttribute),
            }
        }
        if !supported {
            return self.skip_subtree();
        }

        loop {
            let event = self.next()?;
            match event {
                XmlEvent::StartElement {
                    ref name,
                    ref attributes,
                    ..
                } => match name.local_name.as_str() {
                    "source" => scratch.source = self.text_content()?,
                    "id" => scratch.id = self.text_content()?,
                    "title" => scratch.title = self.text_content()?,
                    "author" => scratch.author = self.text_content()?,
                    "authorid" => scratch.author_id = self.text_content()?,
                    "copyright" => scratch.copyright = self.text_content()?,
                    "description" => scratch.description = self.text_content()?,
                    "color" => self.color(attributes, &mut scratch)?,
                    "clues" => self.clues(attributes, &mut scratch)?,
                    "solution" => self.solution(attributes, &mut scratch)?,
                    "note" => {
                        let note = self.text_content()?;
                        scratch.notes.push(note);
                    }
                    _ => {
                        self.report(DiagnosticKind::UnrecognizedElement);
                        self.skip_subtree()?;
                    }
                },
                XmlEvent::EndElement { .. } | XmlEvent::EndDocument => break,
                other => self.illegal_structural_content(&other),
            }
        }

        normalize::commit_puzzle(&mut self.store, scratch, self.diagnostics);
        Ok(())
    }

    /// `<color name=".." char="c">RRGGBB</color>`
    fn color(
        &mut self,
        attributes: &[OwnedAttribute],
        scratch: &mut PuzzleScratch,
    ) -> Result<(), Error> {
        let location = self.location();
        let mut name: Option<String> = None;
        let mut ch: Option<u8> = None;
        for attribute in attributes {
            match attribute.name.local_name.as_str() {
                "name" => name = Some(attribute.value.clone()),
                "char" => match glyph_byte(&attribute.value) {
                    Some(byte) => ch = Some(byte),
                    None => self.report(DiagnosticKind::ColorInvalidChar),
                },
                _ => self.report(DiagnosticKind::UnrecognizedAttribute),
            }
        }

        let text = self.text_content()?;
        let rgb = match parse_rgb(&text) {
            Ok(rgb) => rgb,
            Err(_) => {
                self.diagnostics
                    .push(DiagnosticKind::ColorInvalidRgb, location);
                [0, 0, 0]
            }
        };

        match name {
            Some(name) => scratch.colors.push(ScratchColor {
                name,
                ch,
                rgb,
                location,
            }),
            None => self
                .diagnostics
                .push(DiagnosticKind::ColorMissingName, location),
        }
        Ok(())
    }

    /// `<clues type="rows|columns">` with `<line>` children.
    fn clues(
        &mut self,
        attributes: &[OwnedAttribute],
        scratch: &mut PuzzleScratch,
    ) -> Result<(), Error> {
        let location = self.location();
        let mut side: Option<ClueSide> = None;
        let mut saw_type = false;
        for attribute in attributes {
            match attribute.name.local_name.as_str() {
                "type" => {
                    saw_type = true;
                    side = match attribute.value.as_str() {
                        "rows" => Some(ClueSide::Rows),
                        "columns" => Some(ClueSide::Columns),
                        _ => {
                            self.report(DiagnosticKind::CluesInvalidType);
                            None
                        }
                    };
                }
                _ => self.report(DiagnosticKind::UnrecognizedAttribute),
            }
        }
        if !saw_type {
            self.diagnostics
                .push(DiagnosticKind::CluesMissingType, location);
            return self.skip_subtree();
        }
        let Some(side) = side else {
            return self.skip_subtree();
        };

        let duplicate = match side {
            ClueSide::Rows => scratch.row_lines.is_some(),
            ClueSide::Columns => scratch.column_lines.is_some(),
        };
        if duplicate {
            self.diagnostics
                .push(DiagnosticKind::CluesDuplicate, location);
            return self.skip_subtree();
        }

        let mut lines = Vec::new();
        loop {
            let event = self.next()?;
            match event {
                XmlEvent::StartElement {
                    ref name,
                    ref attributes,
                    ..
                } => match name.local_name.as_str() {
                    "line" => {
                        let line = self.line(attributes)?;
                        lines.push(line);
                    }
                    _ => {
                        self.report(DiagnosticKind::UnrecognizedElement);
                        self.skip_subtree()?;
                    }
                },
                XmlEvent::EndElement { .. } | XmlEvent::EndDocument => break,
                other => self.illegal_structural_content(&other),
            }
        }

        match side {
            ClueSide::Rows => scratch.row_lines = Some(lines),
            ClueSide::Columns => scratch.column_lines = Some(lines),
        }
        Ok(())
    }

    /// `<line>` with `<count>` children. Takes no attributes.
    fn line(&mut self, attributes: &[OwnedAttribute]) -> Result<Vec<ScratchClue>, Error> {
        for _attribute in attributes {
            self.report(DiagnosticKind::UnrecognizedAttribute);
        }
        let mut clues = Vec::new();
        loop {
            let event = self.next()?;
            match event {
                XmlEvent::StartElement {
                    ref name,
                    ref attributes,
                    ..
                } => match name.local_name.as_str() {
                    "count" => {
                        let clue = self.count(attributes)?;
                        clues.push(clue);
                    }
                    _ => {
                        self.report(DiagnosticKind::UnrecognizedElement);
                        self.skip_subtree()?;
                    }
                },
                XmlEvent::EndElement { .. } | XmlEvent::EndDocument => break,
                other => self.illegal_structural_content(&other),
            }
        }
        Ok(clues)
    }

    /// `<count color="name">N</count>`
    fn count(&mut self, attributes: &[OwnedAttribute]) -> Result<ScratchClue, Error> {
        let location = self.location();
        let mut color: Option<String> = None;
        for attribute in attributes {
            match attribute.name.local_name.as_str() {
                "color" => color = Some(attribute.value.clone()),
                _ => self.report(DiagnosticKind::UnrecognizedAttribute),
            }
        }
        let text = self.text_content()?;
        let count = match text.parse::<u32>() {
            Ok(n) if (1..=Clue::MAX_COUNT).contains(&n) => n,
            _ => {
                self.diagnostics
                    .push(DiagnosticKind::ClueInvalidCount, location);
                0
            }
        };
        Ok(ScratchClue {
            color,
            count,
            location,
        })
    }

    /// `<solution type=".." id="..">` with one `<image>` and notes.
    fn solution(
        &mut self,
        attributes: &[OwnedAttribute],
        scratch: &mut PuzzleScratch,
    ) -> Result<(), Error> {
        let location = self.location();
        let mut kind = SolutionKind::Goal;
        let mut id = String::new();
        for attribute in attributes {
            match attribute.name.local_name.as_str() {
                "type" => {
                    kind = match attribute.value.as_str() {
                        "goal" => SolutionKind::Goal,
                        "solution" => SolutionKind::Solved,
                        "saved" => SolutionKind::Saved,
                        _ => {
                            self.report(DiagnosticKind::SolutionInvalidType);
                            SolutionKind::Goal
                        }
                    };
                }
                "id" => id = attribute.value.clone(),
                _ => self.report(DiagnosticKind::UnrecognizedAttribute),
            }
        }

        let mut image: Option<ImageText> = None;
        let mut saw_image = false;
        let mut notes = Vec::new();
        loop {
            let event = self.next()?;
            match event {
                XmlEvent::StartElement {
                    ref name,
                    ref attributes,
                    ..
                } => match name.local_name.as_str() {
                    "image" => {
                        let image_location = self.location();
                        for _attribute in attributes {
                            self.report(DiagnosticKind::UnrecognizedAttribute);
                        }
                        let text = self.collect_text()?;
                        if saw_image {
                            self.diagnostics
                                .push(DiagnosticKind::SolutionDuplicateImage, image_location);
                        } else {
                            saw_image = true;
                            match parse_image(&text) {
                                Ok(parsed) => image = Some(parsed),
                                Err(_) => self
                                    .diagnostics
                                    .push(DiagnosticKind::ImageInvalid, image_location),
                            }
                        }
                    }
                    "note" => {
                        let note = self.text_content()?;
                        notes.push(note);
                    }
                    _ => {
                        self.report(DiagnosticKind::UnrecognizedElement);
                        self.skip_subtree()?;
                    }
                },
                XmlEvent::EndElement { .. } | XmlEvent::EndDocument => break,
                other => self.illegal_structural_content(&other),
            }
        }

        if !saw_image {
            self.diagnostics
                .push(DiagnosticKind::SolutionMissingImage, location);
            return Ok(());
        }
        if let Some(image) = image {
            scratch.solutions.push(ScratchSolution {
                kind,
                id,
                image,
                notes,
                location,
            });
        }
        Ok(())
    }
}

/// Accept a single-byte printable glyph from an attribute value.
fn glyph_byte(value: &str) -> Option<u8> {
    let bytes = value.as_bytes();
    match bytes {
        [b @ 0x20..=0x7E] => Some(*b),
        _ => None,
    }
}
