//! Per-puzzle normalization and commit
//!
//! Runs once per puzzle after its subtree has been parsed. Completes the
//! palette with the well-known black and white entries, assigns glyphs to
//! colors that declared none, moves the background and default colors into
//! their reserved palette slots, resolves clue color names, determines grid
//! dimensions, encodes images into cell bitsets, derives clues from the goal
//! when none were given, and finally commits the normalized puzzle to the
//! store. A puzzle that fails any step is dropped; its diagnostics stay.

use std::collections::HashMap;

use crate::diag::{DiagnosticKind, Diagnostics};
use crate::image::CellSpec;
use crate::loader::{PuzzleScratch, ScratchClue, ScratchColor, ScratchSolution};
use crate::model::{Cell, Clue, Color, Solution, SolutionKind};
use crate::store::{DataIndex, PuzzleRecord, Store, StringIndex};

/// Glyphs handed to colors that declared none, in assignment order.
const GLYPH_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Palette size limit imposed by the 5-bit color index.
pub(crate) const MAX_COLORS: usize = 32;

/// A solution with its cells encoded, ready to commit.
struct ReadySolution<'a> {
    id: &'a str,
    cells: Vec<Cell>,
    notes: &'a [String],
}

enum CellError {
    /// A glyph named no palette color; the puzzle is unusable.
    UnknownGlyph,
    /// A goal or solved cell was not a single color; the solution is dropped.
    Indeterminate,
}

/// Normalize one parsed puzzle and commit it to the store.
///
/// On any failure the puzzle is dropped after recording a diagnostic;
/// sibling puzzles are unaffected.
pub(crate) fn commit_puzzle(
    store: &mut Store,
    mut scratch: PuzzleScratch,
    diagnostics: &mut Diagnostics,
) {
    // The two well-known names always exist, even if unused.
    if !scratch.colors.iter().any(|c| c.name == "black") {
        scratch.colors.push(ScratchColor {
            name: "black".to_string(),
            ch: Some(b'X'),
            rgb: [0, 0, 0],
            location: scratch.location,
        });
    }
    if !scratch.colors.iter().any(|c| c.name == "white") {
        scratch.colors.push(ScratchColor {
            name: "white".to_string(),
            ch: Some(b'.'),
            rgb: [255, 255, 255],
            location: scratch.location,
        });
    }

    assign_glyphs(&mut scratch.colors);

    // Background to slot 0, default foreground to slot 1.
    let Some(background) = scratch
        .colors
        .iter()
        .position(|c| c.name == scratch.background_color)
    else {
        diagnostics.push(DiagnosticKind::PuzzleColorUndefined, scratch.location);
        return;
    };
    scratch.colors.swap(0, background);
    let mut default = match scratch
        .colors
        .iter()
        .position(|c| c.name == scratch.default_color)
    {
        Some(index) => index,
        None => {
            diagnostics.push(DiagnosticKind::PuzzleColorUndefined, scratch.location);
            return;
        }
    };
    if default == 0 {
        // The background entry also matched the default name. Another entry
        // must cover slot 1 or the reserved indices cannot both be satisfied.
        match scratch
            .colors
            .iter()
            .skip(1)
            .position(|c| c.name == scratch.default_color)
        {
            Some(index) => default = index + 1,
            None => {
                diagnostics.push(DiagnosticKind::PuzzleColorUndefined, scratch.location);
                return;
            }
        }
    }
    scratch.colors.swap(1, default);

    if scratch.colors.len() > MAX_COLORS {
        diagnostics.push(DiagnosticKind::PuzzleTooManyColors, scratch.location);
        return;
    }

    // Name and glyph lookup tables; first occurrence wins on duplicates.
    let mut names: HashMap<&str, u8> = HashMap::new();
    let mut glyphs: HashMap<u8, u8> = HashMap::new();
    for (index, color) in scratch.colors.iter().enumerate() {
        if names.contains_key(color.name.as_str()) {
            diagnostics.push(DiagnosticKind::ColorDuplicateName, color.location);
        } else {
            names.insert(color.name.as_str(), index as u8);
        }
        if let Some(ch) = color.ch {
            if glyphs.contains_key(&ch) {
                diagnostics.push(DiagnosticKind::ColorDuplicateChar, color.location);
            } else {
                glyphs.insert(ch, index as u8);
            }
        }
    }

    let Ok(row_lines) = resolve_lines(
        scratch.row_lines.as_deref(),
        &names,
        &scratch.default_color,
        diagnostics,
    ) else {
        return;
    };
    let Ok(column_lines) = resolve_lines(
        scratch.column_lines.as_deref(),
        &names,
        &scratch.default_color,
        diagnostics,
    ) else {
        return;
    };

    // Dimensions come from the clue lines where given, else from the first
    // goal image.
    let goal_dims = scratch
        .solutions
        .iter()
        .find(|s| s.kind == SolutionKind::Goal)
        .map(|s| (s.image.row_count(), s.image.column_count()));
    let row_count = row_lines
        .as_ref()
        .map(Vec::len)
        .or(goal_dims.map(|d| d.0));
    let column_count = column_lines
        .as_ref()
        .map(Vec::len)
        .or(goal_dims.map(|d| d.1));
    let (row_count, column_count) = match (row_count, column_count) {
        (Some(rows), Some(columns)) => (rows, columns),
        _ => {
            let kind = if scratch.row_lines.is_none()
                && scratch.column_lines.is_none()
                && goal_dims.is_none()
            {
                DiagnosticKind::PuzzleMissingGoal
            } else {
                DiagnosticKind::PuzzleMissingClues
            };
            diagnostics.push(kind, scratch.location);
            return;
        }
    };

    let n_colors = scratch.colors.len();
    let mask = if n_colors >= 32 {
        u32::MAX
    } else {
        (1u32 << n_colors) - 1
    };

    let mut goals: Vec<ReadySolution<'_>> = Vec::new();
    let mut solved: Vec<ReadySolution<'_>> = Vec::new();
    let mut saved: Vec<ReadySolution<'_>> = Vec::new();
    for solution in &scratch.solutions {
        if solution.image.row_count() != row_count
            || solution.image.column_count() != column_count
        {
            diagnostics.push(
                DiagnosticKind::ImageMismatchedDimensions,
                solution.location,
            );
            continue;
        }
        let cells = match encode_cells(solution, &glyphs, mask, diagnostics) {
            Ok(cells) => cells,
            Err(CellError::UnknownGlyph) => return,
            Err(CellError::Indeterminate) => continue,
        };
        let ready = ReadySolution {
            id: &solution.id,
            cells,
            notes: &solution.notes,
        };
        match solution.kind {
            SolutionKind::Goal => goals.push(ready),
            SolutionKind::Solved => solved.push(ready),
            SolutionKind::Saved => saved.push(ready),
        }
    }

    // A side without explicit clues is read off the goal image.
    let row_lines = match row_lines {
        Some(lines) => lines,
        None => match goals.first() {
            Some(goal) => derive_row_clues(&goal.cells, row_count, column_count),
            None => {
                diagnostics.push(DiagnosticKind::PuzzleMissingClues, scratch.location);
                return;
            }
        },
    };
    let column_lines = match column_lines {
        Some(lines) => lines,
        None => match goals.first() {
            Some(goal) => derive_column_clues(&goal.cells, row_count, column_count),
            None => {
                diagnostics.push(DiagnosticKind::PuzzleMissingClues, scratch.location);
                return;
            }
        },
    };

    // Commit, always in the same order so equal puzzles produce equal arenas.
    let source = store.intern_string(&scratch.source);
    let id = store.intern_string(&scratch.id);
    let title = store.intern_string(&scratch.title);
    let author = store.intern_string(&scratch.author);
    let author_id = store.intern_string(&scratch.author_id);
    let copyright = store.intern_string(&scratch.copyright);
    let description = store.intern_string(&scratch.description);

    let mut packed_colors = Vec::with_capacity(scratch.colors.len());
    for color in &scratch.colors {
        packed_colors.push(Color {
            name: store.intern_string(&color.name),
            ch: color.ch.unwrap_or(b' '),
            rgb: color.rgb,
        });
    }
    let colors = store.push_slice(&packed_colors);

    let row_clues = push_lines(store, &row_lines);
    let column_clues = push_lines(store, &column_lines);
    let goals = push_solutions(store, &goals);
    let solved_solutions = push_solutions(store, &solved);
    let saved_solutions = push_solutions(store, &saved);
    let notes = push_notes(store, &scratch.notes);

    store.push_puzzle(PuzzleRecord {
        source,
        id,
        title,
        author,
        author_id,
        copyright,
        description,
        colors,
        row_clues,
        column_clues,
        goals,
        solved_solutions,
        saved_solutions,
        notes,
    });
}

/// Hand out glyphs from the fixed alphabet, skipping any already in use.
fn assign_glyphs(colors: &mut [ScratchColor]) {
    let mut used = [false; 256];
    for color in colors.iter() {
        if let Some(ch) = color.ch {
            used[ch as usize] = true;
        }
    }
    for color in colors.iter_mut() {
        if color.ch.is_none() {
            if let Some(&glyph) = GLYPH_ALPHABET.iter().find(|&&g| !used[g as usize]) {
                used[glyph as usize] = true;
                color.ch = Some(glyph);
            }
        }
    }
}

/// Map parsed clue color names to palette indices.
///
/// `Err` means an undefined color name; the caller drops the puzzle.
fn resolve_lines(
    lines: Option<&[Vec<ScratchClue>]>,
    names: &HashMap<&str, u8>,
    default_name: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Vec<Vec<Clue>>>, ()> {
    let Some(lines) = lines else {
        return Ok(None);
    };
    let mut resolved_lines = Vec::with_capacity(lines.len());
    for line in lines {
        let mut resolved = Vec::with_capacity(line.len());
        for clue in line {
            let name = clue.color.as_deref().unwrap_or(default_name);
            match names.get(name) {
                Some(&index) => resolved.push(Clue {
                    color: index,
                    count: clue.count,
                }),
                None => {
                    diagnostics.push(DiagnosticKind::PuzzleColorUndefined, clue.location);
                    return Err(());
                }
            }
        }
        resolved_lines.push(resolved);
    }
    Ok(Some(resolved_lines))
}

/// Encode one image's cells as candidate bitsets.
fn encode_cells(
    solution: &ScratchSolution,
    glyphs: &HashMap<u8, u8>,
    mask: u32,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Cell>, CellError> {
    let image = &solution.image;
    let mut cells = Vec::with_capacity(image.row_count() * image.column_count());
    for row in image.rows() {
        for spec in row {
            let bits = match spec {
                CellSpec::Any => mask,
                CellSpec::Glyph(glyph) => match glyphs.get(glyph) {
                    Some(&index) => 1u32 << index,
                    None => {
                        diagnostics
                            .push(DiagnosticKind::PuzzleColorUndefined, solution.location);
                        return Err(CellError::UnknownGlyph);
                    }
                },
                CellSpec::Group(group) => {
                    let mut bits = 0u32;
                    for glyph in group {
                        match glyphs.get(glyph) {
                            Some(&index) => bits |= 1 << index,
                            None => {
                                diagnostics.push(
                                    DiagnosticKind::PuzzleColorUndefined,
                                    solution.location,
                                );
                                return Err(CellError::UnknownGlyph);
                            }
                        }
                    }
                    bits
                }
            };
            if solution.kind != SolutionKind::Saved && bits.count_ones() != 1 {
                diagnostics.push(
                    DiagnosticKind::SolutionIndeterminateImage,
                    solution.location,
                );
                return Err(CellError::Indeterminate);
            }
            cells.push(Cell(bits));
        }
    }
    Ok(cells)
}

/// Run-length clues for every row of a goal image.
pub(crate) fn derive_row_clues(cells: &[Cell], rows: usize, columns: usize) -> Vec<Vec<Clue>> {
    (0..rows)
        .map(|r| run_lengths((0..columns).map(|c| cells[r * columns + c])))
        .collect()
}

/// Run-length clues for every column of a goal image.
pub(crate) fn derive_column_clues(cells: &[Cell], rows: usize, columns: usize) -> Vec<Vec<Clue>> {
    (0..columns)
        .map(|c| run_lengths((0..rows).map(|r| cells[r * columns + c])))
        .collect()
}

/// Collapse a line of determined cells into clues, dropping background runs.
fn run_lengths<I: Iterator<Item = Cell>>(line: I) -> Vec<Clue> {
    let mut clues = Vec::new();
    let mut run: Option<Clue> = None;
    for cell in line {
        let color = cell.single().unwrap_or(0);
        match &mut run {
            Some(clue) if clue.color == color => clue.count += 1,
            _ => {
                if let Some(clue) = run.take() {
                    if clue.color != 0 {
                        clues.push(clue);
                    }
                }
                run = Some(Clue { color, count: 1 });
            }
        }
    }
    if let Some(clue) = run {
        if clue.color != 0 {
            clues.push(clue);
        }
    }
    clues
}

fn push_lines(store: &mut Store, lines: &[Vec<Clue>]) -> DataIndex {
    let indices: Vec<DataIndex> = lines.iter().map(|line| store.push_slice(line)).collect();
    store.push_slice(&indices)
}

fn push_solutions(store: &mut Store, solutions: &[ReadySolution<'_>]) -> DataIndex {
    let mut packed = Vec::with_capacity(solutions.len());
    for solution in solutions {
        let id = store.intern_string(solution.id);
        let notes = push_notes(store, solution.notes);
        let image = store.push_slice(&solution.cells);
        packed.push(Solution { id, image, notes });
    }
    store.push_slice(&packed)
}

fn push_notes(store: &mut Store, notes: &[String]) -> DataIndex {
    let indices: Vec<StringIndex> = notes.iter().map(|note| store.intern_string(note)).collect();
    store.push_slice(&indices)
}
