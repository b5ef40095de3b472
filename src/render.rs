//! Canonical XML output
//!
//! Walks a normalized puzzle set and emits its canonical document form:
//! fixed child order, two-space indentation, attributes only where they
//! differ from their defaults. Rendering is deterministic; parsing the
//! output reproduces the same set.

use std::io::{self, Write};

use crate::model::{Cell, Image, Puzzle, PuzzleSet};
use crate::store::{DataIndex, Store, StringIndex};

/// Render a puzzle set to a writer as canonical XML.
pub fn render<W: Write>(set: &PuzzleSet, mut writer: W) -> io::Result<()> {
    writer.write_all(render_to_string(set).as_bytes())
}

/// Render a puzzle set to a canonical XML string.
pub fn render_to_string(set: &PuzzleSet) -> String {
    let mut out = String::new();
    let store = set.store();
    let root = store.puzzle_records()[0];

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    out.push_str("<puzzleset>\n");
    text_element(&mut out, store, 1, "source", root.source);
    text_element(&mut out, store, 1, "title", root.title);
    text_element(&mut out, store, 1, "author", root.author);
    text_element(&mut out, store, 1, "authorid", root.author_id);
    text_element(&mut out, store, 1, "copyright", root.copyright);
    for index in 0..set.puzzle_count() {
        puzzle_element(&mut out, set, index);
    }
    note_elements(&mut out, store, 1, root.notes);
    out.push_str("</puzzleset>\n");
    out
}

fn puzzle_element(out: &mut String, set: &PuzzleSet, index: usize) {
    let store = set.store();
    let record = store.puzzle_records()[index + 1];
    let view = set.puzzle(index);

    out.push_str("  <puzzle");
    // The reserved palette slots carry the declared color roles; the
    // attributes appear only when they differ from the defaults.
    if view.color_name(1) != "black" {
        out.push_str(" defaultcolor=\"");
        out.push_str(&escape_attr(view.color_name(1)));
        out.push('"');
    }
    if view.color_name(0) != "white" {
        out.push_str(" backgroundcolor=\"");
        out.push_str(&escape_attr(view.color_name(0)));
        out.push('"');
    }
    out.push_str(">\n");

    // Puzzle-local metadata only; inherited values stay on the root.
    text_element(out, store, 2, "source", record.source);
    text_element(out, store, 2, "id", record.id);
    text_element(out, store, 2, "title", record.title);
    text_element(out, store, 2, "author", record.author);
    text_element(out, store, 2, "authorid", record.author_id);
    text_element(out, store, 2, "copyright", record.copyright);
    text_element(out, store, 2, "description", record.description);

    for color_index in 0..view.color_count() {
        let color = view.color(color_index);
        out.push_str("    <color name=\"");
        out.push_str(&escape_attr(store.resolve_string(color.name)));
        out.push_str("\" char=\"");
        out.push_str(&escape_attr(&char::from(color.ch).to_string()));
        out.push_str("\">");
        out.push_str(&format!(
            "{:02X}{:02X}{:02X}",
            color.rgb[0], color.rgb[1], color.rgb[2]
        ));
        out.push_str("</color>\n");
    }

    clue_block(out, &view, true);
    clue_block(out, &view, false);

    for i in 0..view.goal_count() {
        solution_element(out, &view, &view.goal(i), None);
    }
    for i in 0..view.solved_count() {
        solution_element(out, &view, &view.solved(i), Some("solution"));
    }
    for i in 0..view.saved_count() {
        solution_element(out, &view, &view.saved(i), Some("saved"));
    }

    note_elements(out, store, 2, record.notes);
    out.push_str("  </puzzle>\n");
}

fn clue_block(out: &mut String, view: &Puzzle<'_>, rows: bool) {
    let type_name = if rows { "rows" } else { "columns" };
    let line_count = if rows {
        view.row_count()
    } else {
        view.column_count()
    };
    out.push_str("    <clues type=\"");
    out.push_str(type_name);
    out.push_str("\">\n");
    for line in 0..line_count {
        let clue_count = if rows {
            view.row_clue_count(line)
        } else {
            view.column_clue_count(line)
        };
        if clue_count == 0 {
            out.push_str("      <line/>\n");
            continue;
        }
        out.push_str("      <line>\n");
        for i in 0..clue_count {
            let clue = if rows {
                view.row_clue(line, i)
            } else {
                view.column_clue(line, i)
            };
            out.push_str("        <count");
            if clue.color != 1 {
                out.push_str(" color=\"");
                out.push_str(&escape_attr(view.color_name(u32::from(clue.color))));
                out.push('"');
            }
            out.push('>');
            out.push_str(&clue.count.to_string());
            out.push_str("</count>\n");
        }
        out.push_str("      </line>\n");
    }
    out.push_str("    </clues>\n");
}

fn solution_element(out: &mut String, view: &Puzzle<'_>, image: &Image<'_>, kind: Option<&str>) {
    out.push_str("    <solution");
    if let Some(kind) = kind {
        out.push_str(" type=\"");
        out.push_str(kind);
        out.push('"');
    }
    if !image.id().is_empty() {
        out.push_str(" id=\"");
        out.push_str(&escape_attr(image.id()));
        out.push('"');
    }
    out.push_str(">\n");

    out.push_str("      <image>");
    let n_colors = view.color_count();
    for row in 0..image.rows() {
        out.push('\n');
        out.push('|');
        for column in 0..image.columns() {
            cell_text(out, view, image.get(row, column), n_colors);
        }
        out.push('|');
    }
    out.push_str("\n</image>\n");

    for i in 0..image.note_count() {
        out.push_str("      <note>");
        out.push_str(&escape_text(image.note(i)));
        out.push_str("</note>\n");
    }
    out.push_str("    </solution>\n");
}

/// Emit one cell: a glyph when determined, `?` when fully open, a bracketed
/// ascending glyph group otherwise.
fn cell_text(out: &mut String, view: &Puzzle<'_>, cell: Cell, n_colors: u32) {
    let population = cell.count();
    if population == 1 {
        push_glyph(out, view.color(cell.0.trailing_zeros()).ch);
    } else if population == n_colors && n_colors > 1 {
        out.push('?');
    } else {
        out.push('[');
        for index in 0..n_colors {
            if cell.contains(index as u8) {
                push_glyph(out, view.color(index).ch);
            }
        }
        out.push(']');
    }
}

/// Push a cell glyph, escaping XML-significant bytes.
fn push_glyph(out: &mut String, glyph: u8) {
    match glyph {
        b'&' => out.push_str("&amp;"),
        b'<' => out.push_str("&lt;"),
        b'>' => out.push_str("&gt;"),
        other => out.push(char::from(other)),
    }
}

/// Emit `<name>text</name>` at the given indent, omitting empty strings.
fn text_element(out: &mut String, store: &Store, indent: usize, name: &str, text: StringIndex) {
    let body = store.resolve_string(text);
    if body.is_empty() {
        return;
    }
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&escape_text(body));
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

/// Emit every note in a slice, keeping empty bodies (a note element with no
/// text is still a note).
fn note_elements(out: &mut String, store: &Store, indent: usize, notes: DataIndex) {
    for i in 0..store.slice_len(notes) {
        let at: StringIndex = store.slice_elem(notes, i);
        for _ in 0..indent {
            out.push_str("  ");
        }
        out.push_str("<note>");
        out.push_str(&escape_text(store.resolve_string(at)));
        out.push_str("</note>\n");
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a & b < c > d"), "a &amp; b &lt; c &gt; d");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn test_escape_attr_also_quotes() {
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_push_glyph_escapes() {
        let mut out = String::new();
        push_glyph(&mut out, b'&');
        push_glyph(&mut out, b'X');
        assert_eq!(out, "&amp;X");
    }
}
