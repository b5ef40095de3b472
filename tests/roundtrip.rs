//! End-to-end parse and render tests
//!
//! These exercise the full pipeline on small documents and check the
//! normalization properties: parse-render-parse is idempotent, rendering is
//! deterministic, and derived clues match explicit ones.

use pbnset::{parse, render_to_string, Cell, Diagnostics, PuzzleSet};

fn parse_ok(input: &str) -> PuzzleSet {
    let mut diagnostics = Diagnostics::new();
    match parse(input.as_bytes(), &mut diagnostics) {
        Ok(set) => set,
        Err(err) => panic!("parse failed: {err}; diagnostics: {diagnostics:?}"),
    }
}

const BINARY_WITH_CLUES: &str = "<puzzleset><puzzle>\
<clues type=\"rows\"><line><count>1</count></line><line><count color=\"black\">2</count></line></clues>\
<clues type=\"columns\"><line><count>2</count></line><line><count>1</count></line></clues>\
<solution type=\"goal\"><image>|X.||[X] X|</image></solution>\
</puzzle></puzzleset>";

const BINARY_WITHOUT_CLUES: &str = "<puzzleset><puzzle>\
<solution type=\"goal\"><image>|X.||[X] X|</image></solution>\
</puzzle></puzzleset>";

#[test]
fn test_binary_puzzle_with_explicit_clues() {
    let set = parse_ok(BINARY_WITH_CLUES);
    let xml = render_to_string(&set);

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n"));
    // The implicit palette is materialized, background first.
    assert!(xml.contains("<color name=\"white\" char=\".\">FFFFFF</color>"));
    assert!(xml.contains("<color name=\"black\" char=\"X\">000000</color>"));
    let white = xml.find("name=\"white\"").unwrap();
    let black = xml.find("name=\"black\"").unwrap();
    assert!(white < black);
    // The goal image renders canonically: the group collapses to a glyph.
    assert!(xml.contains("<image>\n|X.|\n|XX|\n</image>"));
    // The default-color attribute on a count is dropped.
    assert!(!xml.contains("color=\"black\""));
}

#[test]
fn test_clues_derived_from_goal_match_explicit() {
    let with = render_to_string(&parse_ok(BINARY_WITH_CLUES));
    let without = render_to_string(&parse_ok(BINARY_WITHOUT_CLUES));
    assert_eq!(with, without);
}

#[test]
fn test_derived_clue_values() {
    let set = parse_ok(BINARY_WITHOUT_CLUES);
    let puzzle = set.puzzle(0);
    assert_eq!(puzzle.row_count(), 2);
    assert_eq!(puzzle.column_count(), 2);
    assert_eq!(puzzle.row_clue_count(0), 1);
    assert_eq!(puzzle.row_clue(0, 0).count, 1);
    assert_eq!(puzzle.row_clue(1, 0).count, 2);
    assert_eq!(puzzle.column_clue(0, 0).count, 2);
    assert_eq!(puzzle.column_clue(1, 0).count, 1);
    // Clues never name the background.
    for line in 0..2 {
        for i in 0..puzzle.row_clue_count(line) {
            assert_ne!(puzzle.row_clue(line, i).color, 0);
        }
    }
}

#[test]
fn test_saved_solution_roundtrip() {
    let input = "<puzzleset><puzzle>\
<clues type=\"rows\"><line><count>2</count></line><line><count>2</count></line></clues>\
<clues type=\"columns\"><line><count>2</count></line><line><count>2</count></line></clues>\
<solution type=\"saved\"><image>|[X.]?||XX|</image></solution>\
</puzzle></puzzleset>";
    let set = parse_ok(input);
    // Two colors, so [X.] has both bits set, which is the same as ?.
    let xml = render_to_string(&set);
    assert!(xml.contains("<image>\n|??|\n|XX|\n</image>"));
    assert!(xml.contains("type=\"saved\""));

    let puzzle = set.puzzle(0);
    assert_eq!(puzzle.saved_count(), 1);
    let image = puzzle.saved(0);
    assert_eq!(image.get(0, 0), Cell(0b11));
    assert_eq!(image.get(1, 0), Cell::of(1));
}

#[test]
fn test_parse_render_parse_is_idempotent() {
    for input in [BINARY_WITH_CLUES, BINARY_WITHOUT_CLUES] {
        let first = parse_ok(input);
        let second = parse_ok(&render_to_string(&first));
        assert_eq!(first, second);
    }
}

#[test]
fn test_rendering_is_deterministic() {
    let set = parse_ok(BINARY_WITH_CLUES);
    assert_eq!(render_to_string(&set), render_to_string(&set));
}

#[test]
fn test_solution_sizes_match_clue_lines() {
    let set = parse_ok(BINARY_WITH_CLUES);
    let puzzle = set.puzzle(0);
    let cells = puzzle.row_count() * puzzle.column_count();
    for i in 0..puzzle.goal_count() {
        let image = puzzle.goal(i);
        assert_eq!(image.rows() * image.columns(), cells);
    }
}

#[test]
fn test_goal_cells_are_determined() {
    let set = parse_ok(BINARY_WITH_CLUES);
    let puzzle = set.puzzle(0);
    let image = puzzle.goal(0);
    for row in 0..image.rows() {
        for column in 0..image.columns() {
            assert_eq!(image.get(row, column).count(), 1);
        }
    }
}

#[test]
fn test_metadata_inheritance() {
    let input = "<puzzleset><author>Root Author</author><source>Root Source</source>\
<puzzle><author>Own Author</author>\
<solution><image>|X|</image></solution></puzzle>\
<puzzle><solution><image>|X|</image></solution></puzzle>\
</puzzleset>";
    let set = parse_ok(input);
    // A non-empty author shadows the root; an empty one reads through.
    assert_eq!(set.puzzle(0).author(), "Own Author");
    assert_eq!(set.puzzle(1).author(), "Root Author");
    assert_eq!(set.puzzle(0).source(), "Root Source");
    assert_eq!(set.puzzle(1).source(), "Root Source");
}

#[test]
fn test_inherited_metadata_not_materialized_in_output() {
    let input = "<puzzleset><author>Root Author</author>\
<puzzle><solution><image>|X|</image></solution></puzzle>\
</puzzleset>";
    let set = parse_ok(input);
    let xml = render_to_string(&set);
    // The author stays on the root element only.
    assert_eq!(xml.matches("<author>").count(), 1);
    let reparsed = parse_ok(&xml);
    assert_eq!(reparsed.puzzle(0).author(), "Root Author");
}

#[test]
fn test_nondefault_color_roles_render_as_attributes() {
    let input = "<puzzleset>\
<puzzle defaultcolor=\"red\" backgroundcolor=\"blue\">\
<color name=\"red\" char=\"R\">FF0000</color>\
<color name=\"blue\" char=\"B\">0000FF</color>\
<clues type=\"rows\"><line><count>1</count></line></clues>\
<clues type=\"columns\"><line><count>1</count></line></clues>\
</puzzle></puzzleset>";
    let set = parse_ok(input);
    let puzzle = set.puzzle(0);
    assert_eq!(puzzle.color_name(0), "blue");
    assert_eq!(puzzle.color_name(1), "red");
    let xml = render_to_string(&set);
    assert!(xml.contains("<puzzle defaultcolor=\"red\" backgroundcolor=\"blue\">"));
    // Default-color clues still omit the attribute.
    assert!(xml.contains("<count>1</count>"));
    assert_eq!(parse_ok(&xml), set);
}

#[test]
fn test_colored_clue_attribute_roundtrip() {
    let input = "<puzzleset><puzzle>\
<color name=\"red\" char=\"R\">FF0000</color>\
<solution><image>|RX|</image></solution>\
</puzzle></puzzleset>";
    let set = parse_ok(input);
    let xml = render_to_string(&set);
    // Red is not the default color, so its derived clue names it.
    assert!(xml.contains("<count color=\"red\">1</count>"));
    assert_eq!(parse_ok(&xml), set);
}

#[test]
fn test_notes_roundtrip() {
    let input = "<puzzleset><note>set note</note>\
<puzzle><note>puzzle note</note>\
<solution><image>|X|</image><note>solution note</note></solution>\
</puzzle></puzzleset>";
    let set = parse_ok(input);
    assert_eq!(set.note_count(), 1);
    assert_eq!(set.note(0), "set note");
    let puzzle = set.puzzle(0);
    assert_eq!(puzzle.note_count(), 1);
    assert_eq!(puzzle.note(0), "puzzle note");
    assert_eq!(puzzle.goal(0).note_count(), 1);
    assert_eq!(puzzle.goal(0).note(0), "solution note");
    assert_eq!(parse_ok(&render_to_string(&set)), set);
}

#[test]
fn test_get_or_create_saved_solution() {
    let mut set = parse_ok(BINARY_WITH_CLUES);
    assert_eq!(set.puzzle(0).saved_count(), 0);

    let index = set.get_or_create_saved_solution(0);
    assert_eq!(index, 0);
    assert_eq!(set.puzzle(0).saved_count(), 1);

    // Fresh saved cells are fully open.
    let mask = set.puzzle(0).color_mask();
    assert_eq!(set.saved_image_get(0, 0, 0, 0), Cell(mask));
    assert_eq!(set.saved_image_get(0, 0, 1, 1), Cell(mask));

    // Idempotent: no second solution appears.
    assert_eq!(set.get_or_create_saved_solution(0), 0);
    assert_eq!(set.puzzle(0).saved_count(), 1);
}

#[test]
fn test_saved_image_set_masks_foreign_bits() {
    let mut set = parse_ok(BINARY_WITH_CLUES);
    set.get_or_create_saved_solution(0);

    set.saved_image_set(0, 0, 0, 0, Cell(0xFFFF_FFF0 | 0b10));
    // Only palette bits survive.
    assert_eq!(set.saved_image_get(0, 0, 0, 0), Cell(0b10));

    set.saved_image_clear(0, 0);
    let mask = set.puzzle(0).color_mask();
    assert_eq!(set.saved_image_get(0, 0, 0, 0), Cell(mask));
}

#[test]
fn test_created_saved_solution_renders_unknown() {
    let mut set = parse_ok(BINARY_WITH_CLUES);
    set.get_or_create_saved_solution(0);
    let xml = render_to_string(&set);
    assert!(xml.contains("<solution type=\"saved\">"));
    assert!(xml.contains("<image>\n|??|\n|??|\n</image>"));
    // The augmented document still round-trips.
    assert_eq!(parse_ok(&xml), set);
}

#[test]
fn test_multiple_puzzles_in_one_set() {
    let input = "<puzzleset>\
<puzzle><id>one</id><solution><image>|X|</image></solution></puzzle>\
<puzzle><id>two</id><solution><image>|XX||X.|</image></solution></puzzle>\
</puzzleset>";
    let set = parse_ok(input);
    assert_eq!(set.puzzle_count(), 2);
    assert_eq!(set.puzzle(0).id(), "one");
    assert_eq!(set.puzzle(1).id(), "two");
    assert_eq!(set.puzzle(1).row_count(), 2);
    assert_eq!(parse_ok(&render_to_string(&set)), set);
}

#[test]
fn test_solution_id_roundtrip() {
    let input = "<puzzleset><puzzle>\
<solution id=\"answer\"><image>|X|</image></solution>\
</puzzle></puzzleset>";
    let set = parse_ok(input);
    assert_eq!(set.puzzle(0).goal(0).id(), "answer");
    let xml = render_to_string(&set);
    assert!(xml.contains("<solution id=\"answer\">"));
    assert_eq!(parse_ok(&xml), set);
}

#[test]
fn test_solved_solution_type_roundtrip() {
    let input = "<puzzleset><puzzle>\
<clues type=\"rows\"><line><count>1</count></line></clues>\
<clues type=\"columns\"><line><count>1</count></line></clues>\
<solution type=\"solution\"><image>|X|</image></solution>\
</puzzle></puzzleset>";
    let set = parse_ok(input);
    assert_eq!(set.puzzle(0).solved_count(), 1);
    let xml = render_to_string(&set);
    assert!(xml.contains("<solution type=\"solution\">"));
    assert_eq!(parse_ok(&xml), set);
}

#[test]
fn test_palette_of_32_colors_accepted() {
    // 30 extras plus explicit black and white: exactly 32.
    let chars: Vec<char> = ('a'..='z').chain('A'..='D').collect();
    let mut extras = String::new();
    for (i, ch) in chars.iter().take(30).enumerate() {
        extras.push_str(&format!(
            "<color name=\"c{i}\" char=\"{ch}\">101010</color>"
        ));
    }
    let input = format!(
        "<puzzleset><puzzle>\
         <color name=\"black\" char=\"X\">000000</color>\
         <color name=\"white\" char=\".\">FFFFFF</color>{extras}\
         <solution><image>|X|</image></solution>\
         </puzzle></puzzleset>"
    );
    let set = parse_ok(&input);
    let puzzle = set.puzzle(0);
    assert_eq!(puzzle.color_count(), 32);
    assert_eq!(puzzle.color_mask(), u32::MAX);
    assert_eq!(parse_ok(&render_to_string(&set)), set);
}
