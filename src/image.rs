//! Image text grammar
//!
//! A solution image is text of the form `|cell+|` per row. Whitespace between
//! and inside rows is ignored. A cell is a single printable glyph, a
//! bracketed candidate group `[c1c2...]`, or a bare `?` meaning "every
//! color". Group interiors allow no whitespace and none of `?`, `\`, `/`.

use thiserror::Error;

/// One cell as written in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellSpec {
    /// A single glyph naming one color.
    Glyph(u8),
    /// A bracketed group of candidate glyphs, in source order.
    Group(Vec<u8>),
    /// `?`: every color is a candidate.
    Any,
}

/// A structurally valid image: one or more rows of equal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageText {
    rows: Vec<Vec<CellSpec>>,
}

impl ImageText {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<CellSpec>] {
        &self.rows
    }
}

/// Structural violations of the image grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageTextError {
    #[error("image has no rows")]
    Empty,
    #[error("image row has no cells")]
    EmptyRow,
    #[error("image rows have differing widths")]
    Ragged,
    #[error("unexpected character '{0}' in image")]
    UnexpectedChar(char),
    #[error("image row is not terminated")]
    UnterminatedRow,
    #[error("candidate group is not terminated")]
    UnterminatedGroup,
    #[error("candidate group is empty")]
    EmptyGroup,
    #[error("invalid character '{0}' in candidate group")]
    BadGroupChar(char),
}

/// Parse image text into rows of cells.
///
/// # Examples
///
/// ```
/// use pbnset::image::{parse_image, CellSpec};
///
/// let image = parse_image("|X.|\n|[X.]?|").unwrap();
/// assert_eq!(image.row_count(), 2);
/// assert_eq!(image.rows()[0][0], CellSpec::Glyph(b'X'));
/// assert_eq!(image.rows()[1][1], CellSpec::Any);
/// ```
pub fn parse_image(text: &str) -> Result<ImageText, ImageTextError> {
    let mut chars = text.chars();
    let mut rows = Vec::new();

    loop {
        match next_non_space(&mut chars) {
            None => break,
            Some('|') => rows.push(parse_row(&mut chars)?),
            Some(c) => return Err(ImageTextError::UnexpectedChar(c)),
        }
    }

    if rows.is_empty() {
        return Err(ImageTextError::Empty);
    }
    let width = rows[0].len();
    if rows.iter().any(|row| row.len() != width) {
        return Err(ImageTextError::Ragged);
    }

    Ok(ImageText { rows })
}

/// Consume cells until the closing `|` of the current row.
fn parse_row(chars: &mut std::str::Chars<'_>) -> Result<Vec<CellSpec>, ImageTextError> {
    let mut cells = Vec::new();
    loop {
        match next_non_space(chars) {
            None => return Err(ImageTextError::UnterminatedRow),
            Some('|') => break,
            Some('?') => cells.push(CellSpec::Any),
            Some('[') => cells.push(CellSpec::Group(parse_group(chars)?)),
            Some(c) if is_cell_glyph(c) => cells.push(CellSpec::Glyph(c as u8)),
            Some(c) => return Err(ImageTextError::UnexpectedChar(c)),
        }
    }
    if cells.is_empty() {
        return Err(ImageTextError::EmptyRow);
    }
    Ok(cells)
}

/// Consume glyphs until the closing `]` of the current group.
fn parse_group(chars: &mut std::str::Chars<'_>) -> Result<Vec<u8>, ImageTextError> {
    let mut glyphs = Vec::new();
    loop {
        match chars.next() {
            None => return Err(ImageTextError::UnterminatedGroup),
            Some(']') => break,
            Some(c) if is_cell_glyph(c) => glyphs.push(c as u8),
            Some(c) => return Err(ImageTextError::BadGroupChar(c)),
        }
    }
    if glyphs.is_empty() {
        return Err(ImageTextError::EmptyGroup);
    }
    Ok(glyphs)
}

fn next_non_space(chars: &mut std::str::Chars<'_>) -> Option<char> {
    chars.find(|c| !c.is_whitespace())
}

/// Whether a character may name a color inside an image.
///
/// Printable ASCII, excluding the grammar's structural characters and the
/// reserved `?`, `/`, `\`.
fn is_cell_glyph(c: char) -> bool {
    matches!(c, '!'..='~') && !matches!(c, '[' | ']' | '|' | '?' | '/' | '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_row() {
        let image = parse_image("|X.X|").unwrap();
        assert_eq!(image.row_count(), 1);
        assert_eq!(image.column_count(), 3);
        assert_eq!(
            image.rows()[0],
            vec![
                CellSpec::Glyph(b'X'),
                CellSpec::Glyph(b'.'),
                CellSpec::Glyph(b'X')
            ]
        );
    }

    #[test]
    fn test_rows_without_separators() {
        // Rows may abut: `||` closes one row and opens the next.
        let image = parse_image("|X.||.X|").unwrap();
        assert_eq!(image.row_count(), 2);
        assert_eq!(image.column_count(), 2);
    }

    #[test]
    fn test_whitespace_ignored() {
        let a = parse_image("|X.|\n  |.X|  ").unwrap();
        let b = parse_image("| X . | | . X |").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_group_cell() {
        let image = parse_image("|[XY].|").unwrap();
        assert_eq!(image.rows()[0][0], CellSpec::Group(vec![b'X', b'Y']));
        assert_eq!(image.column_count(), 2);
    }

    #[test]
    fn test_any_cell() {
        let image = parse_image("|?X|").unwrap();
        assert_eq!(image.rows()[0][0], CellSpec::Any);
    }

    #[test]
    fn test_empty_image() {
        assert_eq!(parse_image(""), Err(ImageTextError::Empty));
        assert_eq!(parse_image("   \n "), Err(ImageTextError::Empty));
    }

    #[test]
    fn test_empty_row() {
        assert_eq!(parse_image("||"), Err(ImageTextError::EmptyRow));
    }

    #[test]
    fn test_ragged_rows() {
        assert_eq!(parse_image("|XX||X|"), Err(ImageTextError::Ragged));
    }

    #[test]
    fn test_unterminated_row() {
        assert_eq!(parse_image("|X."), Err(ImageTextError::UnterminatedRow));
    }

    #[test]
    fn test_unterminated_group() {
        assert_eq!(
            parse_image("|[XY"),
            Err(ImageTextError::UnterminatedGroup)
        );
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(parse_image("|[]|"), Err(ImageTextError::EmptyGroup));
    }

    #[test]
    fn test_group_rejects_wildcard_and_space() {
        assert_eq!(parse_image("|[X?]|"), Err(ImageTextError::BadGroupChar('?')));
        assert_eq!(parse_image("|[X Y]|"), Err(ImageTextError::BadGroupChar(' ')));
        assert_eq!(
            parse_image("|[X/Y]|"),
            Err(ImageTextError::BadGroupChar('/'))
        );
    }

    #[test]
    fn test_slash_rejected_as_cell() {
        assert_eq!(parse_image("|/|"), Err(ImageTextError::UnexpectedChar('/')));
        assert_eq!(
            parse_image("|\\|"),
            Err(ImageTextError::UnexpectedChar('\\'))
        );
    }

    #[test]
    fn test_text_outside_rows() {
        assert_eq!(parse_image("x|X|"), Err(ImageTextError::UnexpectedChar('x')));
    }
}
