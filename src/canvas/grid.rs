//! Fixed-size character grid with per-cell styles.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use super::glyph::CellGlyph;

const BACKGROUND_DOT: char = '·';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Content {
    #[default]
    Blank,
    Char(char),
    Line(CellGlyph),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Cell {
    content: Content,
    style: Style,
}

impl Cell {
    fn symbol(&self) -> char {
        match self.content {
            Content::Blank => ' ',
            Content::Char(c) => c,
            Content::Line(glyph) => glyph.symbol(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            self.cells.get_mut(y * self.width + x)
        } else {
            None
        }
    }

    /// Overwrite one cell. Out-of-bounds writes are clipped.
    pub fn put_char(&mut self, x: usize, y: usize, ch: char, style: Style) {
        if let Some(cell) = self.cell_mut(x, y) {
            *cell = Cell {
                content: Content::Char(ch),
                style,
            };
        }
    }

    /// Write `text` left to right, clipped at `max_width` cells.
    pub fn put_str(&mut self, x: usize, y: usize, text: &str, max_width: usize, style: Style) {
        for (offset, ch) in text.chars().take(max_width).enumerate() {
            self.put_char(x + offset, y, ch, style);
        }
    }

    /// Paint a connector segment, merging with any connector already there.
    /// Cells holding text are left alone.
    pub fn put_line(&mut self, x: usize, y: usize, glyph: CellGlyph, style: Style) {
        let Some(cell) = self.cell_mut(x, y) else { return };
        let merged = match cell.content {
            Content::Blank => glyph,
            Content::Line(existing) => existing.merge(glyph),
            Content::Char(_) => return,
        };
        *cell = Cell {
            content: Content::Line(merged),
            style,
        };
    }

    pub fn fill(&mut self, x: usize, y: usize, width: usize, height: usize, ch: char, style: Style) {
        for row in y..y + height {
            for col in x..x + width {
                self.put_char(col, row, ch, style);
            }
        }
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> Option<CellGlyph> {
        match self.cells.get(y * self.width + x)?.content {
            Content::Line(glyph) if x < self.width => Some(glyph),
            _ => None,
        }
    }

    /// Plain text of one row, background excluded, trailing spaces trimmed.
    pub fn row_text(&self, y: usize) -> String {
        if y >= self.height {
            return String::new();
        }
        let row = &self.cells[y * self.width..(y + 1) * self.width];
        let text: String = row.iter().map(Cell::symbol).collect();
        text.trim_end().to_string()
    }

    /// Styled lines for the window at `(x0, y0)` of size `width × height`.
    ///
    /// Blank cells on the sparse dot lattice show a dim background dot.
    /// Trailing blank cells are trimmed from every line.
    pub fn lines(&self, x0: usize, y0: usize, width: usize, height: usize) -> Vec<Line<'static>> {
        let dot_style = Style::default().fg(Color::Rgb(58, 58, 58));
        let x_end = (x0 + width).min(self.width);
        let y_end = (y0 + height).min(self.height);

        (y0..y_end)
            .map(|y| {
                let mut cells: Vec<(char, Style)> = (x0..x_end)
                    .map(|x| {
                        let cell = &self.cells[y * self.width + x];
                        match cell.content {
                            Content::Blank if on_dot_lattice(x, y) => (BACKGROUND_DOT, dot_style),
                            _ => (cell.symbol(), cell.style),
                        }
                    })
                    .collect();
                while cells.last().is_some_and(|(ch, _)| *ch == ' ') {
                    cells.pop();
                }
                Line::from(spans(cells))
            })
            .collect()
    }

    /// The whole grid as styled lines.
    pub fn to_lines(&self) -> Vec<Line<'static>> {
        self.lines(0, 0, self.width, self.height)
    }
}

fn on_dot_lattice(x: usize, y: usize) -> bool {
    x % 6 == 3 && y % 3 == 1
}

/// Collapse runs of equally styled cells into spans.
fn spans(cells: Vec<(char, Style)>) -> Vec<Span<'static>> {
    let mut out: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style: Option<Style> = None;
    for (ch, style) in cells {
        if run_style.is_some_and(|s| s != style) {
            out.push(Span::styled(std::mem::take(&mut run), run_style.unwrap_or_default()));
        }
        run_style = Some(style);
        run.push(ch);
    }
    if let Some(style) = run_style {
        out.push(Span::styled(run, style));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_writes_are_clipped() {
        let mut grid = Grid::new(4, 2);
        grid.put_str(2, 0, "abcdef", 10, Style::default());
        grid.put_char(9, 9, 'x', Style::default());
        assert_eq!(grid.row_text(0), "  ab");
        assert_eq!(grid.row_text(5), "");
    }

    #[test]
    fn test_crossing_lines_merge() {
        let mut grid = Grid::new(3, 3);
        for x in 0..3 {
            grid.put_line(x, 1, CellGlyph::Horizontal, Style::default());
        }
        for y in 0..3 {
            grid.put_line(1, y, CellGlyph::Vertical, Style::default());
        }
        assert_eq!(grid.row_text(1), "─┼─");
        assert_eq!(grid.glyph_at(1, 1), Some(CellGlyph::Cross));
    }

    #[test]
    fn test_lines_never_overwrite_text() {
        let mut grid = Grid::new(3, 1);
        grid.put_char(1, 0, '█', Style::default());
        grid.put_line(1, 0, CellGlyph::Vertical, Style::default());
        assert_eq!(grid.row_text(0), " █");
    }

    #[test]
    fn test_lines_trim_trailing_blanks_and_group_styles() {
        let mut grid = Grid::new(12, 2);
        let red = Style::default().fg(Color::Red);
        grid.put_str(0, 0, "ab", 2, red);
        grid.put_str(2, 0, "cd", 2, Style::default());
        let lines = grid.to_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(line_text(&lines[0]), "abcd");
        assert_eq!(lines[0].spans.len(), 2);
        assert!(!line_text(&lines[1]).ends_with(' '));
        assert!(line_text(&lines[1]).contains(BACKGROUND_DOT));
    }

    #[test]
    fn test_window() {
        let mut grid = Grid::new(10, 10);
        grid.put_char(7, 8, 'x', Style::default());
        let lines = grid.lines(5, 8, 5, 5);
        assert_eq!(lines.len(), 2);
        assert_eq!(line_text(&lines[0]).trim_start_matches([' ', '·']), "x");
    }
}
