//! Paints a laid-out graph with progress overlays onto a [`Grid`].
//!
//! Connectors are painted first so cards always sit on top of them.

use std::collections::BTreeMap;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;

use crate::graph::{Graph, GridPos, Layout, Node, ResourceKind};
use crate::progress::{Progress, Status};

use super::glyph::{CellGlyph, DOWN, LEFT, RIGHT, UP};
use super::grid::Grid;

pub const CARD_WIDTH: usize = 26;
pub const CARD_HEIGHT: usize = 6;
pub const COLUMN_GAP: usize = 10;
pub const ROW_GAP: usize = 2;
pub const MARGIN: usize = 3;

const BAR_WIDTH: usize = 15;
const INNER_WIDTH: usize = CARD_WIDTH - 4;

pub const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const FAILED_MARKER: char = '✗';
const SELECTION_ARROW: char = '▶';
const ARROWHEAD: char = '▸';

/// Everything needed to paint one frame of the graph.
pub struct Scene<'a> {
    pub graph: &'a Graph,
    pub layout: &'a Layout,
    pub progress: &'a BTreeMap<String, Progress>,
    /// False until the first refresh cycle resolved.
    pub progress_loaded: bool,
    pub selected: Option<&'a str>,
    pub spinner_frame: usize,
}

pub fn status_color(status: Status) -> Color {
    match status {
        Status::Completed => Color::Green,
        Status::Failed => Color::Red,
        Status::Running => Color::Cyan,
        Status::Pending => Color::DarkGray,
    }
}

/// Top-left cell of the card at `pos`.
pub fn card_origin(pos: GridPos) -> (usize, usize) {
    (
        MARGIN + pos.column * (CARD_WIDTH + COLUMN_GAP),
        MARGIN + pos.row * (CARD_HEIGHT + ROW_GAP),
    )
}

impl Scene<'_> {
    /// Size of the full, unscrolled canvas.
    pub fn canvas_size(&self) -> (usize, usize) {
        let columns = self.layout.levels.len();
        let rows = self.layout.max_rows();
        if columns == 0 {
            return (0, 0);
        }
        (
            2 * MARGIN + columns * CARD_WIDTH + (columns - 1) * COLUMN_GAP,
            2 * MARGIN + rows * CARD_HEIGHT + rows.saturating_sub(1) * ROW_GAP,
        )
    }

    pub fn paint(&self) -> Grid {
        let (width, height) = self.canvas_size();
        let mut grid = Grid::new(width, height);

        for edge in &self.graph.edges {
            let (Some(from), Some(to)) = (
                self.layout.position(&edge.from),
                self.layout.position(&edge.to),
            ) else {
                continue;
            };
            // Same or backward column only happens inside a cycle.
            if from.column >= to.column {
                continue;
            }
            let touches_selection = self
                .selected
                .is_some_and(|id| id == edge.from || id == edge.to);
            let style = if touches_selection {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            draw_connector(&mut grid, from, to, style);
        }

        for (id, pos) in &self.layout.positions {
            if let Some(node) = self.graph.node(id) {
                self.draw_card(&mut grid, node, *pos);
            }
        }

        if let Some(pos) = self.selected.and_then(|id| self.layout.position(id)) {
            draw_selection(&mut grid, pos);
        }
        grid
    }

    /// Viewport offset that keeps the selected card fully visible.
    pub fn scroll_offset(&self, view_width: usize, view_height: usize) -> (usize, usize) {
        let Some(pos) = self.selected.and_then(|id| self.layout.position(id)) else {
            return (0, 0);
        };
        let (x, y) = card_origin(pos);
        let right = x + CARD_WIDTH + MARGIN;
        let bottom = y + CARD_HEIGHT + MARGIN;
        (
            right.saturating_sub(view_width),
            bottom.saturating_sub(view_height),
        )
    }

    /// Styled lines for a `width × height` viewport.
    pub fn render(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let (x0, y0) = self.scroll_offset(width, height);
        self.paint().lines(x0, y0, width, height)
    }

    fn draw_card(&self, grid: &mut Grid, node: &Node, pos: GridPos) {
        let (x, y) = card_origin(pos);
        let progress = self.progress.get(&node.id);
        let failed = progress.is_some_and(|p| p.status == Status::Failed);
        let border_color = match progress {
            Some(p) => status_color(p.status),
            None if node.stub => Color::DarkGray,
            None => Color::Gray,
        };
        let border = Style::default().fg(border_color);
        let text = Style::default().fg(Color::White);
        let dim = Style::default().fg(Color::DarkGray);

        grid.fill(x + 1, y + 1, CARD_WIDTH - 2, CARD_HEIGHT - 2, ' ', Style::default());
        draw_box(grid, x, y, CARD_WIDTH, CARD_HEIGHT, ['╭', '╮', '╰', '╯', '─', '│'], border);

        let inner = x + 2;
        let mut title = String::new();
        if failed {
            title.push(FAILED_MARKER);
            title.push(' ');
        }
        title.push_str(node.label());
        let title_style = if failed {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            text.add_modifier(Modifier::BOLD)
        };
        grid.put_str(inner, y + 1, &crate::util::truncate(&title, INNER_WIDTH), INNER_WIDTH, title_style);

        let kind_line = format!("{} {}", icon(node), type_label(node));
        grid.put_str(inner, y + 2, &crate::util::truncate(&kind_line, INNER_WIDTH), INNER_WIDTH, dim);

        let ident = node.key.as_deref().unwrap_or(&node.id);
        grid.put_str(inner, y + 3, &crate::util::truncate(ident, INNER_WIDTH), INNER_WIDTH, dim);

        match progress {
            Some(p) => draw_bar(grid, inner, y + 4, p),
            None if !self.progress_loaded && !node.stub => {
                let frame = SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()];
                grid.put_char(inner, y + 4, frame, Style::default().fg(Color::Yellow));
                grid.put_str(inner + 2, y + 4, "loading", INNER_WIDTH, dim);
            }
            None => {}
        }
    }
}

fn icon(node: &Node) -> char {
    if node.stub {
        return '◌';
    }
    match node.kind() {
        Some(ResourceKind::Terraform) => '◆',
        Some(ResourceKind::Helm) => '⎈',
        None => '○',
    }
}

fn type_label(node: &Node) -> &str {
    if node.stub {
        "external"
    } else {
        node.type_tag.as_deref().unwrap_or("resource")
    }
}

fn draw_bar(grid: &mut Grid, x: usize, y: usize, progress: &Progress) {
    let filled = (progress.percent as usize * BAR_WIDTH + 50) / 100;
    let color = status_color(progress.status);
    grid.put_str(x, y, &"█".repeat(filled), BAR_WIDTH, Style::default().fg(color));
    grid.put_str(
        x + filled,
        y,
        &"░".repeat(BAR_WIDTH - filled),
        BAR_WIDTH,
        Style::default().fg(Color::DarkGray),
    );
    let label = format!("{:>4}%", progress.percent);
    grid.put_str(x + BAR_WIDTH + 1, y, &label, 5, Style::default().fg(color));
}

/// corners: top-left, top-right, bottom-left, bottom-right, horizontal, vertical.
fn draw_box(grid: &mut Grid, x: usize, y: usize, w: usize, h: usize, chars: [char; 6], style: Style) {
    let [tl, tr, bl, br, hz, vt] = chars;
    for col in x + 1..x + w - 1 {
        grid.put_char(col, y, hz, style);
        grid.put_char(col, y + h - 1, hz, style);
    }
    for row in y + 1..y + h - 1 {
        grid.put_char(x, row, vt, style);
        grid.put_char(x + w - 1, row, vt, style);
    }
    grid.put_char(x, y, tl, style);
    grid.put_char(x + w - 1, y, tr, style);
    grid.put_char(x, y + h - 1, bl, style);
    grid.put_char(x + w - 1, y + h - 1, br, style);
}

fn draw_selection(grid: &mut Grid, pos: GridPos) {
    let (x, y) = card_origin(pos);
    let glow = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    draw_box(
        grid,
        x - 1,
        y - 1,
        CARD_WIDTH + 2,
        CARD_HEIGHT + 2,
        ['┏', '┓', '┗', '┛', '━', '┃'],
        glow,
    );
    grid.put_char(x - 2, y + CARD_HEIGHT / 2, SELECTION_ARROW, glow);
}

/// Orthogonal path: out of the source's right edge, over to the gutter
/// just after the source column, vertically to the target row, then into
/// the target's left edge.
fn draw_connector(grid: &mut Grid, from: GridPos, to: GridPos, style: Style) {
    let (fx, fy) = card_origin(from);
    let (tx, ty) = card_origin(to);
    let start_x = fx + CARD_WIDTH;
    let start_y = fy + CARD_HEIGHT / 2;
    let end_x = tx - 1;
    let end_y = ty + CARD_HEIGHT / 2;
    let mid_x = start_x + COLUMN_GAP / 2;

    let horizontal = CellGlyph::Horizontal;
    for x in start_x..mid_x {
        grid.put_line(x, start_y, horizontal, style);
    }

    if start_y == end_y {
        grid.put_line(mid_x, start_y, horizontal, style);
    } else {
        let (down_from_start, into_end) = if end_y > start_y { (DOWN, UP) } else { (UP, DOWN) };
        grid.put_line(mid_x, start_y, CellGlyph::from_arms(LEFT | down_from_start), style);
        for y in start_y.min(end_y) + 1..start_y.max(end_y) {
            grid.put_line(mid_x, y, CellGlyph::Vertical, style);
        }
        grid.put_line(mid_x, end_y, CellGlyph::from_arms(into_end | RIGHT), style);
    }

    for x in mid_x + 1..end_x {
        grid.put_line(x, end_y, horizontal, style);
    }
    grid.put_char(end_x, end_y, ARROWHEAD, style);
}
