//! Terminal UI rendering for the dependency dashboard.
//!
//! Design philosophy:
//! - The graph canvas owns the screen; chrome is one header line, an
//!   optional warning banner and one status line
//! - Grayscale text with status colours doing the talking
//! - Detail views are tabbed panes over a single resource
//!
//! This module renders from RenderState (immutable snapshot) - it never
//! mutates application state.

use ansi_to_tui::IntoText;
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Gauge, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::canvas::{status_color, Scene, SPINNER_FRAMES};
use crate::graph::ResourceKind;
use crate::progress::{infra, InfraProgressRecord, ManagedState, Progress, Status};
use crate::render::RenderState;
use crate::tea::detail::{FileContent, FilesPane, ProgressPane};
use crate::tea::history::{HistoryRow, HistoryView};
use crate::tea::tree::{FileNode, OutputNode, TreeView};
use crate::tea::{DetailState, DetailTab, GraphStatus, Loadable, LogPane, LogStatus, Notification, NotificationLevel};
use crate::util::truncate;

// Color tokens (selection uses REVERSED modifier to adapt to terminal theme)
const COLOR_TEXT_DIMMED: Color = Color::Gray;
const COLOR_TEXT_MUTED: Color = Color::DarkGray;
const COLOR_ACCENT: Color = Color::Cyan;
const COLOR_WARNING: Color = Color::Yellow;

/// Most warning lines shown above the canvas.
const MAX_BANNER_LINES: usize = 3;

// -----------------------------------------------------------------------------
// Context-sensitive keymap system
// -----------------------------------------------------------------------------

/// Context for determining which keybindings to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeymapContext {
    Dashboard,
    Detail(DetailTab),
}

impl KeymapContext {
    pub fn from_render_state(state: &RenderState) -> Self {
        match &state.detail {
            Some(detail) => KeymapContext::Detail(detail.tab),
            None => KeymapContext::Dashboard,
        }
    }
}

/// A single keybinding entry for display.
struct Keybinding(&'static str, &'static str);

/// A group of related keybindings (separated by │).
struct KeybindingGroup(Vec<Keybinding>);

fn keybindings_for_context(ctx: KeymapContext) -> Vec<KeybindingGroup> {
    match ctx {
        KeymapContext::Dashboard => vec![
            KeybindingGroup(vec![
                Keybinding("←→", "level"),
                Keybinding("↑↓", "row"),
                Keybinding("Tab", "next"),
            ]),
            KeybindingGroup(vec![Keybinding("Enter", "open"), Keybinding("r", "refresh")]),
            KeybindingGroup(vec![Keybinding("q", "quit")]),
        ],
        KeymapContext::Detail(tab) => {
            let mut pane = vec![Keybinding("↑↓", "move"), Keybinding("PgUp/PgDn", "page")];
            match tab {
                DetailTab::Files | DetailTab::History => pane.push(Keybinding("Enter", "open")),
                DetailTab::Outputs => pane.push(Keybinding("Enter", "expand/reveal")),
                DetailTab::Logs => {
                    pane.push(Keybinding("f", "follow"));
                    pane.push(Keybinding("G", "tail"));
                }
                DetailTab::Progress => {}
            }
            vec![
                KeybindingGroup(vec![Keybinding("Tab", "next tab")]),
                KeybindingGroup(pane),
                KeybindingGroup(vec![Keybinding("Esc", "back"), Keybinding("q", "quit")]),
            ]
        }
    }
}

/// Main render function - entry point for all UI drawing.
/// Takes an immutable RenderState snapshot.
pub fn draw(frame: &mut Frame, state: &RenderState) {
    let area = frame.area();
    match (&state.graph_status, &state.detail) {
        (GraphStatus::Failed(err), _) => render_fatal(frame, err, area),
        (_, Some(detail)) => render_detail(frame, state, detail, area),
        _ => render_dashboard(frame, state, area),
    }

    if let Some(ref notification) = state.notification {
        render_notification(frame, notification, area);
    }
}

/// Full-screen diagnostic for a graph that could not be built.
fn render_fatal(frame: &mut Frame, err: &str, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Dependency graph unavailable",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::raw(err.to_string())),
        Line::default(),
        Line::from(Span::styled(
            "r retry • q quit",
            Style::default().fg(COLOR_TEXT_MUTED),
        )),
    ];
    let height = (lines.len() as u16).min(area.height);
    let [_, body, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .centered(),
        body,
    );
}

fn render_dashboard(frame: &mut Frame, state: &RenderState, area: Rect) {
    let warnings = state.warnings();
    let banner_height = warnings.len().min(MAX_BANNER_LINES) as u16;
    let [header, banner, canvas, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(banner_height),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(Paragraph::new(dashboard_header(state)), header);
    if banner_height > 0 {
        frame.render_widget(Paragraph::new(banner_lines(&warnings)), banner);
    }
    render_canvas(frame, state, canvas);
    render_statusbar(frame, state, status);
}

fn dashboard_header(state: &RenderState) -> Line<'static> {
    let mut spans = vec![Span::styled(
        "depscope",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    let muted = Style::default().fg(COLOR_TEXT_MUTED);
    if let (Some(graph), Some(layout)) = (&state.graph, &state.layout) {
        spans.push(Span::styled(
            format!(
                "  {} resources • {} levels",
                graph.node_count(),
                layout.levels.len()
            ),
            muted,
        ));
        let done = state
            .progress
            .values()
            .filter(|p| p.status == Status::Completed)
            .count();
        let failed = state
            .progress
            .values()
            .filter(|p| p.status == Status::Failed)
            .count();
        if state.progress_loaded {
            spans.push(Span::styled(format!(" • {} done", done), muted));
            if failed > 0 {
                spans.push(Span::styled(
                    format!(" • {} failed", failed),
                    Style::default().fg(Color::Red),
                ));
            }
        }
    }
    if state.refreshing {
        spans.push(Span::styled(
            format!("  {} refreshing", spinner(state.spinner_frame)),
            Style::default().fg(COLOR_ACCENT),
        ));
    }
    Line::from(spans)
}

fn banner_lines(warnings: &[String]) -> Vec<Line<'static>> {
    let style = Style::default().fg(COLOR_WARNING);
    let mut lines: Vec<Line> = warnings
        .iter()
        .take(MAX_BANNER_LINES)
        .map(|w| Line::from(Span::styled(format!("⚠ {}", w), style)))
        .collect();
    let hidden = warnings.len().saturating_sub(MAX_BANNER_LINES);
    if hidden > 0 {
        if let Some(last) = lines.last_mut() {
            last.push_span(Span::styled(format!("  (+{} more)", hidden), style));
        }
    }
    lines
}

fn render_canvas(frame: &mut Frame, state: &RenderState, area: Rect) {
    let (Some(graph), Some(layout)) = (&state.graph, &state.layout) else {
        let msg = Line::from(Span::styled(
            format!("{} loading dependency graph", spinner(state.spinner_frame)),
            Style::default().fg(COLOR_TEXT_DIMMED),
        ));
        frame.render_widget(Paragraph::new(msg), area);
        return;
    };
    if graph.is_empty() {
        let msg = Line::from(Span::styled(
            "No resources to show.",
            Style::default().fg(COLOR_TEXT_DIMMED),
        ));
        frame.render_widget(Paragraph::new(msg), area);
        return;
    }

    let scene = Scene {
        graph,
        layout,
        progress: &state.progress,
        progress_loaded: state.progress_loaded,
        selected: state.selected.as_deref(),
        spinner_frame: state.spinner_frame,
    };
    let lines = scene.render(area.width as usize, area.height as usize);
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_statusbar(frame: &mut Frame, state: &RenderState, area: Rect) {
    frame.render_widget(Paragraph::new(render_keymap_line(state)), area);
}

/// Render keybindings legend for the bottom line.
/// When show_keymap is false: Shows just "?" (grayed out)
/// When show_keymap is true: Shows "? │ <full keymap legend>" with bright "?"
fn render_keymap_line(state: &RenderState) -> Line<'static> {
    let ctx = KeymapContext::from_render_state(state);
    let groups = keybindings_for_context(ctx);

    let key_style = Style::default().fg(COLOR_TEXT_DIMMED);
    let desc_style = Style::default().fg(COLOR_TEXT_MUTED);
    let sep_style = Style::default().fg(COLOR_TEXT_MUTED);

    let help_style = if state.show_keymap {
        Style::default()
    } else {
        Style::default().fg(COLOR_TEXT_MUTED)
    };
    let mut spans: Vec<Span> = vec![Span::styled("?", help_style)];

    if state.show_keymap {
        for group in groups.iter().filter(|g| !g.0.is_empty()) {
            spans.push(Span::styled(" │ ", sep_style));
            for (key_idx, keybinding) in group.0.iter().enumerate() {
                if key_idx > 0 {
                    spans.push(Span::styled(" • ", sep_style));
                }
                spans.push(Span::styled(keybinding.0, key_style));
                spans.push(Span::styled(format!(" {}", keybinding.1), desc_style));
            }
        }
    }

    Line::from(spans)
}

// -----------------------------------------------------------------------------
// Detail view
// -----------------------------------------------------------------------------

fn render_detail(frame: &mut Frame, state: &RenderState, detail: &DetailState, area: Rect) {
    let [header, tabs, body, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(Paragraph::new(detail_header(detail)), header);

    let titles: Vec<Line> = detail
        .tabs()
        .iter()
        .map(|t| Line::from(t.label()))
        .collect();
    let tab_bar = Tabs::new(titles)
        .select(detail.tab_index())
        .style(Style::default().fg(COLOR_TEXT_MUTED))
        .highlight_style(Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD))
        .divider(Span::styled("│", Style::default().fg(COLOR_TEXT_MUTED)));
    frame.render_widget(tab_bar, tabs);

    let body = body.inner(ratatui::layout::Margin {
        horizontal: 1,
        vertical: 1,
    });
    match detail.tab {
        DetailTab::Progress => render_progress_pane(frame, &detail.progress, state.spinner_frame, body),
        DetailTab::Files => render_files_pane(frame, &detail.files, state.spinner_frame, body),
        DetailTab::Outputs => {
            let lines = match loadable_lines(&detail.outputs, "outputs", state.spinner_frame) {
                Some(lines) => lines,
                None => output_lines(detail.outputs.ready(), body.height as usize),
            };
            frame.render_widget(Paragraph::new(lines), body);
        }
        DetailTab::Logs => render_logs_pane(frame, &detail.logs, state.spinner_frame, body),
        DetailTab::History => render_history_pane(frame, &detail.history, state.spinner_frame, body),
    }

    render_statusbar(frame, state, status);
}

fn detail_header(detail: &DetailState) -> Line<'static> {
    let icon = match detail.kind {
        ResourceKind::Terraform => "◆",
        ResourceKind::Helm => "⎈",
    };
    let mut spans = vec![
        Span::styled(format!("{} ", icon), Style::default().fg(COLOR_ACCENT)),
        Span::styled(
            detail.node.label().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {} • {}", detail.kind.label(), detail.node.id),
            Style::default().fg(COLOR_TEXT_MUTED),
        ),
    ];
    if let Some(progress) = detail.progress.progress {
        spans.push(Span::styled(
            format!("  {} {}%", progress.status.label(), progress.percent),
            Style::default().fg(status_color(progress.status)),
        ));
    }
    Line::from(spans)
}

/// Placeholder lines for a pane that is not ready yet.
fn loadable_lines<T>(loadable: &Loadable<T>, what: &str, frame_idx: usize) -> Option<Vec<Line<'static>>> {
    match loadable {
        Loadable::Ready(_) => None,
        Loadable::Idle | Loadable::Loading => Some(vec![Line::from(Span::styled(
            format!("{} loading {}", spinner(frame_idx), what),
            Style::default().fg(COLOR_TEXT_DIMMED),
        ))]),
        Loadable::Failed(err) => Some(vec![Line::from(Span::styled(
            format!("Failed to load {}: {}", what, err),
            Style::default().fg(Color::Red),
        ))]),
    }
}

fn render_progress_pane(frame: &mut Frame, pane: &ProgressPane, frame_idx: usize, area: Rect) {
    let [gauge_area, _, rest] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(area);

    if let Some(progress) = pane.progress {
        frame.render_widget(progress_gauge(progress), gauge_area);
    }

    let lines = match &pane.record {
        Loadable::Ready(Some(record)) => record_lines(record),
        Loadable::Ready(None) => vec![Line::from(Span::styled(
            "No infrastructure operation recorded for this resource.",
            Style::default().fg(COLOR_TEXT_DIMMED),
        ))],
        other => loadable_lines(other, "progress", frame_idx).unwrap_or_default(),
    };
    let paragraph = Paragraph::new(lines).scroll((clamp_u16(pane.scroll), 0));
    frame.render_widget(paragraph, rest);
}

fn progress_gauge(progress: Progress) -> Gauge<'static> {
    let label = if progress.total > 0 {
        format!("{}% ({}/{})", progress.percent, progress.completed, progress.total)
    } else {
        format!("{}%", progress.percent)
    };
    Gauge::default()
        .gauge_style(
            Style::default()
                .fg(status_color(progress.status))
                .bg(Color::DarkGray),
        )
        .percent(u16::from(progress.percent))
        .label(label)
}

fn record_lines(record: &InfraProgressRecord) -> Vec<Line<'static>> {
    let key = Style::default().fg(COLOR_TEXT_MUTED);
    let field = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<12}", name), key),
            Span::raw(value),
        ])
    };
    let status = infra::parse_status(&record.status)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| record.status.clone());

    let mut lines = vec![
        field("status", status),
        field("operation", record.operation_id.clone().unwrap_or_else(|| "-".into())),
        field("started", format_time(record.started_at)),
        field("finished", format_time(record.finished_at)),
    ];
    if let Some(planned) = record.planned_resources {
        lines.push(field("planned", planned.to_string()));
    }
    if let Some(declared) = record.declared_resources {
        lines.push(field("declared", declared.to_string()));
    }
    if !record.resources.is_empty() {
        lines.push(Line::default());
        for resource in &record.resources {
            let (mark, color) = managed_marker(resource.state);
            lines.push(Line::from(vec![
                Span::styled(format!("{} ", mark), Style::default().fg(color)),
                Span::raw(resource.address.clone()),
            ]));
        }
    }
    lines
}

fn managed_marker(state: ManagedState) -> (char, Color) {
    match state {
        ManagedState::Ready => ('✓', Color::Green),
        ManagedState::Failed => ('✗', Color::Red),
        ManagedState::Creating | ManagedState::Updating | ManagedState::Deleting => ('◐', COLOR_ACCENT),
        ManagedState::Pending | ManagedState::Unknown => ('·', COLOR_TEXT_MUTED),
    }
}

fn render_files_pane(frame: &mut Frame, pane: &FilesPane, frame_idx: usize, area: Rect) {
    if let Some(content) = &pane.content {
        render_file_content(frame, content, frame_idx, area);
        return;
    }
    let lines = match loadable_lines(&pane.tree, "files", frame_idx) {
        Some(lines) => lines,
        None => file_lines(pane.tree.ready(), area.height as usize),
    };
    frame.render_widget(Paragraph::new(lines), area);
}

fn file_lines(tree: Option<&TreeView<FileNode>>, height: usize) -> Vec<Line<'static>> {
    let Some(tree) = tree.filter(|t| !t.is_empty()) else {
        return vec![Line::from(Span::styled(
            "No files.",
            Style::default().fg(COLOR_TEXT_DIMMED),
        ))];
    };
    let rows = tree.visible();
    let start = window_start(tree.cursor, rows.len(), height);
    rows.iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(idx, row)| {
            let indent = "  ".repeat(row.depth);
            let (marker, suffix) = if row.node.data.is_dir {
                (if row.node.expanded { "▾ " } else { "▸ " }, String::new())
            } else {
                ("  ", format!("  {}", format_size(row.node.data.size)))
            };
            let style = if idx == tree.cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if row.node.data.is_dir {
                Style::default().fg(COLOR_ACCENT)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{}{}{}", indent, marker, row.node.label), style),
                Span::styled(suffix, Style::default().fg(COLOR_TEXT_MUTED)),
            ])
        })
        .collect()
}

fn render_file_content(frame: &mut Frame, content: &FileContent, frame_idx: usize, area: Rect) {
    let [title, body] =
        Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            content.path.clone(),
            Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
        ))),
        title,
    );
    let text = match &content.body {
        Loadable::Ready(text) => Text::raw(text.clone()),
        other => Text::from(loadable_lines(other, "file", frame_idx).unwrap_or_default()),
    };
    frame.render_widget(
        Paragraph::new(text).scroll((clamp_u16(content.scroll), 0)),
        body,
    );
}

fn output_lines(tree: Option<&TreeView<OutputNode>>, height: usize) -> Vec<Line<'static>> {
    let Some(tree) = tree.filter(|t| !t.is_empty()) else {
        return vec![Line::from(Span::styled(
            "No outputs.",
            Style::default().fg(COLOR_TEXT_DIMMED),
        ))];
    };
    let rows = tree.visible();
    let start = window_start(tree.cursor, rows.len(), height);
    rows.iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(idx, row)| {
            let indent = "  ".repeat(row.depth);
            let marker = if row.node.is_branch() {
                if row.node.expanded {
                    "▾ "
                } else {
                    "▸ "
                }
            } else {
                "  "
            };
            let selected = idx == tree.cursor;
            let label_style = if selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default().fg(COLOR_TEXT_DIMMED)
            };
            let mut spans = vec![Span::styled(
                format!("{}{}{}", indent, marker, row.node.label),
                label_style,
            )];
            if let Some(value) = row.node.data.display_value() {
                let value_style = if row.node.data.sensitive && !row.node.data.revealed {
                    Style::default().fg(COLOR_WARNING)
                } else {
                    Style::default()
                };
                spans.push(Span::styled(" = ", Style::default().fg(COLOR_TEXT_MUTED)));
                spans.push(Span::styled(value.to_string(), value_style));
            }
            if row.node.data.sensitive {
                spans.push(Span::styled(" (sensitive)", Style::default().fg(COLOR_TEXT_MUTED)));
            }
            Line::from(spans)
        })
        .collect()
}

fn render_logs_pane(frame: &mut Frame, pane: &LogPane, frame_idx: usize, area: Rect) {
    let [status_area, body] =
        Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);
    frame.render_widget(Paragraph::new(log_status_line(pane, frame_idx)), status_area);

    let height = body.height as usize;
    let start = pane.first_visible(height);
    let visible: Vec<&str> = pane
        .lines
        .iter()
        .skip(start)
        .take(height)
        .map(String::as_str)
        .collect();
    let joined = visible.join("\n");
    let text: Text = joined.into_text().unwrap_or_else(|_| Text::raw(joined.clone()));
    frame.render_widget(Paragraph::new(text), body);
}

fn log_status_line(pane: &LogPane, frame_idx: usize) -> Line<'static> {
    let muted = Style::default().fg(COLOR_TEXT_MUTED);
    let (text, style) = match &pane.status {
        LogStatus::Connecting => (format!("{} connecting", spinner(frame_idx)), muted),
        LogStatus::Waiting => ("waiting for log output".to_string(), muted),
        LogStatus::Streaming => (
            format!(
                "streaming{}",
                pane.operation_id
                    .as_deref()
                    .map(|op| format!(" • operation {}", op))
                    .unwrap_or_default()
            ),
            Style::default().fg(Color::Green),
        ),
        LogStatus::Retrying { attempt, max, error } => (
            format!("retrying {}/{}: {}", attempt, max, error),
            Style::default().fg(COLOR_WARNING),
        ),
        LogStatus::Failed(error) => (
            format!("log stream stopped: {}", error),
            Style::default().fg(Color::Red),
        ),
    };
    let follow = if pane.follow { "follow on" } else { "follow off" };
    Line::from(vec![
        Span::styled(text, style),
        Span::styled(format!("  • {} lines • {}", pane.lines.len(), follow), muted),
    ])
}

fn render_history_pane(
    frame: &mut Frame,
    history: &Loadable<HistoryView>,
    frame_idx: usize,
    area: Rect,
) {
    let lines = match loadable_lines(history, "history", frame_idx) {
        Some(lines) => lines,
        None => history_lines(history.ready(), area.height as usize),
    };
    frame.render_widget(Paragraph::new(lines), area);

    if let Some(modal) = history.ready().and_then(|h| h.modal.as_ref()) {
        let popup = centered(area, 70, 50);
        frame.render_widget(Clear, popup);
        let block = Block::bordered()
            .title(Span::styled(
                format!(" {} ", modal.title),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(" Esc close ").right_aligned())
            .border_style(Style::default().fg(Color::Red));
        frame.render_widget(
            Paragraph::new(modal.message.clone())
                .wrap(Wrap { trim: false })
                .block(block),
            popup,
        );
    }
}

fn history_lines(history: Option<&HistoryView>, height: usize) -> Vec<Line<'static>> {
    let Some(history) = history.filter(|h| !h.is_empty()) else {
        return vec![Line::from(Span::styled(
            "No operations recorded.",
            Style::default().fg(COLOR_TEXT_DIMMED),
        ))];
    };
    let rows = history.rows();
    let start = window_start(history.cursor, rows.len(), height);
    rows.iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(idx, row)| {
            let mut line = history_row_line(history, *row);
            if idx == history.cursor {
                line = line.patch_style(Style::default().add_modifier(Modifier::REVERSED));
            }
            line
        })
        .collect()
}

fn history_row_line(history: &HistoryView, row: HistoryRow) -> Line<'static> {
    let muted = Style::default().fg(COLOR_TEXT_MUTED);
    match row {
        HistoryRow::Day(d) => Line::from(Span::styled(
            history.days[d].date.format("%Y-%m-%d").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        HistoryRow::Operation(d, o) => {
            let op = &history.days[d].operations[o];
            let marker = if op.expanded { "▾" } else { "▸" };
            let time = op
                .started_at()
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default();
            let mut spans = vec![
                Span::styled(format!("  {} {} ", marker, time), muted),
                Span::raw(format!("{} ", op.action)),
                Span::styled(format!("{} ", truncate(&op.operation_id, 16)), muted),
                Span::styled(op.status.label(), Style::default().fg(status_color(op.status))),
            ];
            if op.masked_failure {
                spans.push(Span::styled(
                    " ⚠ earlier step failed",
                    Style::default().fg(COLOR_WARNING),
                ));
            }
            Line::from(spans)
        }
        HistoryRow::Entry(d, o, e) => {
            let entry = &history.days[d].operations[o].entries[e];
            let mut spans = vec![
                Span::styled(
                    format!("      {} ", entry.timestamp.format("%H:%M:%S")),
                    muted,
                ),
                Span::styled(
                    entry.status.label(),
                    Style::default().fg(status_color(entry.status)),
                ),
            ];
            if let Some(error) = &entry.error {
                let first = error.lines().next().unwrap_or_default();
                spans.push(Span::styled(
                    format!("  {}", truncate(first, 60)),
                    Style::default().fg(Color::Red),
                ));
            }
            Line::from(spans)
        }
    }
}

/// Render notification message on the bottom line of the screen.
///
/// - Error: Red text with "Error:" prefix and bold styling
/// - Info: Green text without prefix
fn render_notification(frame: &mut Frame, notification: &Notification, area: Rect) {
    let notification_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, notification_area);

    let line = match notification.level {
        NotificationLevel::Error => Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                notification.message.clone(),
                Style::default().fg(Color::Red),
            ),
        ]),
        NotificationLevel::Info => Line::from(Span::styled(
            notification.message.clone(),
            Style::default().fg(Color::Green),
        )),
    };

    frame.render_widget(Paragraph::new(line), notification_area);
}

// Helper functions

fn spinner(frame_idx: usize) -> char {
    SPINNER_FRAMES[frame_idx % SPINNER_FRAMES.len()]
}

/// First row of a `height`-row window that keeps `cursor` centred.
fn window_start(cursor: usize, len: usize, height: usize) -> usize {
    let start = cursor.saturating_sub(height / 2);
    let end = (start + height).min(len);
    end.saturating_sub(height)
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, mid, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(mid);
    center
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}
