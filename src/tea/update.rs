//! Pure update function for the TEA (The Elm Architecture) pattern.
//!
//! The update function takes a model and a message, mutates the model,
//! and returns a list of commands to execute.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error, info, trace, warn};

use crate::canvas::SPINNER_FRAMES;
use crate::graph::{GridPos, LayoutEngine};

use super::command::Command;
use super::detail::{DetailAction, DetailState};
use super::message::Message;
use super::model::{GraphStatus, Model, Notification, NotificationLevel, View};

/// Helper to set an info notification and mark model as dirty.
fn set_info(model: &mut Model, message: impl Into<String>) {
    model.notification = Some(Notification {
        level: NotificationLevel::Info,
        message: message.into(),
    });
    model.dirty = true;
}

/// Helper to set an error notification and mark model as dirty.
fn set_error(model: &mut Model, message: impl Into<String>) {
    model.notification = Some(Notification {
        level: NotificationLevel::Error,
        message: message.into(),
    });
    model.dirty = true;
}

/// Pure update function: Model + Message → Commands
///
/// All I/O happens via the returned Commands; results come back as
/// further messages.
pub fn update(model: &mut Model, msg: Message) -> Vec<Command> {
    let mut cmds = Vec::new();

    match msg {
        Message::Key(key) => {
            model.notification = None; // Clear notification on any key press
            model.dirty = true; // Keyboard input always triggers render
            if is_quit(&key) {
                cmds.push(Command::Quit);
                return cmds;
            }
            match model.view {
                View::Dashboard => update_dashboard(model, key, &mut cmds),
                View::Detail(_) => update_detail(model, key, &mut cmds),
            }
        }

        Message::Resize(width, height) => {
            model.viewport = (width, height);
            let page = model.page_size();
            if let Some(detail) = model.detail_mut() {
                detail.page = page;
            }
            model.dirty = true;
        }

        Message::Tick => {
            model.spinner_frame = (model.spinner_frame + 1) % SPINNER_FRAMES.len();
            if model.is_loading() {
                model.dirty = true;
            }
        }

        Message::GraphLoaded(graph) => {
            info!(
                nodes = graph.node_count(),
                cycle = graph.has_cycle,
                soft_errors = graph.errors.len(),
                "Message::GraphLoaded"
            );
            let layout = LayoutEngine::layout(&graph);
            model.cursor = model.cursor.min(layout.node_count().saturating_sub(1));
            model.progress.remerge(&graph);
            model.graph = Some(Arc::new(graph));
            model.layout = Some(Arc::new(layout));
            model.graph_status = GraphStatus::Ready;
            model.dirty = true;
            start_refresh(model, &mut cmds);
        }

        Message::GraphFailed(err) => {
            error!(error = %err, "Message::GraphFailed");
            model.graph_status = GraphStatus::Failed(err);
            model.dirty = true;
        }

        Message::ProgressFetched { workflow, infra } => {
            model.refresh.in_flight = false;
            let feed_error = workflow.as_ref().err().or(infra.as_ref().err()).cloned();
            let feed_failed = feed_error.is_some();
            match feed_error {
                Some(e) => set_error(model, format!("Progress feed unavailable ({e}), showing last known")),
                None => {
                    if model
                        .notification
                        .as_ref()
                        .is_some_and(|n| n.level == NotificationLevel::Error)
                    {
                        model.notification = None;
                    }
                }
            }
            if let Some(graph) = model.graph.clone() {
                model.progress.apply(&graph, workflow, infra);
            }
            model.dirty = true;
            schedule_refresh(model, feed_failed, &mut cmds);
        }

        Message::RefreshDue { generation } => {
            if !model.refresh.fire(generation) {
                trace!(generation, "stale refresh timer");
                return cmds;
            }
            match model.view {
                View::Detail(_) => {
                    debug!("refresh due while in detail view, suspending");
                    model.refresh.suspended = true;
                }
                View::Dashboard => start_refresh(model, &mut cmds),
            }
        }

        Message::DetailProgressFetched { generation, result } => {
            let delay = model.config.detail_refresh_interval();
            if let Some(detail) = model.detail_for(generation) {
                if detail.on_progress(result) {
                    cmds.push(Command::ScheduleDetailRefresh { generation, delay });
                }
                model.dirty = true;
            }
        }

        Message::DetailRefreshDue { generation } => {
            if let Some(detail) = model.detail_for(generation) {
                cmds.push(Command::FetchDetailProgress {
                    generation,
                    idents: detail.node.idents(),
                });
            }
        }

        Message::FileTreeLoaded { generation, result } => {
            if let Err(e) = &result {
                warn!(generation, error = %e, "file tree failed");
            }
            if let Some(detail) = model.detail_for(generation) {
                detail.on_file_tree(result);
                model.dirty = true;
            }
        }

        Message::FileContentLoaded {
            generation,
            path,
            result,
        } => {
            if let Some(detail) = model.detail_for(generation) {
                detail.on_file_content(&path, result);
                model.dirty = true;
            }
        }

        Message::OutputsLoaded { generation, result } => {
            if let Some(detail) = model.detail_for(generation) {
                detail.on_outputs(result);
                model.dirty = true;
            }
        }

        Message::HistoryLoaded { generation, result } => {
            if let Some(detail) = model.detail_for(generation) {
                detail.on_history(result);
                model.dirty = true;
            }
        }

        Message::Log { generation, event } => match model.detail_for(generation) {
            Some(detail) => {
                detail.logs.on_event(event);
                model.dirty = true;
            }
            None => trace!(generation, "dropping log event for closed view"),
        },
    }

    cmds
}

fn is_quit(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Kick off a progress fetch unless one is already running.
fn start_refresh(model: &mut Model, cmds: &mut Vec<Command>) {
    if model.refresh.in_flight {
        return;
    }
    model.refresh.in_flight = true;
    model.refresh.suspended = false;
    cmds.push(Command::FetchProgress);
}

/// Arm the next dashboard refresh while anything is still moving.
///
/// A failed feed also earns a retry. In a detail view the timer is not
/// armed; the refresh resumes when the operator returns to the dashboard.
fn schedule_refresh(model: &mut Model, feed_failed: bool, cmds: &mut Vec<Command>) {
    if !feed_failed && !model.progress.any_non_terminal() {
        debug!("all nodes terminal, refresh idle");
        model.refresh.timer = None;
        return;
    }
    match model.view {
        View::Detail(_) => model.refresh.suspended = true,
        View::Dashboard => {
            let generation = model.refresh.arm();
            let delay = model.config.refresh_interval();
            debug!(generation, ?delay, "scheduling refresh");
            cmds.push(Command::ScheduleRefresh { generation, delay });
        }
    }
}

fn update_dashboard(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    match key.code {
        KeyCode::Char('k') | KeyCode::Up => move_within_level(model, -1),
        KeyCode::Char('j') | KeyCode::Down => move_within_level(model, 1),
        KeyCode::Char('h') | KeyCode::Left => move_across_levels(model, -1),
        KeyCode::Char('l') | KeyCode::Right => move_across_levels(model, 1),

        KeyCode::Tab => cycle_sequence(model, true),
        KeyCode::BackTab => cycle_sequence(model, false),

        KeyCode::Enter => open_detail(model, cmds),

        KeyCode::Char('r') => match model.graph_status {
            GraphStatus::Failed(_) => {
                info!("retrying graph load");
                model.graph_status = GraphStatus::Loading;
                cmds.push(Command::LoadGraph);
            }
            GraphStatus::Ready if !model.refresh.in_flight => {
                model.refresh.timer = None;
                start_refresh(model, cmds);
                set_info(model, "Refreshing progress");
            }
            _ => {}
        },

        KeyCode::Char('?') => {
            model.show_keymap = !model.show_keymap;
        }

        KeyCode::Esc => {
            model.show_keymap = false;
        }

        _ => {}
    }
}

fn cursor_pos(model: &Model) -> Option<GridPos> {
    model.layout.as_ref()?.grid_at(model.cursor)
}

fn move_within_level(model: &mut Model, delta: isize) {
    let (Some(layout), Some(pos)) = (model.layout.clone(), cursor_pos(model)) else {
        return;
    };
    let len = layout.levels[pos.column].len();
    let row = (pos.row as isize + delta).clamp(0, len as isize - 1) as usize;
    if let Some(index) = layout.sequence_index(GridPos { row, ..pos }) {
        model.cursor = index;
    }
}

fn move_across_levels(model: &mut Model, delta: isize) {
    let (Some(layout), Some(pos)) = (model.layout.clone(), cursor_pos(model)) else {
        return;
    };
    let column = (pos.column as isize + delta).clamp(0, layout.levels.len() as isize - 1) as usize;
    let row = pos.row.min(layout.levels[column].len().saturating_sub(1));
    if let Some(index) = layout.sequence_index(GridPos { column, row }) {
        model.cursor = index;
    }
}

fn cycle_sequence(model: &mut Model, forward: bool) {
    let count = model.layout.as_ref().map_or(0, |l| l.node_count());
    if count == 0 {
        return;
    }
    model.cursor = if forward {
        (model.cursor + 1) % count
    } else {
        model.cursor.checked_sub(1).unwrap_or(count - 1)
    };
}

fn open_detail(model: &mut Model, cmds: &mut Vec<Command>) {
    let Some(node) = model.selected_node().cloned() else {
        return;
    };
    let Some(kind) = node.kind() else {
        debug!(id = %node.id, type_tag = ?node.type_tag, "no detail view for resource type");
        return;
    };
    let generation = model.next_generation();
    let progress = model.progress.get(&node.id).copied();
    info!(id = %node.id, kind = kind.label(), generation, "opening detail view");

    let mut detail = DetailState::new(
        generation,
        node,
        kind,
        progress,
        model.config.log_buffer_lines,
    );
    detail.page = model.page_size();
    cmds.extend(detail.open());
    model.view = View::Detail(Box::new(detail));
}

fn update_detail(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    let View::Detail(detail) = &mut model.view else {
        return;
    };
    match detail.on_key(key) {
        DetailAction::Stay(detail_cmds) => cmds.extend(detail_cmds),
        DetailAction::Close => close_detail(model, cmds),
    }
}

/// Back to the dashboard: stop the view's stream and resume refreshing.
fn close_detail(model: &mut Model, cmds: &mut Vec<Command>) {
    let View::Detail(detail) = std::mem::take(&mut model.view) else {
        return;
    };
    info!(id = %detail.node.id, generation = detail.generation, "closing detail view");
    if detail.logs.started {
        cmds.push(Command::StopLogStream {
            generation: detail.generation,
        });
    }

    if model.refresh.suspended {
        start_refresh(model, cmds);
    } else if model.refresh.timer.is_none()
        && !model.refresh.in_flight
        && model.progress.any_non_terminal()
    {
        schedule_refresh(model, false, cmds);
    }
}
