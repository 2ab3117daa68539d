//! Per-resource drill-down state.
//!
//! A detail view owns its tabs, their lazily loaded panes and the nested
//! sub-views (file content, error modal). It is tagged with a generation so
//! results from background tasks started for an earlier view are ignored.

use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent};
use serde_json::Value;
use tracing::debug;

use crate::actors::{LogEvent, LogUpdate};
use crate::graph::{Node, ResourceKind};
use crate::progress::{infra, InfraProgressRecord, Progress};
use crate::source::{FileEntry, OperationEntry};

use super::command::Command;
use super::history::{HistoryRow, HistoryView};
use super::tree::{file_tree, output_tree, FileNode, OutputNode, TreeView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailTab {
    Progress,
    Files,
    Outputs,
    Logs,
    History,
}

const TERRAFORM_TABS: &[DetailTab] = &[
    DetailTab::Progress,
    DetailTab::Files,
    DetailTab::Outputs,
    DetailTab::Logs,
    DetailTab::History,
];
const HELM_TABS: &[DetailTab] = &[
    DetailTab::Progress,
    DetailTab::Files,
    DetailTab::Logs,
    DetailTab::History,
];

impl DetailTab {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Progress => "Progress",
            Self::Files => "Files",
            Self::Outputs => "Outputs",
            Self::Logs => "Logs",
            Self::History => "History",
        }
    }

    pub fn tabs_for(kind: ResourceKind) -> &'static [DetailTab] {
        match kind {
            ResourceKind::Terraform => TERRAFORM_TABS,
            ResourceKind::Helm => HELM_TABS,
        }
    }
}

/// Lazily fetched pane content.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    fn from_result<E: ToString>(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    Connecting,
    /// Connected, the resource has not logged anything yet.
    Waiting,
    Streaming,
    Retrying { attempt: u32, max: u32, error: String },
    Failed(String),
}

/// Tail of the resource's current operation log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPane {
    pub lines: VecDeque<String>,
    pub capacity: usize,
    pub operation_id: Option<String>,
    pub follow: bool,
    /// First visible line while not following.
    pub scroll: usize,
    pub status: LogStatus,
    pub started: bool,
}

impl LogPane {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            operation_id: None,
            follow: true,
            scroll: 0,
            status: LogStatus::Connecting,
            started: false,
        }
    }

    pub fn apply(&mut self, update: LogUpdate) {
        match update {
            LogUpdate::Append(lines) => self.push_lines(lines),
            LogUpdate::Amend { last, lines } => {
                match self.lines.back_mut() {
                    Some(line) => *line = last,
                    None => self.push_lines(vec![last]),
                }
                self.push_lines(lines);
            }
            LogUpdate::Replace {
                operation_id,
                lines,
            } => {
                self.lines.clear();
                self.scroll = 0;
                self.operation_id = Some(operation_id);
                self.push_lines(lines);
            }
        }
        self.status = LogStatus::Streaming;
    }

    fn push_lines(&mut self, lines: Vec<String>) {
        for line in lines {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
                self.scroll = self.scroll.saturating_sub(1);
            }
            self.lines.push_back(line);
        }
    }

    pub fn on_event(&mut self, event: LogEvent) {
        match event {
            LogEvent::Connected => {
                if !matches!(self.status, LogStatus::Streaming) {
                    self.status = if self.operation_id.is_some() {
                        LogStatus::Streaming
                    } else {
                        LogStatus::Waiting
                    };
                }
            }
            LogEvent::NoLog => self.status = LogStatus::Waiting,
            LogEvent::Update(update) => self.apply(update),
            LogEvent::Retrying {
                attempt,
                max,
                error,
            } => self.status = LogStatus::Retrying { attempt, max, error },
            LogEvent::Failed(error) => self.status = LogStatus::Failed(error),
        }
    }

    /// Index of the first line shown in a window of `height` lines.
    pub fn first_visible(&self, height: usize) -> usize {
        let max_start = self.lines.len().saturating_sub(height);
        if self.follow {
            max_start
        } else {
            self.scroll.min(max_start)
        }
    }

    /// Scrolling up leaves follow mode.
    pub fn scroll_by(&mut self, delta: isize, height: usize) {
        let start = self.first_visible(height);
        let max_start = self.lines.len().saturating_sub(height);
        let target = (start as isize + delta).clamp(0, max_start as isize) as usize;
        if delta < 0 {
            self.follow = false;
        }
        self.scroll = target;
    }

    pub fn toggle_follow(&mut self, height: usize) {
        if self.follow {
            self.scroll = self.first_visible(height);
        }
        self.follow = !self.follow;
    }

    pub fn jump_to_tail(&mut self) {
        self.follow = true;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    pub path: String,
    pub body: Loadable<String>,
    pub scroll: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilesPane {
    pub tree: Loadable<TreeView<FileNode>>,
    /// Open file, shown instead of the tree.
    pub content: Option<FileContent>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressPane {
    pub record: Loadable<Option<InfraProgressRecord>>,
    /// Latest known progress, seeded from the dashboard.
    pub progress: Option<Progress>,
    pub scroll: usize,
}

/// What Enter acts on, resolved from the active tab's cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailSelection {
    Directory(Vec<usize>),
    File(String),
    OutputBranch(Vec<usize>),
    /// A masked or revealed sensitive value.
    Secret(Vec<usize>),
    HistoryOperation { day: usize, op: usize },
    HistoryEntry { day: usize, op: usize, entry: usize },
}

/// Result of a key press inside a detail view.
#[derive(Debug, PartialEq)]
pub enum DetailAction {
    Stay(Vec<Command>),
    /// Leave the view; the caller tears down its background work.
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailState {
    pub generation: u64,
    pub node: Node,
    pub kind: ResourceKind,
    pub tab: DetailTab,
    pub progress: ProgressPane,
    pub files: FilesPane,
    pub outputs: Loadable<TreeView<OutputNode>>,
    pub logs: LogPane,
    pub history: Loadable<HistoryView>,
    /// Visible rows in the pane body, kept in sync with the terminal.
    pub page: usize,
}

impl DetailState {
    pub fn new(
        generation: u64,
        node: Node,
        kind: ResourceKind,
        progress: Option<Progress>,
        log_capacity: usize,
    ) -> Self {
        Self {
            generation,
            node,
            kind,
            tab: DetailTab::Progress,
            progress: ProgressPane {
                progress,
                ..ProgressPane::default()
            },
            files: FilesPane::default(),
            outputs: Loadable::Idle,
            logs: LogPane::new(log_capacity),
            history: Loadable::Idle,
            page: 10,
        }
    }

    pub fn tabs(&self) -> &'static [DetailTab] {
        DetailTab::tabs_for(self.kind)
    }

    pub fn tab_index(&self) -> usize {
        self.tabs().iter().position(|t| *t == self.tab).unwrap_or(0)
    }

    /// Commands to run when the view first opens.
    pub fn open(&mut self) -> Vec<Command> {
        self.activate_tab()
    }

    fn cycle_tab(&mut self, forward: bool) -> Vec<Command> {
        let tabs = self.tabs();
        let len = tabs.len();
        let idx = self.tab_index();
        let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
        self.tab = tabs[next];
        self.activate_tab()
    }

    /// Start loading the active tab's content if it was never requested.
    fn activate_tab(&mut self) -> Vec<Command> {
        let generation = self.generation;
        let resource_id = self.node.id.clone();
        match self.tab {
            DetailTab::Progress if self.progress.record.is_idle() => {
                self.progress.record = Loadable::Loading;
                vec![Command::FetchDetailProgress {
                    generation,
                    idents: self.node.idents(),
                }]
            }
            DetailTab::Files if self.files.tree.is_idle() => {
                self.files.tree = Loadable::Loading;
                vec![Command::LoadFileTree {
                    generation,
                    resource_id,
                }]
            }
            DetailTab::Outputs if self.outputs.is_idle() => {
                self.outputs = Loadable::Loading;
                vec![Command::LoadOutputs {
                    generation,
                    resource_id,
                }]
            }
            DetailTab::History if self.history.is_idle() => {
                self.history = Loadable::Loading;
                vec![Command::LoadHistory {
                    generation,
                    resource_id,
                }]
            }
            DetailTab::Logs if !self.logs.started => {
                self.logs.started = true;
                vec![Command::StartLogStream {
                    generation,
                    resource_id,
                }]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> DetailAction {
        match key.code {
            KeyCode::Esc => {
                if self.pop_nested() {
                    DetailAction::Stay(Vec::new())
                } else {
                    DetailAction::Close
                }
            }
            KeyCode::Tab => DetailAction::Stay(self.cycle_tab(true)),
            KeyCode::BackTab => DetailAction::Stay(self.cycle_tab(false)),
            KeyCode::Up | KeyCode::Char('k') => self.stay(|d| d.move_by(-1)),
            KeyCode::Down | KeyCode::Char('j') => self.stay(|d| d.move_by(1)),
            KeyCode::PageUp => self.stay(|d| d.move_by(-(d.page as isize))),
            KeyCode::PageDown => self.stay(|d| d.move_by(d.page as isize)),
            KeyCode::Char('f') if self.tab == DetailTab::Logs => {
                let page = self.page;
                self.stay(|d| d.logs.toggle_follow(page))
            }
            KeyCode::Char('G') | KeyCode::End if self.tab == DetailTab::Logs => {
                self.stay(|d| d.logs.jump_to_tail())
            }
            KeyCode::Enter => match self.selection() {
                Some(selection) => DetailAction::Stay(self.activate(selection)),
                None => DetailAction::Stay(Vec::new()),
            },
            _ => DetailAction::Stay(Vec::new()),
        }
    }

    fn stay(&mut self, f: impl FnOnce(&mut Self)) -> DetailAction {
        f(self);
        DetailAction::Stay(Vec::new())
    }

    /// Close the innermost nested sub-view, if any.
    fn pop_nested(&mut self) -> bool {
        match self.tab {
            DetailTab::Files => self.files.content.take().is_some(),
            DetailTab::History => self
                .history
                .ready_mut()
                .is_some_and(HistoryView::close_modal),
            _ => false,
        }
    }

    fn move_by(&mut self, delta: isize) {
        let page = self.page;
        let shift = |value: usize| (value as isize + delta).max(0) as usize;
        match self.tab {
            DetailTab::Progress => self.progress.scroll = shift(self.progress.scroll),
            DetailTab::Files => match &mut self.files.content {
                Some(content) => content.scroll = shift(content.scroll),
                None => {
                    if let Some(tree) = self.files.tree.ready_mut() {
                        tree.move_by(delta);
                    }
                }
            },
            DetailTab::Outputs => {
                if let Some(tree) = self.outputs.ready_mut() {
                    tree.move_by(delta);
                }
            }
            DetailTab::Logs => self.logs.scroll_by(delta, page),
            DetailTab::History => {
                if let Some(history) = self.history.ready_mut() {
                    if history.modal.is_none() {
                        history.move_by(delta);
                    }
                }
            }
        }
    }

    pub fn selection(&self) -> Option<DetailSelection> {
        match self.tab {
            DetailTab::Files if self.files.content.is_none() => {
                let tree = self.files.tree.ready()?;
                let path = tree.selected_path()?;
                let node = tree.get(&path)?;
                Some(if node.data.is_dir {
                    DetailSelection::Directory(path)
                } else {
                    DetailSelection::File(node.data.path.clone())
                })
            }
            DetailTab::Outputs => {
                let tree = self.outputs.ready()?;
                let path = tree.selected_path()?;
                let node = tree.get(&path)?;
                if node.is_branch() {
                    Some(DetailSelection::OutputBranch(path))
                } else if node.data.sensitive {
                    Some(DetailSelection::Secret(path))
                } else {
                    None
                }
            }
            DetailTab::History => {
                let history = self.history.ready()?;
                if history.modal.is_some() {
                    return None;
                }
                match history.selected()? {
                    HistoryRow::Day(_) => None,
                    HistoryRow::Operation(day, op) => Some(DetailSelection::HistoryOperation { day, op }),
                    HistoryRow::Entry(day, op, entry) => {
                        Some(DetailSelection::HistoryEntry { day, op, entry })
                    }
                }
            }
            _ => None,
        }
    }

    pub fn activate(&mut self, selection: DetailSelection) -> Vec<Command> {
        match selection {
            DetailSelection::Directory(path) => {
                if let Some(tree) = self.files.tree.ready_mut() {
                    tree.toggle(&path);
                }
                Vec::new()
            }
            DetailSelection::File(path) => {
                debug!(resource = %self.node.id, path = %path, "opening file");
                self.files.content = Some(FileContent {
                    path: path.clone(),
                    body: Loadable::Loading,
                    scroll: 0,
                });
                vec![Command::ReadFile {
                    generation: self.generation,
                    resource_id: self.node.id.clone(),
                    path,
                }]
            }
            DetailSelection::OutputBranch(path) => {
                if let Some(tree) = self.outputs.ready_mut() {
                    tree.toggle(&path);
                }
                Vec::new()
            }
            DetailSelection::Secret(path) => {
                if let Some(node) = self.outputs.ready_mut().and_then(|t| t.get_mut(&path)) {
                    node.data.revealed = !node.data.revealed;
                }
                Vec::new()
            }
            DetailSelection::HistoryOperation { day, op } => {
                if let Some(history) = self.history.ready_mut() {
                    history.toggle_operation(day, op);
                }
                Vec::new()
            }
            DetailSelection::HistoryEntry { day, op, entry } => {
                if let Some(history) = self.history.ready_mut() {
                    history.open_error(day, op, entry);
                }
                Vec::new()
            }
        }
    }

    /// Apply a progress-record fetch. Returns whether to poll again.
    pub fn on_progress(
        &mut self,
        result: std::result::Result<Option<InfraProgressRecord>, String>,
    ) -> bool {
        match result {
            Ok(record) => {
                if let Some(record) = &record {
                    self.progress.progress = Some(infra::derive(record));
                }
                self.progress.record = Loadable::Ready(record);
                self.progress.progress.is_some_and(|p| p.is_non_terminal())
            }
            Err(e) => {
                // Keep whatever was shown before.
                if !matches!(self.progress.record, Loadable::Ready(_)) {
                    self.progress.record = Loadable::Failed(e);
                }
                true
            }
        }
    }

    pub fn on_file_tree(&mut self, result: std::result::Result<Vec<FileEntry>, String>) {
        self.files.tree = Loadable::from_result(result.map(|entries| file_tree(&entries)));
    }

    pub fn on_file_content(&mut self, path: &str, result: std::result::Result<String, String>) {
        if let Some(content) = self.files.content.as_mut().filter(|c| c.path == path) {
            content.body = Loadable::from_result(result);
        }
    }

    pub fn on_outputs(&mut self, result: std::result::Result<Value, String>) {
        self.outputs = Loadable::from_result(result.map(|value| output_tree(&value)));
    }

    pub fn on_history(&mut self, result: std::result::Result<Vec<OperationEntry>, String>) {
        self.history = Loadable::from_result(result.map(HistoryView::from_entries));
    }

    /// Something in the view is waiting on a fetch.
    pub fn is_loading(&self) -> bool {
        self.progress.record.is_loading()
            || self.files.tree.is_loading()
            || self
                .files
                .content
                .as_ref()
                .is_some_and(|c| c.body.is_loading())
            || self.outputs.is_loading()
            || self.history.is_loading()
            || (self.logs.started && self.logs.status == LogStatus::Connecting)
    }
}
