//! Operation-history timeline: entries grouped by day, then by operation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::progress::Status;
use crate::source::OperationEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct OperationGroup {
    pub operation_id: String,
    pub action: String,
    /// Oldest first.
    pub entries: Vec<OperationEntry>,
    /// Status of the most recent entry.
    pub status: Status,
    /// An earlier entry failed although the latest did not.
    pub masked_failure: bool,
    pub expanded: bool,
}

impl OperationGroup {
    fn new(mut entries: Vec<OperationEntry>) -> Option<Self> {
        entries.sort_by_key(|e| e.timestamp);
        let last = entries.last()?;
        let status = last.status;
        let masked_failure = status != Status::Failed
            && entries.iter().any(|e| e.status == Status::Failed);
        Some(Self {
            operation_id: last.operation_id.clone(),
            action: entries[0].action.clone(),
            status,
            masked_failure,
            entries,
            expanded: false,
        })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.entries.first().map(|e| e.timestamp)
    }

    /// First error message of the group, for the collapsed row.
    pub fn error(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|e| e.error.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    /// Newest first.
    pub operations: Vec<OperationGroup>,
}

/// What a history row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRow {
    Day(usize),
    Operation(usize, usize),
    Entry(usize, usize, usize),
}

/// Error text shown in the modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorModal {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryView {
    pub days: Vec<DayGroup>,
    pub cursor: usize,
    pub modal: Option<ErrorModal>,
}

impl HistoryView {
    pub fn from_entries(entries: Vec<OperationEntry>) -> Self {
        let mut by_operation: BTreeMap<String, Vec<OperationEntry>> = BTreeMap::new();
        for entry in entries {
            by_operation.entry(entry.operation_id.clone()).or_default().push(entry);
        }

        let mut by_day: BTreeMap<NaiveDate, Vec<OperationGroup>> = BTreeMap::new();
        for group in by_operation.into_values().filter_map(OperationGroup::new) {
            if let Some(started) = group.started_at() {
                by_day.entry(started.date_naive()).or_default().push(group);
            }
        }

        let days = by_day
            .into_iter()
            .rev()
            .map(|(date, mut operations)| {
                operations.sort_by(|a, b| {
                    b.started_at()
                        .cmp(&a.started_at())
                        .then_with(|| a.operation_id.cmp(&b.operation_id))
                });
                DayGroup { date, operations }
            })
            .collect();

        Self {
            days,
            cursor: 0,
            modal: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn rows(&self) -> Vec<HistoryRow> {
        let mut rows = Vec::new();
        for (d, day) in self.days.iter().enumerate() {
            rows.push(HistoryRow::Day(d));
            for (o, op) in day.operations.iter().enumerate() {
                rows.push(HistoryRow::Operation(d, o));
                if op.expanded {
                    rows.extend((0..op.entries.len()).map(|e| HistoryRow::Entry(d, o, e)));
                }
            }
        }
        rows
    }

    pub fn selected(&self) -> Option<HistoryRow> {
        self.rows().get(self.cursor).copied()
    }

    pub fn move_by(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn operation(&self, day: usize, op: usize) -> Option<&OperationGroup> {
        self.days.get(day)?.operations.get(op)
    }

    pub fn toggle_operation(&mut self, day: usize, op: usize) {
        if let Some(group) = self.days.get_mut(day).and_then(|d| d.operations.get_mut(op)) {
            group.expanded = !group.expanded;
        }
    }

    /// Open the error modal for a failed entry. Returns false when the
    /// entry did not fail or carries no message.
    pub fn open_error(&mut self, day: usize, op: usize, entry: usize) -> bool {
        let Some(group) = self.operation(day, op) else {
            return false;
        };
        let Some(e) = group.entries.get(entry) else {
            return false;
        };
        if e.status != Status::Failed {
            return false;
        }
        let message = e.error.clone().unwrap_or_else(|| "no error detail recorded".to_string());
        self.modal = Some(ErrorModal {
            title: format!("{} {} failed at {}", e.action, e.operation_id, e.timestamp.format("%H:%M:%S")),
            message,
        });
        true
    }

    pub fn close_modal(&mut self) -> bool {
        self.modal.take().is_some()
    }
}
