//! Progress derived from category-based workflow-step events.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{trace, warn};

use crate::graph::ResourceIdents;

use super::ident::ProgressTable;
use super::model::{Category, EventType, Progress, ResourceWorkflow, Status, WorkflowEvent};

#[derive(Deserialize)]
struct RawWorkflow {
    #[serde(flatten)]
    idents: ResourceIdents,
    #[serde(default)]
    categories: BTreeMap<String, Vec<Value>>,
}

/// Parse one feed entry. Unparseable events are dropped individually;
/// an entry without any identifier is dropped whole.
pub fn parse_entry(value: Value) -> Option<ResourceWorkflow> {
    let raw: RawWorkflow = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "dropping malformed workflow entry");
            return None;
        }
    };
    if raw.idents.is_empty() {
        warn!("dropping workflow entry without identifiers");
        return None;
    }

    let mut categories: BTreeMap<Category, Vec<WorkflowEvent>> = BTreeMap::new();
    for (name, events) in raw.categories {
        let bucket = categories.entry(Category::parse(&name)).or_default();
        for event in events {
            match serde_json::from_value::<WorkflowEvent>(event) {
                Ok(event) => bucket.push(event),
                Err(e) => trace!(category = %name, error = %e, "skipping malformed event"),
            }
        }
    }

    Some(ResourceWorkflow {
        idents: raw.idents,
        categories,
    })
}

/// Highest-priority event type present: Failed > Completed > Started/Debug.
pub fn category_status(events: &[WorkflowEvent]) -> Status {
    let has = |kind: EventType| events.iter().any(|e| e.event_type == kind);
    if has(EventType::Failed) {
        Status::Failed
    } else if has(EventType::Completed) {
        Status::Completed
    } else if events.is_empty() {
        Status::Pending
    } else {
        Status::Running
    }
}

pub fn derive(workflow: &ResourceWorkflow) -> Progress {
    let statuses: Vec<Status> = workflow
        .categories
        .values()
        .filter(|events| !events.is_empty())
        .map(|events| category_status(events))
        .collect();

    let with_events = statuses.len() as u32;
    let completed = statuses.iter().filter(|s| **s == Status::Completed).count() as u32;

    let status = if statuses.contains(&Status::Failed) {
        Status::Failed
    } else if with_events > 0 && completed == with_events {
        Status::Completed
    } else if with_events > 0 {
        Status::Running
    } else {
        Status::Pending
    };

    Progress::from_counts(status, completed, with_events)
}

/// Build the lookup table for one fetch of the workflow feed.
pub fn table(entries: Vec<Value>) -> ProgressTable {
    let mut table = ProgressTable::default();
    for workflow in entries.into_iter().filter_map(parse_entry) {
        table.insert(&workflow.idents, derive(&workflow));
    }
    table
}
