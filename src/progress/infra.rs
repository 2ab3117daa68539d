//! Progress derived from infra-operation records.

use serde_json::Value;
use tracing::warn;

use crate::graph::ResourceIdents;

use super::ident::{normalize, ProgressTable};
use super::model::{InfraProgressRecord, ManagedState, Progress, Status};

/// Label keys that carry a resource identifier when the record itself
/// has none. Compared after normalization.
const ID_LABELS: &[&str] = &["resourceid", "resource"];
const KEY_LABELS: &[&str] = &["resourcekey", "key"];
const NAME_LABELS: &[&str] = &["resourcename", "release", "name"];

/// Parse one record, filling missing identifiers from its labels.
pub fn parse_record(value: Value) -> Option<InfraProgressRecord> {
    let mut record: InfraProgressRecord = match serde_json::from_value(value) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "dropping malformed infra progress record");
            return None;
        }
    };
    fill_from_labels(&mut record);
    if record.idents.is_empty() {
        warn!("dropping infra progress record without identifiers");
        return None;
    }
    Some(record)
}

fn fill_from_labels(record: &mut InfraProgressRecord) {
    let label = |wanted: &[&str]| -> Option<String> {
        record
            .labels
            .iter()
            .find(|(k, v)| wanted.contains(&normalize(k).as_str()) && !v.trim().is_empty())
            .map(|(_, v)| v.clone())
    };
    let id = label(ID_LABELS);
    let key = label(KEY_LABELS);
    let name = label(NAME_LABELS);

    let idents = &mut record.idents;
    if idents.id.is_none() {
        idents.id = id;
    }
    if idents.key.is_none() {
        idents.key = key;
    }
    if idents.name.is_none() {
        idents.name = name;
    }
}

/// Map an upstream status string; `None` for anything unrecognised.
pub fn parse_status(raw: &str) -> Option<Status> {
    match normalize(raw).as_str() {
        "completed" | "complete" | "succeeded" | "success" | "applied" | "deployed" | "done" => {
            Some(Status::Completed)
        }
        "failed" | "failure" | "error" | "errored" => Some(Status::Failed),
        "running" | "inprogress" | "applying" | "planning" | "planned" | "destroying"
        | "installing" | "upgrading" => Some(Status::Running),
        "pending" | "queued" | "waiting" => Some(Status::Pending),
        _ => None,
    }
}

pub fn derive(record: &InfraProgressRecord) -> Progress {
    let ready = record
        .resources
        .iter()
        .filter(|r| r.state == ManagedState::Ready)
        .count() as u32;
    let total = record
        .planned_resources
        .or(record.declared_resources)
        .unwrap_or(record.resources.len() as u32);

    let status = parse_status(&record.status).unwrap_or_else(|| {
        if record.resources.iter().any(|r| r.state == ManagedState::Failed) {
            Status::Failed
        } else if ready > 0 {
            Status::Running
        } else {
            Status::Pending
        }
    });

    Progress::from_counts(status, ready, total)
}

/// Build the lookup table for one fetch of the infra feed.
pub fn table(entries: Vec<Value>) -> ProgressTable {
    let mut table = ProgressTable::default();
    for record in entries.into_iter().filter_map(parse_record) {
        table.insert(&record.idents, derive(&record));
    }
    table
}

/// Pick the record matching `idents` from an unindexed list.
pub fn find_record<'a>(
    records: &'a [InfraProgressRecord],
    idents: &ResourceIdents,
) -> Option<&'a InfraProgressRecord> {
    let mut index = super::ident::IdentIndex::default();
    for (i, record) in records.iter().enumerate() {
        index.insert(&record.idents, i);
    }
    index.lookup(idents).map(|&i| &records[i])
}
