//! Merges the workflow and infra feeds into one progress value per node.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::graph::{Graph, ResourceIdents};
use crate::source::Sources;

use super::ident::ProgressTable;
use super::model::{InfraProgressRecord, Progress};
use super::{infra, workflow};

/// Result of fetching one feed, stringified for the message loop.
pub type FeedResult = std::result::Result<ProgressTable, String>;

/// Fetch and index both feeds concurrently. Resolves only once both have.
pub async fn fetch_tables(sources: &Sources) -> (FeedResult, FeedResult) {
    let (workflow_raw, infra_raw) = tokio::join!(
        sources.workflow.workflow_events(),
        sources.infra.infra_records()
    );
    (
        workflow_raw.map(workflow::table).map_err(|e| e.to_string()),
        infra_raw.map(infra::table).map_err(|e| e.to_string()),
    )
}

/// Fetch the infra record for one resource (detail view).
pub async fn fetch_record(
    sources: &Sources,
    idents: &ResourceIdents,
) -> std::result::Result<Option<InfraProgressRecord>, String> {
    let raw: Option<Value> = sources
        .infra
        .infra_record(idents)
        .await
        .map_err(|e| e.to_string())?;
    Ok(raw.and_then(infra::parse_record))
}

/// Last-known tables from each feed plus the merged per-node view.
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    workflow: Option<ProgressTable>,
    infra: Option<ProgressTable>,
    merged: BTreeMap<String, Progress>,
    loaded: bool,
}

impl ProgressAggregator {
    /// Apply one refresh cycle. A failed feed keeps its previous table.
    pub fn apply(&mut self, graph: &Graph, workflow: FeedResult, infra: FeedResult) {
        match workflow {
            Ok(table) => self.workflow = Some(table),
            Err(e) => warn!(error = %e, "workflow progress fetch failed, keeping last known"),
        }
        match infra {
            Ok(table) => self.infra = Some(table),
            Err(e) => warn!(error = %e, "infra progress fetch failed, keeping last known"),
        }
        self.loaded = true;
        self.remerge(graph);
    }

    /// Recompute the per-node view against the current graph.
    pub fn remerge(&mut self, graph: &Graph) {
        self.merged.clear();
        for node in graph.nodes.values() {
            let idents = node.idents();
            let infra = self.infra.as_ref().and_then(|t| t.lookup(&idents));
            let workflow = self.workflow.as_ref().and_then(|t| t.lookup(&idents));
            if let Some(progress) = infra.or(workflow) {
                self.merged.insert(node.id.clone(), *progress);
            }
        }
        debug!(
            nodes = graph.node_count(),
            with_progress = self.merged.len(),
            "progress merged"
        );
    }

    pub fn get(&self, node_id: &str) -> Option<&Progress> {
        self.merged.get(node_id)
    }

    /// True once a refresh cycle has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Nodes without data never count.
    pub fn any_non_terminal(&self) -> bool {
        self.merged.values().any(Progress::is_non_terminal)
    }

    pub fn merged(&self) -> &BTreeMap<String, Progress> {
        &self.merged
    }
}
