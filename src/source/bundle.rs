//! Debug-bundle backed implementation of every source seam.
//!
//! A bundle is one JSON document holding everything the dashboard reads.
//! File-backed sources re-read the document on every call so another
//! process can keep rewriting it; in-memory sources sit behind a
//! `tokio::sync::RwLock` and can be mutated while the dashboard runs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::trace;

use crate::graph::{ResourceEntity, ResourceIdents};
use crate::progress::infra;
use crate::{Error, Result};

use super::{
    CatalogSource, DetailSource, FileEntry, InfraSource, LogSnapshot, LogSource, OperationEntry,
    RemoteExec, WorkflowSource,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bundle {
    pub resources: Vec<ResourceEntity>,
    /// Resource id to the ids it depends on.
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Resource id to the error its dependency lookup reports.
    pub dependency_errors: BTreeMap<String, String>,
    pub workflow: Vec<Value>,
    pub infra: Vec<Value>,
    pub logs: BTreeMap<String, LogSnapshot>,
    /// Resource id to `path -> content` of its rendered files.
    pub files: BTreeMap<String, BTreeMap<String, String>>,
    pub outputs: BTreeMap<String, Value>,
    pub history: BTreeMap<String, Vec<OperationEntry>>,
}

enum Backing {
    File(PathBuf),
    Memory(Arc<RwLock<Bundle>>),
}

pub struct BundleSource {
    backing: Backing,
}

impl BundleSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::File(path.into()),
        }
    }

    pub fn in_memory(bundle: Bundle) -> Self {
        Self {
            backing: Backing::Memory(Arc::new(RwLock::new(bundle))),
        }
    }

    /// Mutate an in-memory bundle; a no-op for file-backed sources.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Bundle),
    {
        if let Backing::Memory(lock) = &self.backing {
            f(&mut *lock.write().await);
        }
    }

    async fn with<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Bundle) -> Result<R>,
    {
        match &self.backing {
            Backing::File(path) => {
                trace!(path = %path.display(), "reading bundle");
                let text = tokio::fs::read_to_string(path).await?;
                let bundle: Bundle = serde_json::from_str(&text)?;
                f(&bundle)
            }
            Backing::Memory(lock) => f(&*lock.read().await),
        }
    }
}

#[async_trait]
impl CatalogSource for BundleSource {
    async fn resources(&self) -> Result<Vec<ResourceEntity>> {
        self.with(|b| Ok(b.resources.clone())).await
    }

    async fn dependencies(&self, resource_id: &str) -> Result<Vec<String>> {
        self.with(|b| {
            if let Some(e) = b.dependency_errors.get(resource_id) {
                return Err(Error::Source(e.clone()));
            }
            Ok(b.dependencies.get(resource_id).cloned().unwrap_or_default())
        })
        .await
    }
}

#[async_trait]
impl WorkflowSource for BundleSource {
    async fn workflow_events(&self) -> Result<Vec<Value>> {
        self.with(|b| Ok(b.workflow.clone())).await
    }
}

#[async_trait]
impl InfraSource for BundleSource {
    async fn infra_records(&self) -> Result<Vec<Value>> {
        self.with(|b| Ok(b.infra.clone())).await
    }

    async fn infra_record(&self, idents: &ResourceIdents) -> Result<Option<Value>> {
        self.with(|b| {
            let records: Vec<_> = b
                .infra
                .iter()
                .cloned()
                .filter_map(infra::parse_record)
                .collect();
            match infra::find_record(&records, idents) {
                Some(record) => Ok(Some(serde_json::to_value(record)?)),
                None => Ok(None),
            }
        })
        .await
    }
}

#[async_trait]
impl LogSource for BundleSource {
    async fn latest_log(&self, resource_id: &str) -> Result<Option<LogSnapshot>> {
        self.with(|b| Ok(b.logs.get(resource_id).cloned())).await
    }
}

#[async_trait]
impl RemoteExec for BundleSource {
    async fn list_tree(&self, resource_id: &str) -> Result<Vec<FileEntry>> {
        self.with(|b| {
            let files = b
                .files
                .get(resource_id)
                .ok_or_else(|| Error::NotFound(format!("no working directory for {resource_id}")))?;
            Ok(entries_for(files))
        })
        .await
    }

    async fn read_file(&self, resource_id: &str, path: &str) -> Result<String> {
        self.with(|b| {
            b.files
                .get(resource_id)
                .and_then(|files| files.get(path))
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("{resource_id}:{path}")))
        })
        .await
    }
}

#[async_trait]
impl DetailSource for BundleSource {
    async fn outputs(&self, resource_id: &str) -> Result<Value> {
        self.with(|b| Ok(b.outputs.get(resource_id).cloned().unwrap_or(Value::Null)))
            .await
    }

    async fn history(&self, resource_id: &str) -> Result<Vec<OperationEntry>> {
        self.with(|b| Ok(b.history.get(resource_id).cloned().unwrap_or_default()))
            .await
    }
}

/// Flat listing with every intermediate directory made explicit.
fn entries_for(files: &BTreeMap<String, String>) -> Vec<FileEntry> {
    let mut dirs: BTreeSet<String> = BTreeSet::new();
    for path in files.keys() {
        let mut prefix = String::new();
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        for part in parts.iter().take(parts.len().saturating_sub(1)) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            dirs.insert(prefix.clone());
        }
    }

    let mut entries: Vec<FileEntry> = dirs
        .into_iter()
        .map(|path| FileEntry {
            path,
            is_dir: true,
            size: 0,
        })
        .collect();
    entries.extend(files.iter().map(|(path, content)| FileEntry {
        path: path.trim_matches('/').to_string(),
        is_dir: false,
        size: content.len() as u64,
    }));
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}
