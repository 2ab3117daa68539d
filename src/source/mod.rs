//! Narrow seams to the services the dashboard reads from.
//!
//! Every trait is object-safe and `Send + Sync` so implementations can be
//! shared as `Arc<dyn …>` across background tasks. Transport, credentials
//! and remote execution live behind these traits.

pub mod bundle;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{ResourceEntity, ResourceIdents};
use crate::progress::Status;
use crate::Result;

pub use bundle::{Bundle, BundleSource};

/// Resource listing and per-resource dependency lookups.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn resources(&self) -> Result<Vec<ResourceEntity>>;

    /// Ids of the resources `resource_id` depends on.
    async fn dependencies(&self, resource_id: &str) -> Result<Vec<String>>;
}

/// Category-based workflow-step events.
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    /// One raw JSON entry per resource; parsed leniently downstream.
    async fn workflow_events(&self) -> Result<Vec<Value>>;
}

/// Infra-operation progress records.
#[async_trait]
pub trait InfraSource: Send + Sync {
    async fn infra_records(&self) -> Result<Vec<Value>>;

    /// The single best record for one resource, if any.
    async fn infra_record(&self, idents: &ResourceIdents) -> Result<Option<Value>>;
}

/// Latest log content stored for a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub operation_id: String,
    pub content: String,
}

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Content of the most recent operation's log, `None` when nothing ran yet.
    async fn latest_log(&self, resource_id: &str) -> Result<Option<LogSnapshot>>;
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Slash-separated path relative to the resource's working directory.
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
}

/// Listing and reading files on the resource's execution target.
#[async_trait]
pub trait RemoteExec: Send + Sync {
    async fn list_tree(&self, resource_id: &str) -> Result<Vec<FileEntry>>;

    async fn read_file(&self, resource_id: &str, path: &str) -> Result<String>;
}

/// One recorded infra action for a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEntry {
    pub operation_id: String,
    /// plan, apply, destroy, upgrade...
    pub action: String,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Structured outputs and operation history.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn outputs(&self, resource_id: &str) -> Result<Value>;

    async fn history(&self, resource_id: &str) -> Result<Vec<OperationEntry>>;
}

/// Every collaborator the dashboard needs, cheap to clone into tasks.
#[derive(Clone)]
pub struct Sources {
    pub catalog: Arc<dyn CatalogSource>,
    pub workflow: Arc<dyn WorkflowSource>,
    pub infra: Arc<dyn InfraSource>,
    pub logs: Arc<dyn LogSource>,
    pub exec: Arc<dyn RemoteExec>,
    pub detail: Arc<dyn DetailSource>,
}

impl Sources {
    /// Route every seam to one implementation.
    pub fn uniform<T>(source: Arc<T>) -> Self
    where
        T: CatalogSource + WorkflowSource + InfraSource + LogSource + RemoteExec + DetailSource + 'static,
    {
        Self {
            catalog: source.clone(),
            workflow: source.clone(),
            infra: source.clone(),
            logs: source.clone(),
            exec: source.clone(),
            detail: source,
        }
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources").finish_non_exhaustive()
    }
}
