//! Progress types shared by both telemetry feeds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::ResourceIdents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Per-node progress overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Always within `0..=100`.
    pub percent: u8,
    pub status: Status,
    pub completed: u32,
    pub total: u32,
}

impl Progress {
    /// Build from step counts; the percentage is clamped even when
    /// `completed` exceeds `total`.
    pub fn from_counts(status: Status, completed: u32, total: u32) -> Self {
        let percent = if status == Status::Completed {
            100
        } else if total == 0 {
            0
        } else {
            let raw = (100.0 * completed as f64 / total as f64).round();
            raw.clamp(0.0, 100.0) as u8
        };
        Self {
            percent,
            status,
            completed,
            total,
        }
    }

    /// Running, pending, or partially done.
    pub fn is_non_terminal(&self) -> bool {
        matches!(self.status, Status::Running | Status::Pending)
            || (self.percent > 0 && self.percent < 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Started,
    Completed,
    Failed,
    Debug,
}

/// Deployment phase a workflow event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Bootstrap,
    Storage,
    Network,
    Compute,
    Deployment,
    Monitoring,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Bootstrap,
        Category::Storage,
        Category::Network,
        Category::Compute,
        Category::Deployment,
        Category::Monitoring,
        Category::Unknown,
    ];

    /// Unrecognised names fold into `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bootstrap" => Self::Bootstrap,
            "storage" => Self::Storage,
            "network" | "networking" => Self::Network,
            "compute" => Self::Compute,
            "deployment" | "deploy" => Self::Deployment,
            "monitoring" => Self::Monitoring,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Compute => "compute",
            Self::Deployment => "deployment",
            Self::Monitoring => "monitoring",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Workflow-step events for one resource, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceWorkflow {
    #[serde(flatten)]
    pub idents: ResourceIdents,
    #[serde(default)]
    pub categories: BTreeMap<Category, Vec<WorkflowEvent>>,
}

/// State of one sub-resource managed by an infra operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedState {
    Pending,
    Creating,
    Updating,
    Deleting,
    Ready,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResource {
    pub address: String,
    pub state: ManagedState,
}

/// Infra-operation progress snapshot for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraProgressRecord {
    #[serde(flatten)]
    pub idents: ResourceIdents,
    /// Free-form labels some upstreams use to carry the resource identifier.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub declared_resources: Option<u32>,
    #[serde(default)]
    pub planned_resources: Option<u32>,
    #[serde(default)]
    pub resources: Vec<ManagedResource>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}
