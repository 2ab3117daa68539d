//! Per-node progress from two independently addressed feeds.

pub mod aggregator;
pub mod ident;
pub mod infra;
pub mod model;
pub mod workflow;

pub use aggregator::{fetch_record, fetch_tables, FeedResult, ProgressAggregator};
pub use ident::{IdentIndex, ProgressTable};
pub use model::{
    Category, EventType, InfraProgressRecord, ManagedResource, ManagedState, Progress,
    ResourceWorkflow, Status, WorkflowEvent,
};
