//! Both progress feeds fetched from a bundle and merged per node.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use depscope::graph::{load_graph, Graph, GraphBuilder};
use depscope::progress::{fetch_tables, ProgressAggregator, Status};
use depscope::source::bundle::{Bundle, BundleSource};
use depscope::source::{Sources, WorkflowSource};
use depscope::{Error, Result};

use crate::fixtures::{event, infra_record, plan_bundle, workflow_entry};

async fn merged(bundle: Bundle) -> (Graph, ProgressAggregator) {
    let source = Arc::new(BundleSource::in_memory(bundle));
    let graph = load_graph(source.as_ref(), &GraphBuilder::default()).await.unwrap();
    let (workflow, infra) = fetch_tables(&Sources::uniform(source)).await;
    let mut aggregator = ProgressAggregator::default();
    aggregator.apply(&graph, workflow, infra);
    (graph, aggregator)
}

#[tokio::test]
async fn test_silent_category_ignored() {
    let bundle = plan_bundle()
        .workflow(workflow_entry(
            "net",
            json!({
                "bootstrap": [event("Started"), event("Completed")],
                "storage": [event("Completed")],
                "network": [event("Completed")],
                "compute": [],
            }),
        ))
        .build();

    let (_, agg) = merged(bundle).await;
    let net = agg.get("net").unwrap();

    assert_eq!(net.status, Status::Completed);
    assert_eq!((net.completed, net.total), (3, 3));
    assert_eq!(net.percent, 100);
}

#[tokio::test]
async fn test_failed_category_wins() {
    let bundle = plan_bundle()
        .workflow(workflow_entry(
            "dns",
            json!({
                "storage": [event("Completed")],
                "network": [event("Started"), event("Failed")],
            }),
        ))
        .build();

    let (_, agg) = merged(bundle).await;

    assert_eq!(agg.get("dns").unwrap().status, Status::Failed);
}

#[tokio::test]
async fn test_infra_record_takes_precedence() {
    let bundle = plan_bundle()
        .workflow(workflow_entry("cluster", json!({"compute": [event("Started")]})))
        .infra(infra_record("cluster", "applied", 4, 4))
        .build();

    let (_, agg) = merged(bundle).await;
    let cluster = agg.get("cluster").unwrap();

    assert_eq!(cluster.status, Status::Completed);
    assert_eq!(cluster.percent, 100);
}

#[tokio::test]
async fn test_percent_clamped_when_ready_exceeds_plan() {
    let bundle = plan_bundle().infra(infra_record("app", "installing", 7, 5)).build();

    let (_, agg) = merged(bundle).await;
    let app = agg.get("app").unwrap();

    assert_eq!(app.percent, 100);
    assert_eq!(app.status, Status::Running);
}

#[tokio::test]
async fn test_feed_identifiers_normalized() {
    let bundle = plan_bundle()
        .workflow(workflow_entry("NET", json!({"bootstrap": [event("Completed")]})))
        .infra(infra_record("tf-dns", "running", 1, 4))
        .build();

    let (_, agg) = merged(bundle).await;

    assert_eq!(agg.get("net").unwrap().status, Status::Completed);
    assert_eq!(agg.get("dns").unwrap().percent, 25);
}

#[tokio::test]
async fn test_infra_identifier_from_labels() {
    let record: Value = json!({
        "labels": {"Resource-Id": "cluster"},
        "status": "failed",
    });
    let bundle = plan_bundle().infra(record).build();

    let (_, agg) = merged(bundle).await;

    assert_eq!(agg.get("cluster").unwrap().status, Status::Failed);
}

#[tokio::test]
async fn test_nodes_without_data_are_absent() {
    let bundle = plan_bundle()
        .infra(infra_record("app", "deployed", 2, 2))
        .build();

    let (graph, agg) = merged(bundle).await;

    assert_eq!(graph.node_count(), 4);
    assert_eq!(agg.merged().len(), 1);
    assert!(!agg.any_non_terminal());
}

struct FailingWorkflow;

#[async_trait]
impl WorkflowSource for FailingWorkflow {
    async fn workflow_events(&self) -> Result<Vec<Value>> {
        Err(Error::Source("workflow store offline".to_string()))
    }
}

#[tokio::test]
async fn test_failed_feed_keeps_last_known_table() {
    let source = Arc::new(BundleSource::in_memory(
        plan_bundle()
            .workflow(workflow_entry("net", json!({"storage": [event("Started")]})))
            .build(),
    ));
    let graph = load_graph(source.as_ref(), &GraphBuilder::default()).await.unwrap();
    let mut agg = ProgressAggregator::default();

    let (workflow, infra) = fetch_tables(&Sources::uniform(source.clone())).await;
    agg.apply(&graph, workflow, infra);
    assert_eq!(agg.get("net").unwrap().status, Status::Running);

    let mut failing = Sources::uniform(source);
    failing.workflow = Arc::new(FailingWorkflow);
    let (workflow, infra) = fetch_tables(&failing).await;
    assert!(workflow.is_err());
    agg.apply(&graph, workflow, infra);

    assert_eq!(agg.get("net").unwrap().status, Status::Running);
    assert!(agg.any_non_terminal());
}
