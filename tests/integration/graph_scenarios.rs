//! Graph construction from a bundle through leveling and layout.

use depscope::graph::{load_graph, GraphBuilder, LayoutEngine};
use depscope::source::bundle::BundleSource;
use depscope::Error;

use crate::fixtures::BundleBuilder;

#[tokio::test]
async fn test_fan_in_levels() {
    let bundle = BundleBuilder::new()
        .resource("A", "terraform")
        .resource("B", "terraform")
        .resource("C", "terraform")
        .depends("C", &["A", "B"])
        .build();
    let source = BundleSource::in_memory(bundle);

    let graph = load_graph(&source, &GraphBuilder::default()).await.unwrap();

    assert_eq!(graph.levels, vec![vec!["A", "B"], vec!["C"]]);
    assert!(!graph.has_cycle);
}

#[tokio::test]
async fn test_two_node_cycle_shares_trailing_level() {
    let bundle = BundleBuilder::new()
        .resource("B", "terraform")
        .resource("A", "terraform")
        .depends("B", &["A"])
        .depends("A", &["B"])
        .build();
    let source = BundleSource::in_memory(bundle);

    let graph = load_graph(&source, &GraphBuilder::default()).await.unwrap();

    assert!(graph.has_cycle);
    assert_eq!(graph.levels.last().unwrap(), &vec!["A", "B"]);
    let placed: usize = graph.levels.iter().map(Vec::len).sum();
    assert_eq!(placed, 2);
}

#[tokio::test]
async fn test_failed_lookup_keeps_node_without_edges() {
    let bundle = BundleBuilder::new()
        .resource("net", "terraform")
        .resource("app", "helm")
        .depends("app", &["net"])
        .dependency_error("net", "catalog timeout")
        .build();
    let source = BundleSource::in_memory(bundle);

    let graph = load_graph(&source, &GraphBuilder::default()).await.unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.errors.len(), 1);
    assert!(graph.errors[0].starts_with("net:"));
}

#[tokio::test]
async fn test_undeclared_dependency_becomes_stub() {
    let bundle = BundleBuilder::new()
        .resource("app", "helm")
        .depends("app", &["vpc"])
        .build();
    let source = BundleSource::in_memory(bundle);

    let graph = load_graph(&source, &GraphBuilder::default()).await.unwrap();

    assert!(graph.node("vpc").unwrap().stub);
    assert_eq!(graph.levels, vec![vec!["vpc"], vec!["app"]]);
}

#[tokio::test]
async fn test_internal_helpers_filtered() {
    let bundle = BundleBuilder::new()
        .resource("app", "helm")
        .resource("dns-helper", "terraform")
        .depends("app", &["dns-helper"])
        .build();
    let source = BundleSource::in_memory(bundle);

    let graph = load_graph(&source, &GraphBuilder::new(["-helper"])).await.unwrap();

    assert!(graph.node("dns-helper").is_none());
    assert!(graph.edges.is_empty());
    assert_eq!(graph.levels, vec![vec!["app"]]);
}

#[tokio::test]
async fn test_empty_catalog_is_fatal() {
    let source = BundleSource::in_memory(BundleBuilder::new().build());
    let err = load_graph(&source, &GraphBuilder::default()).await.unwrap_err();
    assert!(matches!(err, Error::GraphUnavailable(_)));
}

#[tokio::test]
async fn test_layout_covers_every_node_once() {
    let bundle = crate::fixtures::plan_bundle().build();
    let source = BundleSource::in_memory(bundle);
    let graph = load_graph(&source, &GraphBuilder::default()).await.unwrap();

    let layout = LayoutEngine::layout(&graph);

    assert_eq!(layout.node_count(), graph.node_count());
    assert_eq!(layout.levels.len(), 3);
    for (column, level) in layout.levels.iter().enumerate() {
        for (row, id) in level.iter().enumerate() {
            let pos = layout.position(id).unwrap();
            assert_eq!((pos.column, pos.row), (column, row));
        }
    }
    assert_eq!(LayoutEngine::crossings(&graph, &layout), 0);
}
