//! Dependency graph data model.
//!
//! Nodes are deployment-plan resources, edges point from a dependency to
//! its dependent. Nodes live in a `BTreeMap` so every traversal is ordered
//! by id and never depends on hashing order.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

/// Detail-view variant selected from a node's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Terraform,
    Helm,
}

impl ResourceKind {
    /// Substring match of a free-form type tag against known kinds.
    pub fn detect(type_tag: &str) -> Option<Self> {
        let tag = type_tag.to_ascii_lowercase();
        if tag.contains("terraform") || tag.contains("tofu") || tag.starts_with("tf") {
            Some(Self::Terraform)
        } else if tag.contains("helm") || tag.contains("chart") {
            Some(Self::Helm)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Terraform => "Terraform",
            Self::Helm => "Helm",
        }
    }
}

/// A resource in the deployment plan's dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Human-facing alias.
    pub key: Option<String>,
    pub name: String,
    pub type_tag: Option<String>,
    /// Synthesized for a dependency id that was never declared.
    #[serde(default)]
    pub stub: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: None,
            name: name.into(),
            type_tag: None,
            stub: false,
        }
    }

    pub fn stub(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            key: None,
            type_tag: None,
            stub: true,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_type(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }

    /// Stable display label used for ordering and card titles.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.type_tag.as_deref().and_then(ResourceKind::detect)
    }

    pub fn idents(&self) -> ResourceIdents {
        ResourceIdents {
            id: Some(self.id.clone()),
            key: self.key.clone(),
            name: Some(self.name.clone()),
        }
    }
}

/// The three identifiers a resource may be known by upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdents {
    pub id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
}

impl ResourceIdents {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.key.is_none() && self.name.is_none()
    }

    /// Best single identifier for log lines and remote calls.
    pub fn primary(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.key.as_deref())
            .or(self.name.as_deref())
    }
}

/// Directed dependency: `from` must exist before `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The laid-out dependency graph plus build diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: BTreeMap<String, Node>,
    pub edges: Vec<Edge>,
    /// Dependency-ordered node-id groups; covers every node exactly once.
    pub levels: Vec<Vec<String>>,
    pub has_cycle: bool,
    /// Per-resource soft failures collected while building.
    pub errors: Vec<String>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of the nodes `id` depends on.
    pub fn predecessors(&self, id: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from.as_str())
            .collect()
    }

    /// Ids of the nodes that depend on `id`.
    pub fn successors(&self, id: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Level index of every node, from the current partition.
    pub fn level_of(&self) -> BTreeMap<&str, usize> {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(idx, level)| level.iter().map(move |id| (id.as_str(), idx)))
            .collect()
    }

    /// Petgraph view of the graph, for algorithms that want one.
    ///
    /// Node indices follow id order, so the result is deterministic.
    pub fn to_digraph(&self) -> (DiGraph<String, ()>, BTreeMap<String, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut index = BTreeMap::new();
        for id in self.nodes.keys() {
            index.insert(id.clone(), graph.add_node(id.clone()));
        }
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(from, to, ());
            }
        }
        (graph, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection_is_substring_match() {
        assert_eq!(ResourceKind::detect("terraform-module"), Some(ResourceKind::Terraform));
        assert_eq!(ResourceKind::detect("TF_STACK"), Some(ResourceKind::Terraform));
        assert_eq!(ResourceKind::detect("helm-release"), Some(ResourceKind::Helm));
        assert_eq!(ResourceKind::detect("HelmChart"), Some(ResourceKind::Helm));
        assert_eq!(ResourceKind::detect("secret"), None);
    }

    #[test]
    fn test_label_falls_back_to_id() {
        assert_eq!(Node::new("res-1", "").label(), "res-1");
        assert_eq!(Node::new("res-1", "Network").label(), "Network");
        assert_eq!(Node::stub("res-2").label(), "res-2");
    }

    #[test]
    fn test_neighbors() {
        let mut graph = Graph::default();
        for id in ["a", "b", "c"] {
            graph.nodes.insert(id.to_string(), Node::new(id, id));
        }
        graph.edges = vec![Edge::new("a", "c"), Edge::new("b", "c")];

        assert_eq!(graph.predecessors("c").into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(graph.successors("a").into_iter().collect::<Vec<_>>(), vec!["c"]);
        assert!(graph.successors("c").is_empty());
    }

    #[test]
    fn test_to_digraph_skips_dangling_edges() {
        let mut graph = Graph::default();
        graph.nodes.insert("a".into(), Node::new("a", "a"));
        graph.edges = vec![Edge::new("a", "ghost")];

        let (digraph, index) = graph.to_digraph();
        assert_eq!(digraph.node_count(), 1);
        assert_eq!(digraph.edge_count(), 0);
        assert!(index.contains_key("a"));
    }

    #[test]
    fn test_idents_primary_precedence() {
        let idents = ResourceIdents {
            id: None,
            key: Some("net/vpc".into()),
            name: Some("VPC".into()),
        };
        assert_eq!(idents.primary(), Some("net/vpc"));
        assert!(!idents.is_empty());
        assert!(ResourceIdents::default().is_empty());
    }
}
