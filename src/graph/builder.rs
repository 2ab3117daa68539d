//! Turns catalog resources and their dependency lists into a [`Graph`].
//!
//! Internal helper resources are filtered by substring rules before any
//! edge is created, dependency ids that were never declared get a stub
//! node, and a failed dependency lookup only costs that resource its
//! edges.

use std::collections::{BTreeSet, HashSet};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::source::CatalogSource;
use crate::{Error, Result};

use super::levels::LevelAssigner;
use super::model::{Edge, Graph, Node};

/// A resource entity as handed over by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "type")]
    pub type_tag: Option<String>,
}

impl ResourceEntity {
    fn into_node(self) -> Node {
        Node {
            id: self.id,
            key: self.key.filter(|k| !k.is_empty()),
            name: self.name,
            type_tag: self.type_tag.filter(|t| !t.is_empty()),
            stub: false,
        }
    }
}

/// Outcome of one resource's dependency lookup.
pub type DependencyLookup = (String, std::result::Result<Vec<String>, String>);

#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    exclude: Vec<String>,
}

impl GraphBuilder {
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exclude: exclude
                .into_iter()
                .map(|s| s.as_ref().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// True when any identifier contains an exclusion substring.
    pub fn is_excluded(&self, id: &str, name: &str, key: Option<&str>) -> bool {
        let fields = [Some(id), Some(name), key];
        fields.iter().flatten().any(|field| {
            let field = field.to_ascii_lowercase();
            self.exclude.iter().any(|pattern| field.contains(pattern))
        })
    }

    /// Build the graph and assign its levels.
    pub fn build(&self, resources: Vec<ResourceEntity>, dependencies: Vec<DependencyLookup>) -> Graph {
        let mut graph = Graph::default();
        let mut excluded: HashSet<String> = HashSet::new();

        for entity in resources {
            if self.is_excluded(&entity.id, &entity.name, entity.key.as_deref()) {
                debug!(id = %entity.id, "excluding internal resource");
                excluded.insert(entity.id);
                continue;
            }
            if graph.nodes.contains_key(&entity.id) {
                graph
                    .errors
                    .push(format!("{}: declared more than once, keeping first", entity.id));
                continue;
            }
            graph.nodes.insert(entity.id.clone(), entity.into_node());
        }

        let mut edges: BTreeSet<Edge> = BTreeSet::new();
        for (resource_id, lookup) in dependencies {
            if !graph.nodes.contains_key(&resource_id) {
                continue;
            }
            let deps = match lookup {
                Ok(deps) => deps,
                Err(e) => {
                    warn!(resource = %resource_id, error = %e, "dependency lookup failed");
                    graph
                        .errors
                        .push(format!("{}: dependency metadata unavailable ({})", resource_id, e));
                    continue;
                }
            };
            for dep in deps {
                if dep.is_empty() || excluded.contains(&dep) || self.is_excluded(&dep, &dep, None) {
                    continue;
                }
                if !graph.nodes.contains_key(&dep) {
                    debug!(id = %dep, "synthesizing stub node");
                    graph.nodes.insert(dep.clone(), Node::stub(dep.clone()));
                }
                edges.insert(Edge::new(dep, resource_id.clone()));
            }
        }
        graph.edges = edges.into_iter().collect();

        LevelAssigner::assign(&mut graph);
        info!(
            nodes = graph.node_count(),
            edges = graph.edges.len(),
            levels = graph.levels.len(),
            cycle = graph.has_cycle,
            soft_errors = graph.errors.len(),
            "graph built"
        );
        graph
    }
}

/// Fetch resources and their dependencies from the catalog and build.
///
/// A failed resource listing is fatal; failed dependency lookups are not.
pub async fn load_graph(catalog: &dyn CatalogSource, builder: &GraphBuilder) -> Result<Graph> {
    let resources = catalog
        .resources()
        .await
        .map_err(|e| Error::GraphUnavailable(e.to_string()))?;
    if resources.is_empty() {
        return Err(Error::GraphUnavailable("catalog returned no resources".to_string()));
    }

    let lookups = join_all(resources.iter().map(|r| async move {
        let deps = catalog.dependencies(&r.id).await.map_err(|e| e.to_string());
        (r.id.clone(), deps)
    }))
    .await;

    Ok(builder.build(resources, lookups))
}
