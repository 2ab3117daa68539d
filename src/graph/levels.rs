//! Layered topological sort.
//!
//! Each round collects every node whose remaining in-degree is zero, sorted
//! by id, as the next level. Nodes still holding in-degree once the frontier
//! runs dry sit on or behind a cycle; they are flagged and appended as one
//! trailing level, again sorted by id.

use std::collections::BTreeMap;

use petgraph::Direction;
use tracing::warn;

use super::model::Graph;

pub struct LevelAssigner;

impl LevelAssigner {
    /// Compute `(levels, has_cycle)` without touching the graph.
    pub fn levels(graph: &Graph) -> (Vec<Vec<String>>, bool) {
        let (digraph, index) = graph.to_digraph();

        let mut in_degree: BTreeMap<&str, usize> = index
            .iter()
            .map(|(id, &idx)| {
                (
                    id.as_str(),
                    digraph.neighbors_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut levels: Vec<Vec<String>> = Vec::new();
        loop {
            // BTreeMap iteration keeps the frontier sorted by id.
            let frontier: Vec<&str> = in_degree
                .iter()
                .filter(|(_, deg)| **deg == 0)
                .map(|(&id, _)| id)
                .collect();
            if frontier.is_empty() {
                break;
            }

            for id in &frontier {
                in_degree.remove(id);
                let idx = index[*id];
                for succ in digraph.neighbors_directed(idx, Direction::Outgoing) {
                    if let Some(deg) = in_degree.get_mut(digraph[succ].as_str()) {
                        *deg = deg.saturating_sub(1);
                    }
                }
            }
            levels.push(frontier.into_iter().map(String::from).collect());
        }

        let has_cycle = !in_degree.is_empty();
        if has_cycle {
            let remainder: Vec<String> = in_degree.keys().map(|id| id.to_string()).collect();
            warn!(nodes = ?remainder, "dependency cycle detected");
            levels.push(remainder);
        }

        (levels, has_cycle)
    }

    /// Assign levels in place.
    pub fn assign(graph: &mut Graph) {
        let (levels, has_cycle) = Self::levels(graph);
        graph.levels = levels;
        graph.has_cycle = has_cycle;
    }
}
