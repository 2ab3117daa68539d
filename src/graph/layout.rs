//! Crossing minimization within fixed levels (barycenter heuristic).
//!
//! Levels start in label order. Each pass runs a downward sweep (levels
//! 1..last, ordered by the mean position of predecessors in the level above)
//! followed by an upward sweep (levels last-1..0, using successors in the
//! level below). Positions update as soon as a level is reordered, so later
//! levels in the same sweep see the new order. A node with no neighbour in
//! the reference level keeps its current index as its barycenter.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::model::Graph;

/// Number of down+up sweep passes.
pub const SWEEP_PASSES: usize = 2;

/// Column (level index) and row (index within level) of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub column: usize,
    pub row: usize,
}

/// Finalized within-level order plus a position lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub levels: Vec<Vec<String>>,
    pub positions: HashMap<String, GridPos>,
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<GridPos> {
        self.positions.get(id).copied()
    }

    /// Level-ordered selectable node sequence used by the dashboard cursor.
    pub fn sequence(&self) -> Vec<&str> {
        self.levels
            .iter()
            .flat_map(|level| level.iter().map(String::as_str))
            .collect()
    }

    /// Index into [`Layout::sequence`] of the node at `pos`.
    pub fn sequence_index(&self, pos: GridPos) -> Option<usize> {
        let level = self.levels.get(pos.column)?;
        if pos.row >= level.len() {
            return None;
        }
        let before: usize = self.levels[..pos.column].iter().map(Vec::len).sum();
        Some(before + pos.row)
    }

    /// Grid position of the `index`-th node of the sequence.
    pub fn grid_at(&self, index: usize) -> Option<GridPos> {
        let mut remaining = index;
        for (column, level) in self.levels.iter().enumerate() {
            if remaining < level.len() {
                return Some(GridPos { column, row: remaining });
            }
            remaining -= level.len();
        }
        None
    }

    pub fn node_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn max_rows(&self) -> usize {
        self.levels.iter().map(Vec::len).max().unwrap_or(0)
    }
}

pub struct LayoutEngine;

impl LayoutEngine {
    pub fn layout(graph: &Graph) -> Layout {
        Self::layout_with_passes(graph, SWEEP_PASSES)
    }

    pub fn layout_with_passes(graph: &Graph, passes: usize) -> Layout {
        let label = |id: &str| -> String {
            graph
                .node(id)
                .map(|n| n.label().to_string())
                .unwrap_or_else(|| id.to_string())
        };

        let mut levels: Vec<Vec<String>> = graph.levels.clone();
        for level in &mut levels {
            level.sort_by(|a, b| label(a).cmp(&label(b)).then_with(|| a.cmp(b)));
        }

        let mut positions: HashMap<String, GridPos> = HashMap::new();
        refresh_positions(&levels, &mut positions);

        let preds: HashMap<&str, Vec<&str>> = neighbour_map(graph, true);
        let succs: HashMap<&str, Vec<&str>> = neighbour_map(graph, false);

        for _ in 0..passes {
            for idx in 1..levels.len() {
                reorder_level(&mut levels, idx, idx - 1, &preds, &mut positions, &label);
            }
            for idx in (0..levels.len().saturating_sub(1)).rev() {
                reorder_level(&mut levels, idx, idx + 1, &succs, &mut positions, &label);
            }
        }

        Layout { levels, positions }
    }

    /// Number of edge crossings between adjacent levels.
    pub fn crossings(graph: &Graph, layout: &Layout) -> usize {
        let mut total = 0;
        for pair in 0..layout.levels.len().saturating_sub(1) {
            let mut segments: Vec<(usize, usize)> = Vec::new();
            for edge in &graph.edges {
                let (Some(from), Some(to)) = (layout.position(&edge.from), layout.position(&edge.to))
                else {
                    continue;
                };
                if from.column == pair && to.column == pair + 1 {
                    segments.push((from.row, to.row));
                }
            }
            for i in 0..segments.len() {
                for j in (i + 1)..segments.len() {
                    let (a1, b1) = segments[i];
                    let (a2, b2) = segments[j];
                    if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                        total += 1;
                    }
                }
            }
        }
        total
    }
}

fn neighbour_map(graph: &Graph, predecessors: bool) -> HashMap<&str, Vec<&str>> {
    let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &graph.edges {
        let (node, other) = if predecessors {
            (edge.to.as_str(), edge.from.as_str())
        } else {
            (edge.from.as_str(), edge.to.as_str())
        };
        map.entry(node).or_default().push(other);
    }
    map
}

fn refresh_positions(levels: &[Vec<String>], positions: &mut HashMap<String, GridPos>) {
    for (column, level) in levels.iter().enumerate() {
        for (row, id) in level.iter().enumerate() {
            positions.insert(id.clone(), GridPos { column, row });
        }
    }
}

fn reorder_level<F>(
    levels: &mut [Vec<String>],
    idx: usize,
    reference: usize,
    neighbours: &HashMap<&str, Vec<&str>>,
    positions: &mut HashMap<String, GridPos>,
    label: &F,
) where
    F: Fn(&str) -> String,
{
    let mut keyed: Vec<(f64, String, String)> = levels[idx]
        .iter()
        .enumerate()
        .map(|(current, id)| {
            let rows: Vec<usize> = neighbours
                .get(id.as_str())
                .into_iter()
                .flatten()
                .filter_map(|n| positions.get(*n))
                .filter(|p| p.column == reference)
                .map(|p| p.row)
                .collect();
            let barycenter = if rows.is_empty() {
                current as f64
            } else {
                rows.iter().sum::<usize>() as f64 / rows.len() as f64
            };
            (barycenter, label(id), id.clone())
        })
        .collect();

    keyed.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    levels[idx] = keyed.into_iter().map(|(_, _, id)| id).collect();
    for (row, id) in levels[idx].iter().enumerate() {
        positions.insert(id.clone(), GridPos { column: idx, row });
    }
}
