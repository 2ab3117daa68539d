//! Resource dependency graph: construction, leveling and layout.
//!
//! Data flows `builder` → `levels` → `layout`; the canvas module paints
//! the result.

pub mod builder;
pub mod layout;
pub mod levels;
pub mod model;

pub use builder::{load_graph, DependencyLookup, GraphBuilder, ResourceEntity};
pub use layout::{GridPos, Layout, LayoutEngine};
pub use levels::LevelAssigner;
pub use model::{Edge, Graph, Node, ResourceIdents, ResourceKind};
