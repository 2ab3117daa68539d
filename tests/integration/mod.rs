//! Integration test suite for depscope.
//!
//! These tests drive the crate from a debug bundle through graph
//! construction, progress merging, log tailing and the update loop,
//! executing commands with the real `Effects`.
//!
//! # Test Categories
//!
//! - `graph_scenarios`: Leveling, cycles, stubs and layout
//! - `progress_merge`: Workflow and infra feeds merged per node
//! - `log_stream`: Log tailing into an open detail view
//! - `dashboard_flow`: Navigation, detail views and refresh scheduling
//!
//! # CI Compatibility
//!
//! Bundles are held in memory and timers run on paused tokio time, so
//! nothing touches the network or waits in real time.

mod fixtures;

mod dashboard_flow;
mod graph_scenarios;
mod log_stream;
mod progress_merge;
