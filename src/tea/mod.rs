//! The Elm Architecture (TEA) implementation for the dashboard.
//!
//! This module provides a clean separation of concerns:
//! - `Model`: Pure application state
//! - `Message`: Inputs to the update function
//! - `Command`: Outputs (side effects) from the update function
//! - `update`: Pure function that transforms state
//!
//! `detail`, `tree` and `history` hold the per-resource drill-down state.

pub mod command;
pub mod detail;
pub mod history;
pub mod message;
pub mod model;
pub mod tree;
pub mod update;

pub use command::Command;
pub use detail::{DetailAction, DetailSelection, DetailState, DetailTab, Loadable, LogPane, LogStatus};
pub use message::Message;
pub use model::{GraphStatus, Model, Notification, NotificationLevel, RefreshState, View};
pub use update::update;
