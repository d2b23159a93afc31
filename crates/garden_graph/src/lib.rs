//! The config graph.
//!
//! Joins a project's modules, services, tasks, and tests into a single
//! queryable graph with typed, labeled dependency edges (`build`, `service`,
//! `task`, `test`), and enforces acyclicity both within each label and
//! across their union.

mod entity;
mod error;
mod graph;

pub use entity::{EntityKind, EntityRef, ServiceConfig, TaskConfig, TestConfig, parse_service, parse_task, parse_test};
pub use error::GraphError;
pub use graph::{ConfigGraph, build_graph};
