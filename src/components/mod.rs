//! UI components of the dependency console.

pub mod dependency_graph;
pub mod drawers;
