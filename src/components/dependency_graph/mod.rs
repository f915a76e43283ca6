//! Application dependency graph.
//!
//! Turns monitoring records into a directed graph, lays it out left to right
//! with a layered engine and renders it on an HTML canvas with:
//! - One node per application, one edge per ordered (consumer, provider) pair
//! - Drag to pan, button-only zoom and fit view
//! - Neighbourhood emphasis while a node is hovered
//! - Click-through from an edge to its dependency record
//!
//! # Example
//!
//! ```ignore
//! use cosmos_graph::{Dependency, DependencyData, DependencyGraph};
//!
//! let data = RwSignal::new(DependencyData::default());
//! let on_edge = Callback::new(|dep: Dependency| log::info!("{} -> {}", dep.consumer, dep.provider));
//!
//! view! { <DependencyGraph data=data on_edge_click=on_edge main_application="billing".to_string() /> }
//! ```

mod component;
pub mod hover;
pub mod layout;
pub mod model;
mod render;
pub mod scale;
pub mod sequence;
pub mod theme;
pub mod types;
mod view;

pub use component::DependencyGraph;
pub use layout::{LaidOutGraph, LayeredLayout, LayoutEngine, LayoutError};
pub use model::{DuplicatePolicy, EdgeId, GraphModel, build_graph};
pub use sequence::{RequestSequencer, Ticket};
pub use theme::Theme;
pub use types::{ApplicationInfo, Dependency, DependencyData, EndpointMap, EndpointUsage};
