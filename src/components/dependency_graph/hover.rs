//! Hover emphasis: which nodes stay at full opacity while a node is hovered.
//!
//! Emphasis is never stored per node. It is derived from the hovered id and
//! the adjacency list whenever it is needed, so replacing the dataset while
//! a node is hovered cannot leave stale flags behind.

use std::collections::{HashMap, HashSet};

use leptos::prelude::*;

/// Hovered node id scoped to one graph instance.
#[derive(Clone, Copy, Debug)]
pub struct HoverContext {
	pub hovered: RwSignal<Option<String>>,
}

impl HoverContext {
	pub fn new() -> Self {
		Self {
			hovered: RwSignal::new(None),
		}
	}

	/// Writes the hovered node, skipping the update when nothing changed.
	pub fn set(&self, node: Option<&str>) {
		if self.hovered.with_untracked(|h| h.as_deref() != node) {
			self.hovered.set(node.map(str::to_string));
		}
	}

	pub fn clear(&self) {
		self.set(None);
	}
}

impl Default for HoverContext {
	fn default() -> Self {
		Self::new()
	}
}

/// Provides a fresh hover context to the current component subtree.
pub fn provide_hover_context() -> HoverContext {
	let hover = HoverContext::new();
	provide_context(hover);
	hover
}

/// Whether `node` keeps full opacity: no hover at all, the hovered node
/// itself, or one of its direct neighbours.
pub fn is_emphasized(
	hovered: Option<&str>,
	node: &str,
	adjacency: &HashMap<String, HashSet<String>>,
) -> bool {
	match hovered {
		None => true,
		Some(h) if h == node => true,
		Some(h) => adjacency.get(h).is_some_and(|n| n.contains(node)),
	}
}

/// Whether an edge touches the hovered node.
pub fn is_edge_emphasized(hovered: Option<&str>, source: &str, target: &str) -> bool {
	match hovered {
		None => true,
		Some(h) => h == source || h == target,
	}
}

/// Smooths the dimming of de-emphasised elements over a few frames.
///
/// Holds a single scalar: 0.0 means nothing is dimmed, 1.0 means fully dimmed.
/// Exponential smoothing gives a natural ease-out.
#[derive(Clone, Debug, Default)]
pub struct DimFade {
	level: f64,
}

impl DimFade {
	/// Advance towards the target level for `hovering`.
	pub fn tick(&mut self, hovering: bool, dt: f64) {
		const FADE_IN_SPEED: f64 = 10.0;
		const FADE_OUT_SPEED: f64 = 6.0;

		let (target, speed) = if hovering {
			(1.0, FADE_IN_SPEED)
		} else {
			(0.0, FADE_OUT_SPEED)
		};
		self.level += (target - self.level) * (1.0 - (-speed * dt).exp());
		if (self.level - target).abs() < 0.005 {
			self.level = target;
		}
	}

	pub fn level(&self) -> f64 {
		self.level
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::dependency_graph::model::{DuplicatePolicy, build_graph};
	use crate::components::dependency_graph::types::{ApplicationInfo, Dependency, DependencyData};

	fn adjacency() -> HashMap<String, HashSet<String>> {
		let data = DependencyData {
			applications_involved: ["x", "a", "b", "y"]
				.iter()
				.map(|id| (id.to_string(), ApplicationInfo::default()))
				.collect(),
			dependencies: [("x", "a"), ("b", "x"), ("a", "y")]
				.iter()
				.map(|(c, p)| Dependency {
					consumer: c.to_string(),
					provider: p.to_string(),
					..Default::default()
				})
				.collect(),
		};
		build_graph(&data, None, DuplicatePolicy::default()).adjacency()
	}

	#[test]
	fn hovered_node_and_direct_neighbours_stay_emphasized() {
		let adjacency = adjacency();
		let hovered = Some("x");
		assert!(is_emphasized(hovered, "x", &adjacency));
		assert!(is_emphasized(hovered, "a", &adjacency));
		assert!(is_emphasized(hovered, "b", &adjacency));
		assert!(!is_emphasized(hovered, "y", &adjacency), "two hops away is dimmed");
	}

	#[test]
	fn nothing_is_dimmed_without_hover() {
		let adjacency = adjacency();
		for node in ["x", "a", "b", "y"] {
			assert!(is_emphasized(None, node, &adjacency));
		}
	}

	#[test]
	fn stale_hover_id_dims_everything_else() {
		let adjacency = adjacency();
		assert!(!is_emphasized(Some("gone"), "x", &adjacency));
		assert!(is_emphasized(Some("gone"), "gone", &adjacency));
	}

	#[test]
	fn edges_touching_hovered_node() {
		assert!(is_edge_emphasized(Some("x"), "x", "a"));
		assert!(is_edge_emphasized(Some("x"), "b", "x"));
		assert!(!is_edge_emphasized(Some("x"), "a", "y"));
		assert!(is_edge_emphasized(None, "a", "y"));
	}

	#[test]
	fn dim_fade_converges() {
		let mut fade = DimFade::default();
		for _ in 0..120 {
			fade.tick(true, 0.016);
		}
		assert_eq!(fade.level(), 1.0);
		for _ in 0..120 {
			fade.tick(false, 0.016);
		}
		assert_eq!(fade.level(), 0.0);
	}
}
