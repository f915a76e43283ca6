//! View state of a laid out graph: pan/zoom transform, edge routes, hit tests.
//!
//! Rebuilt whenever a layout pass completes. The laid out model is only read
//! here; interaction touches the transform and presentation state.

use std::collections::{HashMap, HashSet};

use super::hover::DimFade;
use super::layout::LaidOutGraph;
use super::model::{EdgeId, GraphNode};
use super::scale::ZoomConfig;

/// Horizontal run out of a port before an orthogonal edge turns.
const PORT_STUB: f64 = 24.0;

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Tracks an in-progress canvas pan operation.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	/// Set once the pointer travelled far enough to count as a drag, not a click.
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Orthogonal polyline drawn for one edge, in world coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRoute {
	pub id: EdgeId,
	pub points: Vec<(f64, f64)>,
	pub animated: bool,
}

/// Routes an edge from the right-hand port of `source` to the left-hand port
/// of `target`. Edges that cannot flow rightwards loop below both nodes.
pub fn route_edge(source: &GraphNode, target: &GraphNode, size: (f64, f64)) -> Vec<(f64, f64)> {
	let (w, h) = size;
	let start = (source.x + w, source.y + h / 2.0);
	let end = (target.x, target.y + h / 2.0);

	if end.0 - start.0 >= 2.0 * PORT_STUB {
		let mid_x = (start.0 + end.0) / 2.0;
		if (start.1 - end.1).abs() < f64::EPSILON {
			return vec![start, end];
		}
		return vec![start, (mid_x, start.1), (mid_x, end.1), end];
	}

	let below = source.y.max(target.y) + h + PORT_STUB;
	vec![
		start,
		(start.0 + PORT_STUB, start.1),
		(start.0 + PORT_STUB, below),
		(end.0 - PORT_STUB, below),
		(end.0 - PORT_STUB, end.1),
		end,
	]
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
	let (dx, dy) = (b.0 - a.0, b.1 - a.1);
	let len_sq = dx * dx + dy * dy;
	let t = if len_sq < f64::EPSILON {
		0.0
	} else {
		(((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
	};
	let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
	((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Laid out graph plus everything needed to draw and interact with it.
pub struct GraphViewState {
	pub graph: LaidOutGraph,
	/// Undirected adjacency, used to derive hover emphasis.
	pub adjacency: HashMap<String, HashSet<String>>,
	pub routes: Vec<EdgeRoute>,
	pub node_size: (f64, f64),
	pub transform: ViewTransform,
	pub pan: PanState,
	pub fade: DimFade,
	dim_source: Option<String>,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
}

impl GraphViewState {
	pub fn new(
		graph: LaidOutGraph,
		node_size: (f64, f64),
		width: f64,
		height: f64,
		zoom: &ZoomConfig,
	) -> Self {
		let model = &graph.model;
		let by_id: HashMap<&str, &GraphNode> =
			model.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
		let routes = model
			.edges
			.iter()
			.filter_map(|e| {
				let (source, target) = (by_id.get(e.source())?, by_id.get(e.target())?);
				Some(EdgeRoute {
					id: e.id.clone(),
					points: route_edge(source, target, node_size),
					animated: e.animated,
				})
			})
			.collect();
		let adjacency = model.adjacency();

		let mut state = Self {
			graph,
			adjacency,
			routes,
			node_size,
			transform: ViewTransform::default(),
			pan: PanState::default(),
			fade: DimFade::default(),
			dim_source: None,
			width,
			height,
			flow_time: 0.0,
		};
		state.fit_view(zoom);
		state
	}

	/// World-space bounding box of all nodes and routes.
	pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
		let (w, h) = self.node_size;
		let corners = self
			.graph
			.model
			.nodes
			.iter()
			.flat_map(|n| [(n.x, n.y), (n.x + w, n.y + h)])
			.chain(self.routes.iter().flat_map(|r| r.points.iter().copied()));
		corners.fold(None, |acc, (x, y)| match acc {
			None => Some((x, y, x, y)),
			Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
		})
	}

	/// Centres the graph and zooms so it fits the canvas, never above 100%.
	pub fn fit_view(&mut self, zoom: &ZoomConfig) {
		let Some((x0, y0, x1, y1)) = self.bounds() else {
			self.transform = ViewTransform {
				x: self.width / 2.0,
				y: self.height / 2.0,
				k: 1.0,
			};
			return;
		};
		let avail_w = (self.width - 2.0 * zoom.fit_padding).max(1.0);
		let avail_h = (self.height - 2.0 * zoom.fit_padding).max(1.0);
		let (gw, gh) = ((x1 - x0).max(1.0), (y1 - y0).max(1.0));
		let k = zoom.clamp((avail_w / gw).min(avail_h / gh).min(1.0));
		self.transform = ViewTransform {
			x: self.width / 2.0 - (x0 + x1) / 2.0 * k,
			y: self.height / 2.0 - (y0 + y1) / 2.0 * k,
			k,
		};
	}

	/// Zooms by `factor` around the canvas centre.
	pub fn zoom_by(&mut self, factor: f64, zoom: &ZoomConfig) {
		let (cx, cy) = (self.width / 2.0, self.height / 2.0);
		let new_k = zoom.clamp(self.transform.k * factor);
		let ratio = new_k / self.transform.k;
		self.transform.x = cx - (cx - self.transform.x) * ratio;
		self.transform.y = cy - (cy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&GraphNode> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let (w, h) = self.node_size;
		self.graph
			.model
			.nodes
			.iter()
			.rev()
			.find(|n| gx >= n.x && gx <= n.x + w && gy >= n.y && gy <= n.y + h)
	}

	/// Closest edge within `tolerance` world units of a screen position.
	pub fn edge_at_position(&self, sx: f64, sy: f64, tolerance: f64) -> Option<&EdgeId> {
		let p = self.screen_to_graph(sx, sy);
		self.routes
			.iter()
			.filter_map(|r| {
				let d = r
					.points
					.windows(2)
					.map(|s| distance_to_segment(p, s[0], s[1]))
					.fold(f64::INFINITY, f64::min);
				(d <= tolerance).then_some((d, &r.id))
			})
			.min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
			.map(|(_, id)| id)
	}

	/// Advances animations. While the fade runs out after the pointer leaves a
	/// node, emphasis keeps following the last hovered id.
	pub fn tick(&mut self, dt: f64, hovered: Option<&str>) {
		self.flow_time += dt;
		if let Some(id) = hovered {
			if self.dim_source.as_deref() != Some(id) {
				self.dim_source = Some(id.to_string());
			}
		}
		self.fade.tick(hovered.is_some(), dt);
		if hovered.is_none() && self.fade.level() == 0.0 {
			self.dim_source = None;
		}
	}

	/// Node id emphasis is currently derived from.
	pub fn dim_source(&self) -> Option<&str> {
		self.dim_source.as_deref()
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::components::dependency_graph::model::{DuplicatePolicy, GraphModel, build_graph};
	use crate::components::dependency_graph::scale::ScaleConfig;
	use crate::components::dependency_graph::types::{ApplicationInfo, Dependency, DependencyData};

	fn node(id: &str, x: f64, y: f64) -> GraphNode {
		GraphNode {
			id: id.into(),
			name: None,
			team: None,
			standout: false,
			x,
			y,
		}
	}

	fn placed_model() -> GraphModel {
		let data = DependencyData {
			applications_involved: ["A", "B"]
				.iter()
				.map(|id| (id.to_string(), ApplicationInfo::default()))
				.collect(),
			dependencies: vec![Dependency {
				consumer: "A".into(),
				provider: "B".into(),
				..Default::default()
			}],
		};
		let mut model = build_graph(&data, None, DuplicatePolicy::default());
		model.nodes[1].x = 300.0;
		model.nodes[1].y = 100.0;
		model
	}

	fn view(model: GraphModel) -> GraphViewState {
		let graph = LaidOutGraph {
			model,
			degraded: false,
		};
		let mut state = GraphViewState::new(graph, (100.0, 40.0), 800.0, 600.0, &ScaleConfig::default().zoom);
		state.transform = ViewTransform::default();
		state
	}

	#[test]
	fn forward_edges_route_orthogonally_between_ports() {
		let route = route_edge(&node("a", 0.0, 0.0), &node("b", 300.0, 100.0), (100.0, 40.0));
		assert_eq!(
			route,
			vec![(100.0, 20.0), (200.0, 20.0), (200.0, 120.0), (300.0, 120.0)]
		);
		for seg in route.windows(2) {
			assert!(seg[0].0 == seg[1].0 || seg[0].1 == seg[1].1, "segments are axis aligned");
		}
	}

	#[test]
	fn backward_and_overlapping_edges_loop_below() {
		let route = route_edge(&node("a", 0.0, 0.0), &node("b", 0.0, 0.0), (100.0, 40.0));
		assert_eq!(route.len(), 6);
		assert!(route.iter().all(|p| p.1 <= 64.0));
		assert_eq!(route[2].1, 64.0);
	}

	#[test]
	fn hit_tests_nodes_and_edges() {
		let state = view(placed_model());
		assert_eq!(state.node_at_position(50.0, 20.0).map(|n| n.id.as_str()), Some("A"));
		assert_eq!(state.node_at_position(350.0, 120.0).map(|n| n.id.as_str()), Some("B"));
		assert!(state.node_at_position(250.0, 300.0).is_none());

		let hit = state.edge_at_position(202.0, 70.0, 6.0).cloned();
		assert_eq!(hit, Some(EdgeId::new("A", "B")));
		assert!(state.edge_at_position(240.0, 70.0, 6.0).is_none());
	}

	#[test]
	fn fit_view_centres_the_graph() {
		let mut state = view(placed_model());
		state.fit_view(&ScaleConfig::default().zoom);
		let (x0, y0, x1, y1) = state.bounds().unwrap();
		let centre_x = state.transform.x + (x0 + x1) / 2.0 * state.transform.k;
		let centre_y = state.transform.y + (y0 + y1) / 2.0 * state.transform.k;
		assert!((centre_x - 400.0).abs() < 1e-9);
		assert!((centre_y - 300.0).abs() < 1e-9);
		assert!(state.transform.k <= 1.0);
	}

	#[test]
	fn zoom_keeps_canvas_centre_fixed() {
		let mut state = view(placed_model());
		let zoom = ScaleConfig::default().zoom;
		let before = state.screen_to_graph(400.0, 300.0);
		state.zoom_by(1.2, &zoom);
		let after = state.screen_to_graph(400.0, 300.0);
		assert!((before.0 - after.0).abs() < 1e-9 && (before.1 - after.1).abs() < 1e-9);
		for _ in 0..50 {
			state.zoom_by(1.2, &zoom);
		}
		assert_eq!(state.transform.k, zoom.max_k);
	}

	#[test]
	fn emphasis_source_outlives_hover_until_faded() {
		let mut state = view(placed_model());
		state.tick(0.016, Some("A"));
		assert_eq!(state.dim_source(), Some("A"));
		state.tick(0.016, None);
		assert_eq!(state.dim_source(), Some("A"));
		for _ in 0..200 {
			state.tick(0.016, None);
		}
		assert_eq!(state.dim_source(), None);
	}

	#[test]
	fn origin_fallback_still_routes_every_edge() {
		let mut model = placed_model();
		for n in &mut model.nodes {
			n.x = 0.0;
			n.y = 0.0;
		}
		let state = view(model);
		assert_eq!(state.routes.len(), 1);
		assert_eq!(state.graph.model.nodes.len(), 2);
	}
}
