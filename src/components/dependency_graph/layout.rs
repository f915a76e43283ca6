//! Hierarchical layout for dependency graphs.
//!
//! [`LayeredLayout`] implements a Sugiyama-style layered layout:
//!   1. Cycle breaking (depth-first, back edges reversed)
//!   2. Layer assignment (longest path, sources pulled towards their targets)
//!   3. Dummy nodes on edges spanning several layers
//!   4. Ordering within layers (iterated barycenter crossing minimization)
//!   5. Balanced coordinate assignment (averaged alignments, overlap removal)
//!
//! The console always uses [`LayoutOptions::default`]: left-to-right layers,
//! orthogonal edge routing, 200 units between layers and 100 units between
//! nodes of one layer. Output is deterministic.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use thiserror::Error;

use super::model::GraphModel;

/// Width and height used for nodes that do not declare their size.
pub const DEFAULT_NODE_SIZE: f64 = 30.0;
/// Gap between consecutive layers.
pub const LAYER_SPACING: f64 = 200.0;
/// Gap between neighbouring nodes of one layer.
pub const NODE_SPACING: f64 = 100.0;

const MAX_SWEEPS: usize = 24;
const SWEEP_PATIENCE: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Algorithm {
	#[default]
	Layered,
}

/// Direction in which layers advance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(dead_code, reason = "Left/Down/Up are supported by the engine; the console only flows right")]
pub enum Direction {
	#[default]
	Right,
	Left,
	Down,
	Up,
}

impl Direction {
	fn is_horizontal(self) -> bool {
		matches!(self, Direction::Right | Direction::Left)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgeRouting {
	#[default]
	Orthogonal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(dead_code, reason = "Packed placement is kept for debugging layouts")]
pub enum NodePlacement {
	/// Average of predecessor- and successor-aligned placements.
	#[default]
	Balanced,
	/// Nodes packed and centred per layer, ignoring neighbours.
	Packed,
}

/// Named options passed to the layout engine.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOptions {
	pub algorithm: Algorithm,
	pub direction: Direction,
	pub edge_routing: EdgeRouting,
	pub layer_spacing: f64,
	pub node_spacing: f64,
	pub node_placement: NodePlacement,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			algorithm: Algorithm::Layered,
			direction: Direction::Right,
			edge_routing: EdgeRouting::Orthogonal,
			layer_spacing: LAYER_SPACING,
			node_spacing: NODE_SPACING,
			node_placement: NodePlacement::Balanced,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
	pub id: String,
	pub width: Option<f64>,
	pub height: Option<f64>,
}

impl LayoutNode {
	fn size(&self) -> (f64, f64) {
		(
			self.width.unwrap_or(DEFAULT_NODE_SIZE),
			self.height.unwrap_or(DEFAULT_NODE_SIZE),
		)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutEdge {
	pub source: String,
	pub target: String,
}

/// Input to a layout pass.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutRequest {
	pub nodes: Vec<LayoutNode>,
	pub edges: Vec<LayoutEdge>,
	pub options: LayoutOptions,
}

impl LayoutRequest {
	/// Builds a request from a graph model; every node gets `node_size` if given.
	pub fn from_model(model: &GraphModel, node_size: Option<(f64, f64)>) -> Self {
		Self {
			nodes: model
				.nodes
				.iter()
				.map(|n| LayoutNode {
					id: n.id.clone(),
					width: node_size.map(|s| s.0),
					height: node_size.map(|s| s.1),
				})
				.collect(),
			edges: model
				.edges
				.iter()
				.map(|e| LayoutEdge {
					source: e.source().to_string(),
					target: e.target().to_string(),
				})
				.collect(),
			options: LayoutOptions::default(),
		}
	}
}

/// Top-left corner assigned to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePosition {
	pub id: String,
	pub x: f64,
	pub y: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResponse {
	pub positions: Vec<NodePosition>,
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
	#[error("duplicate node id `{0}`")]
	DuplicateNode(String),
	#[error("edge {from} -> {to} references an unknown node")]
	UnknownEndpoint { from: String, to: String },
	#[error("node `{0}` has an invalid size")]
	InvalidSize(String),
	#[error("spacing must be finite and non-negative")]
	InvalidSpacing,
	#[error("layout engine failed: {0}")]
	Engine(String),
}

/// A hierarchical layout algorithm.
pub trait LayoutEngine {
	fn compute(&self, request: &LayoutRequest) -> Result<LayoutResponse, LayoutError>;
}

/// Layered (Sugiyama) layout engine.
#[derive(Clone, Debug, Default)]
pub struct LayeredLayout;

/// A laid out graph handed to the renderer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaidOutGraph {
	pub model: GraphModel,
	/// Set when layout failed and every node sits at the origin.
	pub degraded: bool,
}

/// Runs the engine for `model` and returns a copy with positions applied.
pub async fn run_layout<E: LayoutEngine + ?Sized>(
	engine: &E,
	model: &GraphModel,
	node_size: Option<(f64, f64)>,
) -> Result<GraphModel, LayoutError> {
	let request = LayoutRequest::from_model(model, node_size);
	let response = engine.compute(&request)?;
	Ok(apply_positions(model, &response))
}

/// Like [`run_layout`], but falls back to origin positions on failure.
pub async fn layout_or_origin<E: LayoutEngine + ?Sized>(
	engine: &E,
	model: &GraphModel,
	node_size: Option<(f64, f64)>,
) -> LaidOutGraph {
	match run_layout(engine, model, node_size).await {
		Ok(model) => LaidOutGraph {
			model,
			degraded: false,
		},
		Err(e) => {
			warn!("cosmos-graph: layout failed, drawing nodes at origin: {}", e);
			let mut model = model.clone();
			for node in &mut model.nodes {
				node.x = 0.0;
				node.y = 0.0;
			}
			LaidOutGraph {
				model,
				degraded: true,
			}
		}
	}
}

/// Copies `model`, overwriting the coordinates of every positioned node.
pub fn apply_positions(model: &GraphModel, response: &LayoutResponse) -> GraphModel {
	let by_id: HashMap<&str, &NodePosition> = response
		.positions
		.iter()
		.map(|p| (p.id.as_str(), p))
		.collect();
	let mut model = model.clone();
	for node in &mut model.nodes {
		if let Some(p) = by_id.get(node.id.as_str()) {
			node.x = p.x;
			node.y = p.y;
		}
	}
	model
}

/// Working graph: real nodes first, then dummies. Edges point from lower to
/// higher layers once cycles are broken.
struct LayerGraph {
	/// Extent along the layer axis (width when flowing horizontally).
	depth: Vec<f64>,
	/// Extent along the order axis.
	breadth: Vec<f64>,
	/// Deterministic tie-break key.
	key: Vec<usize>,
	succ: Vec<Vec<usize>>,
	pred: Vec<Vec<usize>>,
	real: usize,
}

impl LayerGraph {
	fn len(&self) -> usize {
		self.depth.len()
	}

	fn is_dummy(&self, v: usize) -> bool {
		v >= self.real
	}

	fn push_vertex(&mut self, depth: f64, breadth: f64) -> usize {
		let v = self.len();
		self.depth.push(depth);
		self.breadth.push(breadth);
		self.key.push(v);
		self.succ.push(Vec::new());
		self.pred.push(Vec::new());
		v
	}

	fn link(&mut self, u: usize, v: usize) {
		self.succ[u].push(v);
		self.pred[v].push(u);
	}
}

impl LayoutEngine for LayeredLayout {
	fn compute(&self, request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
		let options = &request.options;
		for spacing in [options.layer_spacing, options.node_spacing] {
			if !spacing.is_finite() || spacing < 0.0 {
				return Err(LayoutError::InvalidSpacing);
			}
		}

		let mut index: HashMap<&str, usize> = HashMap::with_capacity(request.nodes.len());
		let mut sizes = Vec::with_capacity(request.nodes.len());
		for (i, node) in request.nodes.iter().enumerate() {
			if index.insert(node.id.as_str(), i).is_some() {
				return Err(LayoutError::DuplicateNode(node.id.clone()));
			}
			let (w, h) = node.size();
			if !(w.is_finite() && h.is_finite() && w >= 0.0 && h >= 0.0) {
				return Err(LayoutError::InvalidSize(node.id.clone()));
			}
			sizes.push((w, h));
		}

		let mut edges = Vec::with_capacity(request.edges.len());
		for edge in &request.edges {
			match (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
				(Some(&u), Some(&v)) => {
					if u != v {
						edges.push((u, v));
					}
				}
				_ => {
					return Err(LayoutError::UnknownEndpoint {
						from: edge.source.clone(),
						to: edge.target.clone(),
					});
				}
			}
		}

		let n = request.nodes.len();
		if n == 0 {
			return Ok(LayoutResponse::default());
		}

		// Sorted id order drives every tie-break.
		let mut by_id: Vec<usize> = (0..n).collect();
		by_id.sort_by(|&a, &b| request.nodes[a].id.cmp(&request.nodes[b].id));
		let mut id_rank = vec![0usize; n];
		for (r, &v) in by_id.iter().enumerate() {
			id_rank[v] = r;
		}

		let acyclic = break_cycles(n, &edges, &by_id, &id_rank);
		let ranks = assign_layers(n, &acyclic, &id_rank);

		let horizontal = options.direction.is_horizontal();
		let mut graph = LayerGraph {
			depth: Vec::with_capacity(n),
			breadth: Vec::with_capacity(n),
			key: id_rank.clone(),
			succ: vec![Vec::new(); n],
			pred: vec![Vec::new(); n],
			real: n,
		};
		for &(w, h) in &sizes {
			let (depth, breadth) = if horizontal { (w, h) } else { (h, w) };
			graph.depth.push(depth);
			graph.breadth.push(breadth);
		}

		let mut layer_of = ranks.clone();
		for &(u, v) in &acyclic {
			let mut prev = u;
			for r in (ranks[u] + 1)..ranks[v] {
				let dummy = graph.push_vertex(0.0, 0.0);
				layer_of.push(r);
				graph.link(prev, dummy);
				prev = dummy;
			}
			graph.link(prev, v);
		}

		let layer_count = layer_of.iter().copied().max().unwrap_or(0) + 1;
		let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
		for v in 0..graph.len() {
			layers[layer_of[v]].push(v);
		}
		for layer in &mut layers {
			layer.sort_by_key(|&v| graph.key[v]);
		}

		let crossings = minimize_crossings(&mut layers, &graph);
		debug!(
			"cosmos-graph: layered {} nodes into {} layers, {} crossings",
			n, layer_count, crossings
		);

		let centers = assign_order_coordinates(&layers, &graph, options);

		// Layer axis: each layer is as deep as its deepest node.
		let mut layer_start = Vec::with_capacity(layer_count);
		let mut cursor = 0.0;
		for layer in &layers {
			let depth = layer.iter().map(|&v| graph.depth[v]).fold(0.0, f64::max);
			layer_start.push((cursor, depth));
			cursor += depth + options.layer_spacing;
		}
		let total_depth = (cursor - options.layer_spacing).max(0.0);

		let mut positions: Vec<NodePosition> = request
			.nodes
			.iter()
			.enumerate()
			.map(|(v, node)| {
				let (start, layer_depth) = layer_start[layer_of[v]];
				let along = start + (layer_depth - graph.depth[v]) / 2.0;
				let across = centers[v] - graph.breadth[v] / 2.0;
				let (x, y) = match options.direction {
					Direction::Right => (along, across),
					Direction::Left => (total_depth - along - graph.depth[v], across),
					Direction::Down => (across, along),
					Direction::Up => (across, total_depth - along - graph.depth[v]),
				};
				NodePosition {
					id: node.id.clone(),
					x,
					y,
				}
			})
			.collect();

		let min_x = positions.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
		let min_y = positions.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
		for p in &mut positions {
			p.x -= min_x;
			p.y -= min_y;
		}

		Ok(LayoutResponse { positions })
	}
}

/// Returns the edge set with every back edge of a depth-first search reversed.
fn break_cycles(
	n: usize,
	edges: &[(usize, usize)],
	by_id: &[usize],
	id_rank: &[usize],
) -> Vec<(usize, usize)> {
	let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
	for &(u, v) in edges {
		succ[u].push(v);
	}
	for list in &mut succ {
		list.sort_by_key(|&v| id_rank[v]);
		list.dedup();
	}

	// 0 = unvisited, 1 = on stack, 2 = done
	let mut state = vec![0u8; n];
	let mut reversed: HashSet<(usize, usize)> = HashSet::new();
	for &root in by_id {
		if state[root] != 0 {
			continue;
		}
		let mut stack = vec![(root, 0usize)];
		state[root] = 1;
		while let Some(top) = stack.last_mut() {
			let u = top.0;
			if let Some(&v) = succ[u].get(top.1) {
				top.1 += 1;
				match state[v] {
					0 => {
						state[v] = 1;
						stack.push((v, 0));
					}
					1 => {
						reversed.insert((u, v));
					}
					_ => {}
				}
			} else {
				state[u] = 2;
				stack.pop();
			}
		}
	}

	let mut out: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
	let mut seen = HashSet::new();
	for u in 0..n {
		for &v in &succ[u] {
			let edge = if reversed.contains(&(u, v)) { (v, u) } else { (u, v) };
			if seen.insert(edge) {
				out.push(edge);
			}
		}
	}
	out
}

/// Longest-path layering over an acyclic edge set.
///
/// Sources are then pulled right next to their nearest target so a consumer
/// with a single shallow provider does not stretch across the whole graph.
fn assign_layers(n: usize, edges: &[(usize, usize)], id_rank: &[usize]) -> Vec<usize> {
	let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
	let mut in_degree = vec![0usize; n];
	for &(u, v) in edges {
		succ[u].push(v);
		in_degree[v] += 1;
	}

	let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
	queue.sort_by_key(|&v| id_rank[v]);
	let mut ranks = vec![0usize; n];
	let mut order = Vec::with_capacity(n);
	let mut head = 0;
	while head < queue.len() {
		let u = queue[head];
		head += 1;
		order.push(u);
		let mut successors = succ[u].clone();
		successors.sort_by_key(|&v| id_rank[v]);
		for v in successors {
			ranks[v] = ranks[v].max(ranks[u] + 1);
			in_degree[v] -= 1;
			if in_degree[v] == 0 {
				queue.push(v);
			}
		}
	}

	let has_pred: Vec<bool> = {
		let mut flags = vec![false; n];
		for &(_, v) in edges {
			flags[v] = true;
		}
		flags
	};
	for &u in order.iter().rev() {
		if has_pred[u] {
			continue;
		}
		if let Some(min_succ) = succ[u].iter().map(|&v| ranks[v]).min() {
			ranks[u] = min_succ.saturating_sub(1);
		}
	}
	ranks
}

fn positions_of(layers: &[Vec<usize>], len: usize) -> Vec<usize> {
	let mut pos = vec![0usize; len];
	for layer in layers {
		for (i, &v) in layer.iter().enumerate() {
			pos[v] = i;
		}
	}
	pos
}

/// Reorders `layers[r]` by the barycenter of each vertex's neighbours in the
/// adjacent layer. Vertices without such neighbours keep their position.
fn barycenter_sweep(layers: &mut [Vec<usize>], graph: &LayerGraph, r: usize, forward: bool) {
	let pos = positions_of(layers, graph.len());
	let mut scored: Vec<(usize, f64)> = layers[r]
		.iter()
		.map(|&v| {
			let neighbours = if forward { &graph.pred[v] } else { &graph.succ[v] };
			let score = if neighbours.is_empty() {
				pos[v] as f64
			} else {
				neighbours.iter().map(|&u| pos[u] as f64).sum::<f64>() / neighbours.len() as f64
			};
			(v, score)
		})
		.collect();
	scored.sort_by(|a, b| {
		a.1.partial_cmp(&b.1)
			.unwrap_or(std::cmp::Ordering::Equal)
			.then_with(|| graph.key[a.0].cmp(&graph.key[b.0]))
	});
	layers[r] = scored.into_iter().map(|(v, _)| v).collect();
}

fn count_crossings(layers: &[Vec<usize>], graph: &LayerGraph) -> usize {
	let pos = positions_of(layers, graph.len());
	let mut total = 0;
	for layer in layers {
		let mut pairs: Vec<(usize, usize)> = Vec::new();
		for &u in layer {
			for &v in &graph.succ[u] {
				pairs.push((pos[u], pos[v]));
			}
		}
		for i in 0..pairs.len() {
			for j in (i + 1)..pairs.len() {
				let ((a1, b1), (a2, b2)) = (pairs[i], pairs[j]);
				if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
					total += 1;
				}
			}
		}
	}
	total
}

/// Alternating barycenter sweeps, keeping the best ordering seen.
fn minimize_crossings(layers: &mut Vec<Vec<usize>>, graph: &LayerGraph) -> usize {
	let mut best = count_crossings(layers, graph);
	if layers.len() <= 1 || best == 0 {
		return best;
	}
	let mut best_layers = layers.clone();
	let mut stale = 0;

	for _ in 0..MAX_SWEEPS {
		for r in 1..layers.len() {
			barycenter_sweep(layers, graph, r, true);
		}
		for r in (0..layers.len() - 1).rev() {
			barycenter_sweep(layers, graph, r, false);
		}

		let crossings = count_crossings(layers, graph);
		if crossings < best {
			best = crossings;
			best_layers = layers.clone();
			stale = 0;
			if best == 0 {
				break;
			}
		} else {
			stale += 1;
			if stale >= SWEEP_PATIENCE {
				break;
			}
		}
	}

	*layers = best_layers;
	best
}

/// Minimum centre distance between two neighbours of one layer.
fn separation(graph: &LayerGraph, a: usize, b: usize, spacing: f64) -> f64 {
	let gap = if graph.is_dummy(a) || graph.is_dummy(b) {
		spacing / 2.0
	} else {
		spacing
	};
	(graph.breadth[a] + graph.breadth[b]) / 2.0 + gap
}

/// Places one layer as close as possible to `desired` centres without
/// overlaps, keeping the order. Least-squares fit solved by pooling adjacent
/// violators.
fn place_layer(layer: &[usize], desired: &[f64], graph: &LayerGraph, spacing: f64) -> Vec<f64> {
	let mut offsets = Vec::with_capacity(layer.len());
	let mut acc = 0.0;
	for (i, &v) in layer.iter().enumerate() {
		if i > 0 {
			acc += separation(graph, layer[i - 1], v, spacing);
		}
		offsets.push(acc);
	}

	// Blocks of (mean target, weight, length).
	let mut blocks: Vec<(f64, f64, usize)> = Vec::with_capacity(layer.len());
	for (i, &d) in desired.iter().enumerate() {
		blocks.push((d - offsets[i], 1.0, 1));
		while blocks.len() > 1 {
			let (m2, w2, l2) = blocks[blocks.len() - 1];
			let (m1, w1, l1) = blocks[blocks.len() - 2];
			if m1 <= m2 {
				break;
			}
			blocks.truncate(blocks.len() - 2);
			blocks.push(((m1 * w1 + m2 * w2) / (w1 + w2), w1 + w2, l1 + l2));
		}
	}

	let mut out = Vec::with_capacity(layer.len());
	for (mean, _, len) in blocks {
		for _ in 0..len {
			out.push(mean + offsets[out.len()]);
		}
	}
	out
}

fn packed_layer(layer: &[usize], graph: &LayerGraph, spacing: f64) -> Vec<f64> {
	let mut centers = Vec::with_capacity(layer.len());
	let mut acc = 0.0;
	for (i, &v) in layer.iter().enumerate() {
		if i > 0 {
			acc += separation(graph, layer[i - 1], v, spacing);
		}
		centers.push(acc);
	}
	let shift = acc / 2.0;
	centers.iter().map(|c| c - shift).collect()
}

/// One directional alignment pass: each layer follows the mean centre of its
/// neighbours in the layer just processed.
fn aligned_pass(
	layers: &[Vec<usize>],
	graph: &LayerGraph,
	spacing: f64,
	start: &[f64],
	forward: bool,
) -> Vec<f64> {
	let mut centers = start.to_vec();
	let order: Vec<usize> = if forward {
		(1..layers.len()).collect()
	} else {
		(0..layers.len().saturating_sub(1)).rev().collect()
	};
	for r in order {
		let layer = &layers[r];
		let desired: Vec<f64> = layer
			.iter()
			.map(|&v| {
				let neighbours = if forward { &graph.pred[v] } else { &graph.succ[v] };
				if neighbours.is_empty() {
					centers[v]
				} else {
					neighbours.iter().map(|&u| centers[u]).sum::<f64>() / neighbours.len() as f64
				}
			})
			.collect();
		for (&v, c) in layer.iter().zip(place_layer(layer, &desired, graph, spacing)) {
			centers[v] = c;
		}
	}
	centers
}

/// Centre coordinate of every vertex along the order axis.
fn assign_order_coordinates(
	layers: &[Vec<usize>],
	graph: &LayerGraph,
	options: &LayoutOptions,
) -> Vec<f64> {
	let spacing = options.node_spacing;
	let mut packed = vec![0.0; graph.len()];
	for layer in layers {
		for (&v, c) in layer.iter().zip(packed_layer(layer, graph, spacing)) {
			packed[v] = c;
		}
	}
	if options.node_placement == NodePlacement::Packed {
		return packed;
	}

	let down = aligned_pass(layers, graph, spacing, &packed, true);
	let up = aligned_pass(layers, graph, spacing, &packed, false);
	let mut centers = vec![0.0; graph.len()];
	for layer in layers {
		let desired: Vec<f64> = layer.iter().map(|&v| (down[v] + up[v]) / 2.0).collect();
		for (&v, c) in layer.iter().zip(place_layer(layer, &desired, graph, spacing)) {
			centers[v] = c;
		}
	}
	centers
}
