//! Builds the abstract dependency graph from a flat dependency dataset.
//!
//! One node is produced per application id (isolated applications included)
//! and one edge per ordered `(consumer, provider)` pair. The builder is pure:
//! the same dataset always yields an equal [`GraphModel`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Deserialize;

use super::types::{ApplicationInfo, Dependency, DependencyData};

/// Identity of an edge: the ordered `(consumer, provider)` pair.
///
/// Displays as `consumer-provider`. Comparisons use the structured pair, so
/// application names containing `-` never alias each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId {
	pub consumer: String,
	pub provider: String,
}

impl EdgeId {
	pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
		Self {
			consumer: consumer.into(),
			provider: provider.into(),
		}
	}

	pub fn of(dependency: &Dependency) -> Self {
		Self::new(dependency.consumer.clone(), dependency.provider.clone())
	}
}

impl fmt::Display for EdgeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.consumer, self.provider)
	}
}

/// How duplicate `(consumer, provider)` records collapse into one edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
	/// The later record replaces the earlier one.
	#[default]
	LastWins,
	/// The first record is kept, later ones are dropped.
	KeepFirst,
	/// Reasons and endpoint usages of every record are merged.
	Merge,
}

/// An application placed in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub name: Option<String>,
	/// `None` when the application is referenced by a dependency but absent
	/// from the involved applications. Displayed as "Unknown".
	pub team: Option<String>,
	/// Marks the focal application. At most one node carries it.
	pub standout: bool,
	pub x: f64,
	pub y: f64,
}

impl GraphNode {
	fn new(id: &str, info: Option<&ApplicationInfo>, standout: bool) -> Self {
		Self {
			id: id.to_string(),
			name: info.and_then(|i| i.name.clone()),
			team: info.and_then(|i| i.team.clone()),
			standout,
			x: 0.0,
			y: 0.0,
		}
	}

	/// Label drawn on the node.
	pub fn label(&self) -> &str {
		self.name.as_deref().unwrap_or(&self.id)
	}
}

/// A dependency drawn as an edge.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	pub id: EdgeId,
	pub dependency: Dependency,
	/// Flowing dash animation, enabled for edges touching the standout node.
	pub animated: bool,
}

impl GraphEdge {
	pub fn source(&self) -> &str {
		&self.id.consumer
	}

	pub fn target(&self) -> &str {
		&self.id.provider
	}
}

/// Nodes and edges ready for layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphModel {
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
}

impl GraphModel {
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn edge(&self, id: &EdgeId) -> Option<&GraphEdge> {
		self.edges.iter().find(|e| &e.id == id)
	}

	/// Dependency record behind a clicked edge. `None` for ids that are not
	/// part of this model, e.g. a click landing on a stale layout.
	pub fn resolve_edge(&self, id: &EdgeId) -> Option<&Dependency> {
		self.edge(id).map(|e| &e.dependency)
	}

	/// Ids of nodes connected to `id` by an edge in either direction.
	pub fn neighbours(&self, id: &str) -> HashSet<&str> {
		let mut out = HashSet::new();
		for edge in &self.edges {
			if edge.source() == id {
				out.insert(edge.target());
			} else if edge.target() == id {
				out.insert(edge.source());
			}
		}
		out
	}

	/// Undirected adjacency list keyed by node id.
	pub fn adjacency(&self) -> HashMap<String, HashSet<String>> {
		let mut adjacency: HashMap<String, HashSet<String>> = self
			.nodes
			.iter()
			.map(|n| (n.id.clone(), HashSet::new()))
			.collect();
		for edge in &self.edges {
			adjacency
				.entry(edge.source().to_string())
				.or_default()
				.insert(edge.target().to_string());
			adjacency
				.entry(edge.target().to_string())
				.or_default()
				.insert(edge.source().to_string());
		}
		adjacency
	}
}

/// Collapses records sharing a `(consumer, provider)` pair.
///
/// The surviving edge keeps the position of the pair's first occurrence.
pub fn collapse_dependencies(
	dependencies: &[Dependency],
	policy: DuplicatePolicy,
) -> Vec<Dependency> {
	let mut slots: HashMap<EdgeId, usize> = HashMap::new();
	let mut out: Vec<Dependency> = Vec::with_capacity(dependencies.len());

	for dependency in dependencies {
		let id = EdgeId::of(dependency);
		match slots.get(&id) {
			None => {
				slots.insert(id, out.len());
				out.push(dependency.clone());
			}
			Some(&slot) => match policy {
				DuplicatePolicy::LastWins => out[slot] = dependency.clone(),
				DuplicatePolicy::KeepFirst => {}
				DuplicatePolicy::Merge => merge_into(&mut out[slot], dependency),
			},
		}
	}
	out
}

fn merge_into(target: &mut Dependency, other: &Dependency) {
	for reason in &other.reasons {
		if !target.reasons.contains(reason) {
			target.reasons.push(reason.clone());
		}
	}
	for (path, methods) in &other.endpoints {
		let merged = target.endpoints.entry(path.clone()).or_default();
		for (method, usage) in methods {
			let slot = merged.entry(method.clone()).or_default();
			for reason in &usage.reasons {
				if !slot.reasons.contains(reason) {
					slot.reasons.push(reason.clone());
				}
			}
		}
	}
}

/// Builds the graph model for one dataset.
///
/// Applications referenced only by a dependency are appended after the
/// involved applications, in first-reference order, with no metadata.
pub fn build_graph(
	data: &DependencyData,
	main_application: Option<&str>,
	policy: DuplicatePolicy,
) -> GraphModel {
	let is_main = |id: &str| main_application == Some(id);

	let mut nodes: Vec<GraphNode> = data
		.applications_involved
		.iter()
		.map(|(id, info)| GraphNode::new(id, Some(info), is_main(id)))
		.collect();

	let known: HashSet<&str> = data.applications_involved.keys().map(String::as_str).collect();
	let mut extra: Vec<&str> = Vec::new();
	for dependency in &data.dependencies {
		for id in [dependency.consumer.as_str(), dependency.provider.as_str()] {
			if !known.contains(id) && !extra.contains(&id) {
				extra.push(id);
			}
		}
	}
	nodes.extend(extra.into_iter().map(|id| GraphNode::new(id, None, is_main(id))));

	let edges = collapse_dependencies(&data.dependencies, policy)
		.into_iter()
		.map(|dependency| GraphEdge {
			id: EdgeId::of(&dependency),
			animated: is_main(&dependency.consumer) || is_main(&dependency.provider),
			dependency,
		})
		.collect();

	GraphModel { nodes, edges }
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use proptest::prelude::*;

	use super::*;
	use crate::components::dependency_graph::types::EndpointUsage;

	fn app(team: &str) -> ApplicationInfo {
		ApplicationInfo {
			name: None,
			team: Some(team.to_string()),
		}
	}

	fn dep(consumer: &str, provider: &str, reasons: &[&str]) -> Dependency {
		Dependency {
			consumer: consumer.to_string(),
			provider: provider.to_string(),
			reasons: reasons.iter().map(|r| r.to_string()).collect(),
			endpoints: Default::default(),
		}
	}

	fn dataset(apps: &[(&str, &str)], deps: Vec<Dependency>) -> DependencyData {
		DependencyData {
			applications_involved: apps.iter().map(|(id, team)| (id.to_string(), app(team))).collect(),
			dependencies: deps,
		}
	}

	#[test]
	fn two_applications_one_dependency() {
		let data = dataset(&[("A", "t1"), ("B", "t2")], vec![dep("A", "B", &["calls /x"])]);
		let model = build_graph(&data, None, DuplicatePolicy::default());

		let ids: Vec<&str> = model.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["A", "B"]);
		assert_eq!(model.edges.len(), 1);
		assert_eq!(model.edges[0].id.to_string(), "A-B");
		assert_eq!(model.edges[0].dependency.reasons, vec!["calls /x".to_string()]);
		assert!(model.nodes.iter().all(|n| (n.x, n.y) == (0.0, 0.0)));
	}

	#[test]
	fn edge_clicks_resolve_to_their_dependency() {
		let data = dataset(&[("A", "t1"), ("B", "t2")], vec![dep("A", "B", &["calls /x"])]);
		let model = build_graph(&data, None, DuplicatePolicy::default());

		let resolved = model.resolve_edge(&EdgeId::new("A", "B")).unwrap();
		assert_eq!(resolved, &data.dependencies[0]);
		assert!(model.resolve_edge(&EdgeId::new("B", "A")).is_none());
		assert!(model.resolve_edge(&EdgeId::new("A", "gone")).is_none());
	}

	#[test]
	fn isolated_applications_without_dependencies() {
		let data = dataset(&[("a", "x"), ("b", "y"), ("c", "z")], vec![]);
		let model = build_graph(&data, None, DuplicatePolicy::default());
		assert_eq!(model.nodes.len(), 3);
		assert!(model.edges.is_empty());
	}

	#[test]
	fn unknown_application_gets_node_without_team() {
		let data = dataset(&[("A", "t1")], vec![dep("A", "ghost", &[])]);
		let model = build_graph(&data, None, DuplicatePolicy::default());

		let ghost = model.node("ghost").expect("node for unknown provider");
		assert_eq!(ghost.team, None);
		assert_eq!(ghost.label(), "ghost");
		assert_eq!(model.nodes.len(), 2);
	}

	#[test]
	fn main_application_is_the_only_standout() {
		let data = dataset(
			&[("A", "t1"), ("B", "t2"), ("C", "t3")],
			vec![dep("A", "B", &[]), dep("B", "C", &[])],
		);
		let model = build_graph(&data, Some("B"), DuplicatePolicy::default());

		let standouts: Vec<&str> = model
			.nodes
			.iter()
			.filter(|n| n.standout)
			.map(|n| n.id.as_str())
			.collect();
		assert_eq!(standouts, vec!["B"]);
		assert!(model.edges.iter().all(|e| e.animated));

		let unfocused = build_graph(&data, Some("A"), DuplicatePolicy::default());
		assert!(unfocused.edge(&EdgeId::new("A", "B")).unwrap().animated);
		assert!(!unfocused.edge(&EdgeId::new("B", "C")).unwrap().animated);
	}

	#[test]
	fn duplicates_collapse_last_wins_by_default() {
		let data = dataset(
			&[("A", "t1"), ("B", "t2")],
			vec![dep("A", "B", &["first"]), dep("B", "A", &[]), dep("A", "B", &["second"])],
		);
		let model = build_graph(&data, None, DuplicatePolicy::LastWins);

		assert_eq!(model.edges.len(), 2);
		assert_eq!(model.edges[0].id, EdgeId::new("A", "B"));
		assert_eq!(model.edges[0].dependency.reasons, vec!["second".to_string()]);
	}

	#[test]
	fn duplicates_keep_first() {
		let deps = vec![dep("A", "B", &["first"]), dep("A", "B", &["second"])];
		let collapsed = collapse_dependencies(&deps, DuplicatePolicy::KeepFirst);
		assert_eq!(collapsed, vec![dep("A", "B", &["first"])]);
	}

	#[test]
	fn duplicates_merge_reasons_and_endpoints() {
		let mut first = dep("A", "B", &["r1", "shared"]);
		first
			.endpoints
			.entry("/x".into())
			.or_default()
			.insert("GET".into(), EndpointUsage { reasons: vec!["read".into()] });
		let mut second = dep("A", "B", &["shared", "r2"]);
		second
			.endpoints
			.entry("/x".into())
			.or_default()
			.insert("POST".into(), EndpointUsage { reasons: vec!["write".into()] });
		second
			.endpoints
			.entry("/y".into())
			.or_default()
			.insert("GET".into(), EndpointUsage::default());

		let collapsed = collapse_dependencies(&[first, second], DuplicatePolicy::Merge);
		assert_eq!(collapsed.len(), 1);
		assert_eq!(collapsed[0].reasons, vec!["r1", "shared", "r2"]);
		assert_eq!(collapsed[0].endpoint_count(), 3);
	}

	#[test]
	fn hyphenated_names_do_not_alias() {
		let data = dataset(
			&[("a-b", "t"), ("c", "t"), ("a", "t"), ("b-c", "t")],
			vec![dep("a-b", "c", &[]), dep("a", "b-c", &[])],
		);
		let model = build_graph(&data, None, DuplicatePolicy::default());
		assert_eq!(model.edges.len(), 2);
		assert_eq!(model.edges[0].id.to_string(), model.edges[1].id.to_string());
	}

	#[test]
	fn neighbours_are_undirected() {
		let data = dataset(
			&[("A", "t"), ("B", "t"), ("C", "t"), ("D", "t")],
			vec![dep("A", "B", &[]), dep("C", "A", &[])],
		);
		let model = build_graph(&data, None, DuplicatePolicy::default());
		let neighbours = model.neighbours("A");
		assert_eq!(neighbours, HashSet::from(["B", "C"]));
		assert!(model.adjacency()["D"].is_empty());
	}

	fn arb_dataset() -> impl Strategy<Value = DependencyData> {
		let ids = prop::collection::btree_set("[a-e]{1,2}", 1..8);
		ids.prop_flat_map(|ids| {
			let ids: Vec<String> = ids.into_iter().collect();
			let pick = prop::sample::select(ids.clone());
			let deps = prop::collection::vec((pick.clone(), pick), 0..20);
			(Just(ids), deps)
		})
		.prop_map(|(ids, pairs)| DependencyData {
			applications_involved: ids.into_iter().map(|id| (id, ApplicationInfo::default())).collect(),
			dependencies: pairs.into_iter().map(|(c, p)| dep(&c, &p, &[])).collect(),
		})
	}

	proptest! {
		#[test]
		fn one_node_per_application(data in arb_dataset()) {
			let model = build_graph(&data, None, DuplicatePolicy::default());
			let ids: Vec<&String> = data.applications_involved.keys().collect();
			let node_ids: Vec<&String> = model.nodes.iter().map(|n| &n.id).collect();
			prop_assert_eq!(node_ids, ids);
		}

		#[test]
		fn one_edge_per_distinct_pair(data in arb_dataset()) {
			let pairs: HashSet<(&str, &str)> = data
				.dependencies
				.iter()
				.map(|d| (d.consumer.as_str(), d.provider.as_str()))
				.collect();
			for policy in [DuplicatePolicy::LastWins, DuplicatePolicy::KeepFirst, DuplicatePolicy::Merge] {
				let model = build_graph(&data, None, policy);
				prop_assert_eq!(model.edges.len(), pairs.len());
			}
		}

		#[test]
		fn building_is_idempotent(data in arb_dataset()) {
			let first = build_graph(&data, Some("a"), DuplicatePolicy::default());
			let second = build_graph(&data, Some("a"), DuplicatePolicy::default());
			prop_assert_eq!(first, second);
		}
	}
}
