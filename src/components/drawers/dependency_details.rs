//! "Dependency Details" drawer shown after clicking an edge.

use std::collections::BTreeMap;

use leptos::callback::Callback;
use leptos::either::Either;
use leptos::prelude::*;

use super::{Drawer, UNKNOWN_TEAM};
use crate::components::dependency_graph::types::{ApplicationInfo, Dependency};

pub const TITLE: &str = "Dependency Details";
pub const EMPTY_MESSAGE: &str = "No endpoint usage was reported for this dependency.";

/// One side of a dependency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Party {
	pub id: String,
	pub name: String,
	pub team: String,
}

impl Party {
	fn new(id: &str, applications: &BTreeMap<String, ApplicationInfo>) -> Self {
		let info = applications.get(id);
		Self {
			id: id.to_string(),
			name: info
				.and_then(|i| i.name.clone())
				.unwrap_or_else(|| id.to_string()),
			team: info
				.and_then(|i| i.team.clone())
				.unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
		}
	}

	/// `name (team)`, as shown in the drawer header rows.
	pub fn summary(&self) -> String {
		format!("{} ({})", self.name, self.team)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodUsage {
	pub method: String,
	pub reasons: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointDetail {
	pub path: String,
	pub methods: Vec<MethodUsage>,
}

/// Everything the drawer shows for one dependency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyDetails {
	pub consumer: Party,
	pub provider: Party,
	pub reasons: Vec<String>,
	/// Sorted by path, then method.
	pub endpoints: Vec<EndpointDetail>,
	pub endpoint_count: usize,
}

impl DependencyDetails {
	pub fn new(dependency: &Dependency, applications: &BTreeMap<String, ApplicationInfo>) -> Self {
		let endpoints = dependency
			.endpoints
			.iter()
			.map(|(path, methods)| EndpointDetail {
				path: path.clone(),
				methods: methods
					.iter()
					.map(|(method, usage)| MethodUsage {
						method: method.clone(),
						reasons: usage.reasons.clone(),
					})
					.collect(),
			})
			.collect();
		Self {
			consumer: Party::new(&dependency.consumer, applications),
			provider: Party::new(&dependency.provider, applications),
			reasons: dependency.reasons.clone(),
			endpoints,
			endpoint_count: dependency.endpoint_count(),
		}
	}

	pub fn has_endpoints(&self) -> bool {
		self.endpoint_count > 0
	}
}

fn endpoint_table(endpoints: Vec<EndpointDetail>) -> impl IntoView {
	let rows = endpoints
		.into_iter()
		.flat_map(|endpoint| {
			let path = endpoint.path;
			endpoint.methods.into_iter().map(move |usage| {
				let reasons = if usage.reasons.is_empty() {
					"-".to_string()
				} else {
					usage.reasons.join(", ")
				};
				view! {
					<tr>
						<td class="endpoint-method">{usage.method}</td>
						<td class="endpoint-path">{path.clone()}</td>
						<td>{reasons}</td>
					</tr>
				}
			})
		})
		.collect_view();
	view! {
		<table class="endpoint-table">
			<thead>
				<tr><th>"Method"</th><th>"Path"</th><th>"Reasons"</th></tr>
			</thead>
			<tbody>{rows}</tbody>
		</table>
	}
}

/// Drawer for the selected dependency. Renders nothing while `details` is `None`.
#[component]
pub fn DependencyDetailsDrawer(
	#[prop(into)] details: Signal<Option<DependencyDetails>>,
	#[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
	move || {
		details.get().map(|d| {
			let reasons = (!d.reasons.is_empty()).then(|| {
				let items = d
					.reasons
					.iter()
					.map(|r| view! { <li>{r.clone()}</li> })
					.collect_view();
				view! {
					<h3>"Reasons"</h3>
					<ul class="dependency-reasons">{items}</ul>
				}
			});
			let endpoints = if d.has_endpoints() {
				Either::Left(endpoint_table(d.endpoints.clone()))
			} else {
				Either::Right(view! { <p class="empty-state">{EMPTY_MESSAGE}</p> })
			};
			view! {
				<Drawer title=TITLE on_close=on_close>
					<dl class="dependency-parties">
						<dt>"Consumer"</dt>
						<dd>{d.consumer.summary()}</dd>
						<dt>"Provider"</dt>
						<dd>{d.provider.summary()}</dd>
					</dl>
					{reasons}
					<h3>{format!("Endpoints ({})", d.endpoint_count)}</h3>
					{endpoints}
				</Drawer>
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::components::dependency_graph::types::{DependencyData, EndpointUsage};

	fn applications(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, ApplicationInfo> {
		entries
			.iter()
			.map(|(id, team)| {
				(
					id.to_string(),
					ApplicationInfo {
						name: None,
						team: team.map(str::to_string),
					},
				)
			})
			.collect()
	}

	#[test]
	fn consumer_and_provider_with_teams() {
		let dependency = Dependency {
			consumer: "A".into(),
			provider: "B".into(),
			reasons: vec!["calls /x".into()],
			..Default::default()
		};
		let details = DependencyDetails::new(
			&dependency,
			&applications(&[("A", Some("t1")), ("B", Some("t2"))]),
		);

		assert_eq!(details.consumer.summary(), "A (t1)");
		assert_eq!(details.provider.summary(), "B (t2)");
		assert_eq!(details.reasons, vec!["calls /x".to_string()]);
		assert!(!details.has_endpoints());
		assert_eq!(details.endpoint_count, 0);
	}

	#[test]
	fn missing_team_or_application_reads_unknown() {
		let dependency = Dependency {
			consumer: "A".into(),
			provider: "ghost".into(),
			..Default::default()
		};
		let details = DependencyDetails::new(&dependency, &applications(&[("A", None)]));
		assert_eq!(details.consumer.team, UNKNOWN_TEAM);
		assert_eq!(details.provider.team, UNKNOWN_TEAM);
		assert_eq!(details.provider.name, "ghost");
	}

	#[test]
	fn display_name_is_preferred_over_id() {
		let mut apps = applications(&[("billing-svc", Some("payments"))]);
		apps.get_mut("billing-svc").unwrap().name = Some("Billing".into());
		let dependency = Dependency {
			consumer: "billing-svc".into(),
			provider: "ledger".into(),
			..Default::default()
		};
		let details = DependencyDetails::new(&dependency, &apps);
		assert_eq!(details.consumer.summary(), "Billing (payments)");
		assert_eq!(details.consumer.id, "billing-svc");
	}

	#[test]
	fn endpoint_breakdown_is_sorted_and_counted() {
		let data: DependencyData = serde_json::from_str(
			r#"{
				"applicationsInvolved": {},
				"dependencies": [{
					"consumer": "A",
					"provider": "B",
					"endpoints": {
						"/users": { "POST": { "reasons": ["signup"] }, "GET": { "reasons": null } },
						"/accounts": { "GET": { "reasons": ["lookup", "audit"] } }
					}
				}]
			}"#,
		)
		.unwrap();
		let details = DependencyDetails::new(&data.dependencies[0], &data.applications_involved);

		assert_eq!(details.endpoint_count, 3);
		assert_eq!(
			details.endpoints,
			vec![
				EndpointDetail {
					path: "/accounts".into(),
					methods: vec![MethodUsage {
						method: "GET".into(),
						reasons: vec!["lookup".into(), "audit".into()],
					}],
				},
				EndpointDetail {
					path: "/users".into(),
					methods: vec![
						MethodUsage {
							method: "GET".into(),
							reasons: vec![],
						},
						MethodUsage {
							method: "POST".into(),
							reasons: vec!["signup".into()],
						},
					],
				},
			]
		);
	}

	#[test]
	fn endpoint_paths_without_methods_count_as_empty() {
		let mut dependency = Dependency {
			consumer: "A".into(),
			provider: "B".into(),
			..Default::default()
		};
		dependency.endpoints.insert("/x".into(), BTreeMap::new());
		let details = DependencyDetails::new(&dependency, &BTreeMap::new());
		assert!(!details.has_endpoints());

		dependency
			.endpoints
			.get_mut("/x")
			.unwrap()
			.insert("GET".into(), EndpointUsage::default());
		assert!(DependencyDetails::new(&dependency, &BTreeMap::new()).has_endpoints());
	}
}
