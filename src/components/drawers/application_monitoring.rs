//! "Application Monitoring" drawer shown after clicking a node.
//!
//! Fetches run asynchronously; the drawer remembers the ticket of the request
//! it is waiting for and drops any response that does not carry it. Closing
//! the drawer forgets the ticket, so a response arriving afterwards cannot
//! reopen it.

use std::sync::Arc;

use leptos::callback::Callback;
use leptos::either::{Either, EitherOf3};
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::debug;

use super::{Drawer, UNKNOWN_TEAM};
use crate::api::{ApiError, MonitoringBundle, MonitoringClient};
use crate::components::dependency_graph::sequence::{RequestSequencer, Ticket};

#[derive(Clone, Debug, PartialEq)]
pub enum MonitoringState {
	Closed,
	Loading {
		application: String,
	},
	Loaded {
		application: String,
		bundle: MonitoringBundle,
	},
	Errored {
		application: String,
		message: String,
	},
}

impl MonitoringState {
	pub fn application(&self) -> Option<&str> {
		match self {
			MonitoringState::Closed => None,
			MonitoringState::Loading { application }
			| MonitoringState::Loaded { application, .. }
			| MonitoringState::Errored { application, .. } => Some(application),
		}
	}
}

/// State machine behind the drawer: `Closed -> Loading -> Loaded | Errored`.
#[derive(Clone, Debug)]
pub struct MonitoringDrawer {
	state: MonitoringState,
	active: Option<Ticket>,
}

impl Default for MonitoringDrawer {
	fn default() -> Self {
		Self::new()
	}
}

impl MonitoringDrawer {
	pub fn new() -> Self {
		Self {
			state: MonitoringState::Closed,
			active: None,
		}
	}

	pub fn state(&self) -> &MonitoringState {
		&self.state
	}

	/// Starts loading `application`, superseding any request in flight.
	pub fn open(&mut self, application: &str, ticket: Ticket) {
		self.active = Some(ticket);
		self.state = MonitoringState::Loading {
			application: application.to_string(),
		};
	}

	/// Applies a fetch result. Returns `false` and leaves the state untouched
	/// when `ticket` is not the request the drawer is waiting for.
	pub fn resolve(&mut self, ticket: Ticket, result: Result<MonitoringBundle, ApiError>) -> bool {
		if self.active != Some(ticket) {
			return false;
		}
		let MonitoringState::Loading { application } = &self.state else {
			return false;
		};
		let application = application.clone();
		self.active = None;
		self.state = match result {
			Ok(bundle) => MonitoringState::Loaded {
				application,
				bundle,
			},
			Err(e) => MonitoringState::Errored {
				application,
				message: e.to_string(),
			},
		};
		true
	}

	pub fn close(&mut self) {
		self.active = None;
		self.state = MonitoringState::Closed;
	}
}

/// Row of the consumer table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerSummary {
	pub name: String,
	pub team: String,
	pub endpoint_count: usize,
}

/// Consumers of a bundle sorted by name.
pub fn consumer_summaries(bundle: &MonitoringBundle) -> Vec<ConsumerSummary> {
	let mut rows: Vec<ConsumerSummary> = bundle
		.consumers
		.iter()
		.map(|c| ConsumerSummary {
			name: c.name.clone(),
			team: c.team.clone().unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
			endpoint_count: c
				.endpoints
				.as_ref()
				.map(|e| e.values().map(|m| m.len()).sum())
				.unwrap_or(0),
		})
		.collect();
	rows.sort_by(|a, b| a.name.cmp(&b.name));
	rows
}

fn bundle_view(bundle: MonitoringBundle) -> impl IntoView {
	let rows = consumer_summaries(&bundle);
	let consumers = if rows.is_empty() {
		Either::Left(view! { <p class="empty-state">"No consumers reported."</p> })
	} else {
		let body = rows
			.into_iter()
			.map(|row| {
				view! {
					<tr>
						<td>{row.name}</td>
						<td>{row.team}</td>
						<td>{row.endpoint_count}</td>
					</tr>
				}
			})
			.collect_view();
		Either::Right(view! {
			<table class="consumer-table">
				<thead>
					<tr><th>"Consumer"</th><th>"Team"</th><th>"Endpoints"</th></tr>
				</thead>
				<tbody>{body}</tbody>
			</table>
		})
	};
	let spec = match bundle.open_api_specification {
		Some(spec) => Either::Left(view! {
			<details class="openapi-spec">
				<summary>"OpenAPI specification"</summary>
				<pre>{spec}</pre>
			</details>
		}),
		None => Either::Right(view! { <p class="muted">"No OpenAPI specification published."</p> }),
	};
	view! {
		<h3>"Consumers"</h3>
		{consumers}
		{spec}
	}
}

/// Drawer with monitoring data for the application in `application`.
///
/// Setting the signal to `None` closes the drawer; `on_close` is called when
/// the user dismisses it.
#[component]
pub fn ApplicationMonitoringDrawer(
	#[prop(into)] application: Signal<Option<String>>,
	client: MonitoringClient,
	#[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
	let drawer = RwSignal::new(MonitoringDrawer::new());
	let sequencer = Arc::new(RequestSequencer::new());

	Effect::new(move |_| match application.get() {
		Some(app) => {
			let ticket = sequencer.issue();
			drawer.update(|d| d.open(&app, ticket));
			let client = client.clone();
			spawn_local(async move {
				let result = client.application(&app).await;
				let applied = drawer.try_update(|d| d.resolve(ticket, result));
				if applied != Some(true) {
					debug!("cosmos-graph: dropping stale monitoring response for {}", app);
				}
			});
		}
		None => drawer.update(MonitoringDrawer::close),
	});

	move || {
		let state = drawer.with(|d| d.state().clone());
		let title = format!("Application Monitoring: {}", state.application()?);
		let body = match state {
			MonitoringState::Closed => return None,
			MonitoringState::Loading { .. } => {
				EitherOf3::A(view! { <p class="loading" role="status">"Loading monitoring data…"</p> })
			}
			MonitoringState::Loaded { bundle, .. } => EitherOf3::B(bundle_view(bundle)),
			MonitoringState::Errored { message, .. } => EitherOf3::C(view! {
				<p class="error" role="alert">{format!("Could not load monitoring data: {}", message)}</p>
			}),
		};
		Some(view! {
			<Drawer title=title on_close=on_close>
				{body}
			</Drawer>
		})
	}
}
