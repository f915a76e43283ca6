//! cosmos-graph: application dependency graph for the Cosmos service catalog.
//!
//! This crate provides a WASM console panel that fetches dependency records
//! from the monitoring API, lays them out left to right and renders them on a
//! canvas with pan/zoom, hover emphasis and detail drawers.

use std::sync::Arc;

use leptos::callback::{Callable, Callback};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::*;
use log::{Level, info, warn};

pub mod api;
pub mod components;
pub mod config;

pub use api::{ApiError, MonitoringBundle, MonitoringClient};
pub use components::dependency_graph::{
	ApplicationInfo, Dependency, DependencyData, DependencyGraph, DuplicatePolicy, EdgeId,
};
pub use components::drawers::{
	ApplicationMonitoringDrawer, DependencyDetails, DependencyDetailsDrawer,
};
pub use config::AppConfig;

use components::dependency_graph::RequestSequencer;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("cosmos-graph: logging initialized");
}

/// Main application component.
///
/// Shows the embedded dataset when the page carries one, otherwise fetches it
/// from the monitoring API. "Refresh" always refetches.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = AppConfig::load();
	let client = MonitoringClient::new(&config.api_base_url);
	let data = RwSignal::new(DependencyData::default());
	let load_error: RwSignal<Option<String>> = RwSignal::new(None);
	let fetching = RwSignal::new(false);
	let selected_dependency: RwSignal<Option<Dependency>> = RwSignal::new(None);
	let selected_application: RwSignal<Option<String>> = RwSignal::new(None);

	let sequencer = Arc::new(RequestSequencer::new());
	let (fetch_client, scope) = (client.clone(), config.main_application.clone());
	let refresh = Callback::new(move |()| {
		let ticket = sequencer.issue();
		let (sequencer, client, scope) = (sequencer.clone(), fetch_client.clone(), scope.clone());
		fetching.set(true);
		spawn_local(async move {
			let result = match scope.as_deref() {
				Some(app) => client.application_dependencies(app).await,
				None => client.dependencies().await,
			};
			if !sequencer.is_current(ticket) {
				return;
			}
			fetching.set(false);
			match result {
				Ok(fresh) => {
					info!(
						"cosmos-graph: fetched {} applications, {} dependencies",
						fresh.applications_involved.len(),
						fresh.dependencies.len()
					);
					load_error.set(None);
					selected_dependency.set(None);
					data.set(fresh);
				}
				Err(e) => {
					warn!("cosmos-graph: failed to fetch dependencies: {}", e);
					load_error.set(Some(e.to_string()));
				}
			}
		});
	});

	match config::load_graph_data() {
		Some(embedded) => data.set(embedded),
		None => refresh.run(()),
	}

	let details = Signal::derive(move || {
		selected_dependency.get().map(|dep| {
			data.with(|d| DependencyDetails::new(&dep, &d.applications_involved))
		})
	});
	let on_edge_click = Callback::new(move |dep: Dependency| {
		selected_application.set(None);
		selected_dependency.set(Some(dep));
	});
	let on_node_click = Callback::new(move |app: String| {
		selected_dependency.set(None);
		selected_application.set(Some(app));
	});

	let theme = if config.dark_mode { "dark" } else { "light" };

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme=theme />
		<Title text="Cosmos Dependencies" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="cosmos-console">
			<header class="toolbar">
				<h1>"Application dependencies"</h1>
				<button
					class="refresh"
					disabled=move || fetching.get()
					on:click=move |_| refresh.run(())
				>
					"Refresh"
				</button>
			</header>
			{move || {
				load_error
					.get()
					.map(|e| {
						view! {
							<p class="error" role="alert">
								{format!("Could not load dependencies: {}", e)}
							</p>
						}
					})
			}}
			<div class="graph-panel">
				<DependencyGraph
					data=data
					main_application=config.main_application.clone()
					dark_mode=config.dark_mode
					duplicate_policy=config.duplicate_policy
					on_edge_click=on_edge_click
					on_node_click=on_node_click
					fetching=fetching
				/>
			</div>
			<DependencyDetailsDrawer
				details=details
				on_close=move |()| selected_dependency.set(None)
			/>
			<ApplicationMonitoringDrawer
				application=selected_application
				client=client
				on_close=move |()| selected_application.set(None)
			/>
		</div>
	}
}
