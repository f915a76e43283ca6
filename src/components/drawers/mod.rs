//! Side drawers opened from the dependency graph.

use leptos::callback::{Callable, Callback};
use leptos::prelude::*;

pub mod application_monitoring;
pub mod dependency_details;

pub use application_monitoring::{ApplicationMonitoringDrawer, MonitoringDrawer, MonitoringState};
pub use dependency_details::{DependencyDetails, DependencyDetailsDrawer};

/// Team label shown when an application has no known owner.
pub const UNKNOWN_TEAM: &str = "Unknown";

/// Shared drawer chrome: a titled panel with a close button.
#[component]
pub fn Drawer(
	#[prop(into)] title: String,
	#[prop(into)] on_close: Callback<()>,
	children: Children,
) -> impl IntoView {
	let label = title.clone();
	view! {
		<aside class="drawer" role="dialog" aria-label=label>
			<header class="drawer-header">
				<h2>{title}</h2>
				<button class="drawer-close" title="Close" on:click=move |_| on_close.run(())>
					"×"
				</button>
			</header>
			<div class="drawer-body">{children()}</div>
		</aside>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drawer_shell_builds_with_title_and_children() {
		let owner = Owner::new();
		owner.with(|| {
			let _drawer = view! {
				<Drawer title="Dependency Details" on_close=|()| {}>
					<p>"body"</p>
				</Drawer>
			};
		});
	}
}
