//! Page-level configuration and embedded data.
//!
//! The hosting page passes settings as JSON inside script elements:
//!
//! ```html
//! <script id="cosmos-config" type="application/json">
//!   { "apiBaseUrl": "/api", "mainApplication": "billing", "darkMode": true }
//! </script>
//! ```

use log::{info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

use crate::components::dependency_graph::model::DuplicatePolicy;
use crate::components::dependency_graph::types::DependencyData;

/// Id of the script element holding [`AppConfig`].
pub const CONFIG_ELEMENT_ID: &str = "cosmos-config";
/// Id of the optional script element holding an initial [`DependencyData`].
pub const GRAPH_DATA_ELEMENT_ID: &str = "graph-data";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
	/// Prefix of every monitoring API path.
	pub api_base_url: String,
	/// Application drawn as the standout node. Scopes fetches to its neighbourhood.
	pub main_application: Option<String>,
	pub dark_mode: bool,
	pub duplicate_policy: DuplicatePolicy,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base_url: "/api".to_string(),
			main_application: None,
			dark_mode: false,
			duplicate_policy: DuplicatePolicy::default(),
		}
	}
}

impl AppConfig {
	pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Reads the config script, falling back to defaults when it is missing
	/// or malformed.
	pub fn load() -> Self {
		match script_json::<AppConfig>(CONFIG_ELEMENT_ID) {
			Some(Ok(config)) => {
				info!("cosmos-graph: loaded config, api at {}", config.api_base_url);
				config
			}
			Some(Err(e)) => {
				warn!("cosmos-graph: failed to parse config, using defaults: {}", e);
				Self::default()
			}
			None => Self::default(),
		}
	}
}

/// Loads a dataset embedded in the page, if any.
pub fn load_graph_data() -> Option<DependencyData> {
	match script_json::<DependencyData>(GRAPH_DATA_ELEMENT_ID)? {
		Ok(data) => {
			info!(
				"cosmos-graph: loaded {} applications, {} dependencies",
				data.applications_involved.len(),
				data.dependencies.len()
			);
			Some(data)
		}
		Err(e) => {
			warn!("cosmos-graph: failed to parse graph data: {}", e);
			None
		}
	}
}

/// `None` when the element does not exist, otherwise the parse result.
fn script_json<T: DeserializeOwned>(id: &str) -> Option<Result<T, serde_json::Error>> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;
	Some(serde_json::from_str(&json_text))
}
