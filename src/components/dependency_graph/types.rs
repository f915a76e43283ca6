//! Wire types for the dependency dataset served by the monitoring API.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display metadata for an application taking part in a dependency graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
	/// Human readable name. Falls back to the application id when absent.
	#[serde(default)]
	pub name: Option<String>,
	/// Owning team.
	#[serde(default)]
	pub team: Option<String>,
}

/// Why a consumer calls one HTTP method of a provider endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointUsage {
	#[serde(default, deserialize_with = "null_as_default")]
	pub reasons: Vec<String>,
}

/// Endpoint path -> HTTP method -> usage.
pub type EndpointMap = BTreeMap<String, BTreeMap<String, EndpointUsage>>;

/// A directed consumer -> provider relationship.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
	pub consumer: String,
	pub provider: String,
	#[serde(default, deserialize_with = "null_as_default")]
	pub reasons: Vec<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub endpoints: EndpointMap,
}

impl Dependency {
	/// Total number of (path, method) pairs declared for this dependency.
	pub fn endpoint_count(&self) -> usize {
		self.endpoints.values().map(BTreeMap::len).sum()
	}
}

/// Complete dependency dataset: participating applications and their edges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyData {
	#[serde(default, deserialize_with = "null_as_default")]
	pub applications_involved: BTreeMap<String, ApplicationInfo>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub dependencies: Vec<Dependency>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_monitoring_payload() {
		let json = r#"{
			"applicationsInvolved": {
				"billing": { "name": "Billing", "team": "payments" },
				"ledger": { "team": "core" }
			},
			"dependencies": [
				{
					"consumer": "billing",
					"provider": "ledger",
					"reasons": ["books invoices"],
					"endpoints": {
						"/entries": { "POST": { "reasons": ["create entry"] }, "GET": {} }
					}
				},
				{ "consumer": "ledger", "provider": "billing", "reasons": null }
			]
		}"#;

		let data: DependencyData = serde_json::from_str(json).unwrap();
		assert_eq!(data.applications_involved.len(), 2);
		assert_eq!(data.applications_involved["ledger"].name, None);
		assert_eq!(data.dependencies[0].endpoint_count(), 2);
		assert_eq!(
			data.dependencies[0].endpoints["/entries"]["POST"].reasons,
			vec!["create entry".to_string()]
		);
		assert!(data.dependencies[1].reasons.is_empty());
		assert!(data.dependencies[1].endpoints.is_empty());
	}

	#[test]
	fn missing_sections_default_to_empty() {
		let data: DependencyData = serde_json::from_str("{}").unwrap();
		assert!(data.applications_involved.is_empty());
		assert!(data.dependencies.is_empty());
	}
}
