//! Monitoring API client.
//!
//! The backend is an external collaborator: the client issues plain GETs and
//! decodes JSON. Retries and authentication are left to the hosting console.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::dependency_graph::types::{DependencyData, EndpointMap};

/// Failure while talking to the monitoring API.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("request to {url} failed: {source}")]
	Request {
		url: String,
		#[source]
		source: reqwest::Error,
	},
	#[error("{url} answered HTTP {status}")]
	Status { status: u16, url: String },
	#[error("could not decode response: {0}")]
	Decode(#[from] serde_json::Error),
}

/// A consumer of an application, as listed in its monitoring bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerInfo {
	pub name: String,
	#[serde(default)]
	pub team: Option<String>,
	#[serde(default)]
	pub endpoints: Option<EndpointMap>,
}

/// Monitoring data for one application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringBundle {
	pub application: String,
	/// Raw OpenAPI document published by the application, if any.
	#[serde(default)]
	pub open_api_specification: Option<String>,
	#[serde(default)]
	pub consumers: Vec<ConsumerInfo>,
}

/// Decodes a response body, keeping decode failures distinct from transport ones.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
	Ok(serde_json::from_str(body)?)
}

const DEPENDENCIES_PATH: &str = "/monitoring/dependencies";

/// Path of the dependency graph scoped to `app`. The id is one path segment.
pub fn application_dependencies_path(app: &str) -> String {
	format!("{}/{}", DEPENDENCIES_PATH, urlencoding::encode(app))
}

/// Path of the monitoring bundle of `app`. The id is one path segment.
pub fn application_path(app: &str) -> String {
	format!("/monitoring/applications/{}", urlencoding::encode(app))
}

#[derive(Clone, Debug)]
pub struct MonitoringClient {
	base_url: String,
}

impl MonitoringClient {
	pub fn new(base_url: &str) -> Self {
		Self {
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
		let url = self.url(path);

		let response = reqwest::get(&url).await.map_err(|source| ApiError::Request {
			url: url.clone(),
			source,
		})?;

		if !response.status().is_success() {
			return Err(ApiError::Status {
				status: response.status().as_u16(),
				url,
			});
		}

		let body = response
			.text()
			.await
			.map_err(|source| ApiError::Request { url, source })?;
		decode(&body)
	}

	/// Dependency graph of the whole platform.
	pub async fn dependencies(&self) -> Result<DependencyData, ApiError> {
		self.get(DEPENDENCIES_PATH).await
	}

	/// Dependency graph around one application.
	pub async fn application_dependencies(&self, app: &str) -> Result<DependencyData, ApiError> {
		self.get(&application_dependencies_path(app)).await
	}

	pub async fn application(&self, app: &str) -> Result<MonitoringBundle, ApiError> {
		self.get(&application_path(app)).await
	}
}
