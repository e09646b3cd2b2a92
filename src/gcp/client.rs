//! Compute Client
//!
//! Authenticated handle for the Compute Engine API, combining credentials
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Public Compute Engine v1 endpoint
pub const COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1/";

/// Compute Engine client bound to a project and zone
#[derive(Clone)]
pub struct ComputeClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub zone: String,
    endpoint: Url,
}

impl ComputeClient {
    /// Create a client against the public Compute Engine endpoint
    pub fn new(credentials: GcpCredentials, project_id: &str, zone: &str) -> Result<Self> {
        Self::with_endpoint(credentials, project_id, zone, COMPUTE_ENDPOINT)
    }

    /// Create a client against a custom endpoint (emulators, mock servers)
    pub fn with_endpoint(
        credentials: GcpCredentials,
        project_id: &str,
        zone: &str,
        endpoint: &str,
    ) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            zone: zone.to_string(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to the Compute API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to the Compute API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Get the region from the current zone
    pub fn get_region(&self) -> String {
        match self.zone.rsplit_once('-') {
            Some((region, _)) => region.to_string(),
            None => self.zone.clone(),
        }
    }

    /// Build a project-scoped Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        format!(
            "{}projects/{}/{}",
            self.endpoint,
            urlencoding::encode(&self.project_id),
            path
        )
    }

    /// Build a zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, resource: &str) -> String {
        self.compute_url(&format!(
            "zones/{}/{}",
            urlencoding::encode(&self.zone),
            resource
        ))
    }
}

/// Parse an endpoint, making sure its path ends with `/` so joins append
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).with_context(|| format!("Invalid compute endpoint: {}", raw))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
