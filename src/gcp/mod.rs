//! GCP API interaction module
//!
//! Authentication, HTTP plumbing and the Compute Engine client used by the
//! probe.
//!
//! # Module Structure
//!
//! - [`auth`] - Credential providers, token caching and gcloud defaults
//! - [`client`] - Compute Engine client bound to a project and zone
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use gcloud_bridge::gcp::auth::{AmbientCredentials, GcpCredentials};
//! use gcloud_bridge::gcp::client::ComputeClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = GcpCredentials::resolve(&AmbientCredentials).await?;
//!     let client = ComputeClient::new(credentials, "my-project", "us-central1-a")?;
//!     let instances = client.get(&client.compute_zonal_url("instances")).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
