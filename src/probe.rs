//! Compute client probe
//!
//! Resolves credentials and builds a [`ComputeClient`] without issuing any
//! Compute Engine request. Project and zone are carried into the client but
//! nothing is provisioned, started or inspected.

use crate::gcp::auth::{CredentialProvider, GcpCredentials};
use crate::gcp::client::{ComputeClient, COMPUTE_ENDPOINT};
use anyhow::Result;

/// Build an authenticated client against the public Compute endpoint
pub async fn probe(
    provider: &dyn CredentialProvider,
    project_id: &str,
    zone: &str,
) -> Result<ComputeClient> {
    probe_at(provider, project_id, zone, COMPUTE_ENDPOINT).await
}

/// Build an authenticated client against `endpoint`
pub async fn probe_at(
    provider: &dyn CredentialProvider,
    project_id: &str,
    zone: &str,
    endpoint: &str,
) -> Result<ComputeClient> {
    tracing::debug!("Probing compute client for project {} in {}", project_id, zone);

    // The provider's error is returned as-is; its text crosses the C boundary.
    let credentials = GcpCredentials::resolve(provider).await?;
    let client = ComputeClient::with_endpoint(credentials, project_id, zone, endpoint)?;

    tracing::info!(
        "Compute client ready for project {} in {} ({})",
        project_id,
        zone,
        client.endpoint()
    );
    Ok(client)
}

/// Probe outcome as the boundary reports it: empty on success, the error
/// message otherwise
pub async fn probe_message(provider: &dyn CredentialProvider, project_id: &str, zone: &str) -> String {
    match probe(provider, project_id, zone).await {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    }
}

/// Run [`probe_message`] to completion on a private current-thread runtime.
///
/// Each call owns its runtime, so callers on different threads share nothing.
/// When the calling thread already drives a tokio runtime, the private one
/// runs on a scoped thread instead, since `block_on` cannot nest.
pub fn probe_blocking(provider: &dyn CredentialProvider, project_id: &str, zone: &str) -> String {
    if tokio::runtime::Handle::try_current().is_err() {
        return run_private_runtime(provider, project_id, zone);
    }

    tracing::debug!("Caller is inside a tokio runtime, probing on a scoped thread");
    std::thread::scope(|scope| {
        scope
            .spawn(|| run_private_runtime(provider, project_id, zone))
            .join()
            .unwrap_or_else(|_| "Compute client probe thread panicked".to_string())
    })
}

fn run_private_runtime(provider: &dyn CredentialProvider, project_id: &str, zone: &str) -> String {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(probe_message(provider, project_id, zone)),
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            format!("Failed to start async runtime: {}", e)
        }
    }
}
