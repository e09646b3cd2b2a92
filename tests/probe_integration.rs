//! Integration tests for the compute client probe
//!
//! Credentials are supplied by test doubles and the Compute API is a wiremock
//! server, so these tests never reach Google.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gcloud_bridge::gcp::auth::{CredentialProvider, TokenSource};
use gcloud_bridge::probe::{probe_at, probe_blocking, probe_message};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{bearer_token, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticToken(&'static str);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self, _scopes: &[&str]) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Always resolves to a fixed token
struct AlwaysOk;

#[async_trait]
impl CredentialProvider for AlwaysOk {
    async fn resolve(&self) -> Result<Arc<dyn TokenSource>> {
        Ok(Arc::new(StaticToken("test-token")))
    }
}

/// Always fails with the given message
struct AlwaysFails(&'static str);

#[async_trait]
impl CredentialProvider for AlwaysFails {
    async fn resolve(&self) -> Result<Arc<dyn TokenSource>> {
        Err(anyhow!(self.0))
    }
}

/// Counts how often credentials were resolved
struct Counting {
    resolves: AtomicUsize,
}

#[async_trait]
impl CredentialProvider for Counting {
    async fn resolve(&self) -> Result<Arc<dyn TokenSource>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StaticToken("counted-token")))
    }
}

mod probe_outcome_tests {
    use super::*;

    #[tokio::test]
    async fn test_success_returns_empty_string() {
        let message = probe_message(&AlwaysOk, "test-project", "us-central1-a").await;
        assert_eq!(message, "");
    }

    #[tokio::test]
    async fn test_failure_returns_provider_message_verbatim() {
        let message = probe_message(
            &AlwaysFails("could not find default credentials"),
            "test-project",
            "us-central1-a",
        )
        .await;
        assert_eq!(message, "could not find default credentials");
    }

    #[tokio::test]
    async fn test_credentials_resolved_once_per_probe() {
        let provider = Counting {
            resolves: AtomicUsize::new(0),
        };
        probe_message(&provider, "p-one-project", "us-east1-b").await;
        probe_message(&provider, "p-two-project", "us-east1-c").await;
        assert_eq!(provider.resolves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_carries_project_and_zone() {
        let client = probe_at(&AlwaysOk, "test-project", "europe-west1-b", "http://localhost:1/")
            .await
            .expect("probe should succeed");
        assert_eq!(client.project_id, "test-project");
        assert_eq!(client.zone, "europe-west1-b");
        assert_eq!(client.get_region(), "europe-west1");
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_a_construction_error() {
        let result = probe_at(&AlwaysOk, "test-project", "us-central1-a", "::not-a-url::").await;
        let err = result.err().expect("probe should fail");
        assert!(err.to_string().contains("Invalid compute endpoint"));
    }
}

mod compute_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_issues_no_compute_requests() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(r"/instances/[^/]+/start$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "DONE"})))
            .expect(0)
            .mount(&server)
            .await;

        probe_at(&AlwaysOk, "test-project", "us-central1-a", &server.uri())
            .await
            .expect("probe should succeed");

        let requests = server
            .received_requests()
            .await
            .expect("request recording is enabled");
        assert!(requests.is_empty(), "probe sent {} request(s)", requests.len());
    }

    #[tokio::test]
    async fn test_probed_client_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/projects/test-project/zones/us-central1-a/instances"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"name": "instance-1", "status": "TERMINATED"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = probe_at(&AlwaysOk, "test-project", "us-central1-a", &server.uri())
            .await
            .unwrap();
        let response = client
            .get(&client.compute_zonal_url("instances"))
            .await
            .expect("GET should succeed");

        assert_eq!(response["items"][0]["name"], "instance-1");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Permission denied"}
            })))
            .mount(&server)
            .await;

        let client = probe_at(&AlwaysOk, "restricted-project", "us-central1-a", &server.uri())
            .await
            .unwrap();
        let err = client
            .get(&client.compute_zonal_url("instances"))
            .await
            .expect_err("403 should fail");

        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_empty_post_body_is_null() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/projects/test-project/zones/us-central1-a/instances"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = probe_at(&AlwaysOk, "test-project", "us-central1-a", &server.uri())
            .await
            .unwrap();
        let response = client
            .post(&client.compute_zonal_url("instances"), Some(&json!({})))
            .await
            .unwrap();

        assert!(response.is_null());
    }
}

mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_probes_are_independent() {
        let ok = AlwaysOk;
        let failing = AlwaysFails("metadata server unreachable");

        let probes = (0..32).map(|i| {
            let provider: &dyn CredentialProvider = if i % 2 == 0 { &ok } else { &failing };
            async move { (i, probe_message(provider, "test-project", "us-central1-a").await) }
        });

        for (i, message) in futures::future::join_all(probes).await {
            if i % 2 == 0 {
                assert_eq!(message, "");
            } else {
                assert_eq!(message, "metadata server unreachable");
            }
        }
    }

    #[tokio::test]
    async fn test_blocking_probe_inside_runtime() {
        assert_eq!(probe_blocking(&AlwaysOk, "test-project", "us-central1-a"), "");
        assert_eq!(
            probe_blocking(&AlwaysFails("no ambient credentials"), "test-project", "us-central1-a"),
            "no ambient credentials"
        );
    }

    #[test]
    fn test_blocking_probe_across_threads() {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                std::thread::spawn(move || {
                    let message = if i % 2 == 0 {
                        probe_blocking(&AlwaysOk, "test-project", "us-central1-a")
                    } else {
                        probe_blocking(&AlwaysFails("token endpoint refused"), "test-project", "us-central1-a")
                    };
                    (i, message)
                })
            })
            .collect();

        for handle in handles {
            let (i, message) = handle.join().expect("probe thread panicked");
            let expected = if i % 2 == 0 { "" } else { "token endpoint refused" };
            assert_eq!(message, expected);
        }
    }
}
