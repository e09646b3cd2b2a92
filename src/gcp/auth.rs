//! GCP Authentication
//!
//! Credentials are resolved through an injectable [`CredentialProvider`].
//! [`AmbientCredentials`] is the production provider and uses Application
//! Default Credentials (service account key, gcloud ADC, metadata server or
//! gcloud CLI). The gcloud configuration helpers at the bottom are only used
//! by the `gcloud-probe` host to pick default project and zone.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// OAuth scope for Compute Engine
pub const COMPUTE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/compute"];

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Something that can mint access tokens for a set of scopes
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self, scopes: &[&str]) -> Result<String>;
}

/// Resolves credentials for the compute client.
///
/// Errors are returned untouched: their `Display` text is what the probe
/// hands back to the foreign caller.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self) -> Result<Arc<dyn TokenSource>>;
}

/// Application Default Credentials resolved from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientCredentials;

#[async_trait]
impl CredentialProvider for AmbientCredentials {
    async fn resolve(&self) -> Result<Arc<dyn TokenSource>> {
        match gcp_auth::provider().await {
            Ok(provider) => {
                tracing::debug!("Resolved ambient GCP credentials");
                Ok(Arc::new(GcpAuthTokenSource { provider }))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to resolve GCP credentials: {}. Run 'gcloud auth application-default login'",
                    e
                );
                Err(e.into())
            }
        }
    }
}

struct GcpAuthTokenSource {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

#[async_trait]
impl TokenSource for GcpAuthTokenSource {
    async fn access_token(&self, scopes: &[&str]) -> Result<String> {
        let token = self
            .provider
            .token(scopes)
            .await
            .context("Failed to get access token")?;
        Ok(token.as_str().to_string())
    }
}

/// Resolved credentials with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    source: Arc<dyn TokenSource>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Resolve credentials through `provider`
    pub async fn resolve(provider: &dyn CredentialProvider) -> Result<Self> {
        let source = provider.resolve().await?;
        Ok(Self::new(source))
    }

    /// Get an access token for API calls, reusing the cached one while valid
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self.source.access_token(COMPUTE_SCOPES).await?;
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }

    /// Drop the cached token and fetch a fresh one
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}

// =========================================================================
// gcloud configuration defaults
// =========================================================================

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Project IDs must be 6-30 characters of lowercase letters, digits and
/// hyphens, start with a letter and not end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }
    if !project.starts_with(|c: char| c.is_ascii_lowercase()) || project.ends_with('-') {
        return false;
    }
    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Default project: environment first, then the gcloud config files
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }
    default_project_in(&get_gcloud_config_dir()?)
}

/// Default zone: `CLOUDSDK_COMPUTE_ZONE`, then the active gcloud configuration
pub fn get_default_zone() -> Option<String> {
    if let Ok(zone) = std::env::var("CLOUDSDK_COMPUTE_ZONE") {
        return Some(zone);
    }
    default_zone_in(&get_gcloud_config_dir()?)
}

/// Read the default project from a gcloud config directory
pub fn default_project_in(config_dir: &Path) -> Option<String> {
    let from_properties = std::fs::read_to_string(config_dir.join("properties"))
        .ok()
        .and_then(|content| ini_value(&content, None, "project"))
        .filter(|p| validate_project_id(p));
    if from_properties.is_some() {
        return from_properties;
    }

    let content = std::fs::read_to_string(active_config_path(config_dir)?).ok()?;
    ini_value(&content, Some("core"), "project").filter(|p| validate_project_id(p))
}

/// Read the default zone from a gcloud config directory
pub fn default_zone_in(config_dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(active_config_path(config_dir)?).ok()?;
    ini_value(&content, Some("compute"), "zone")
}

/// Path of the active named configuration
/// Security: rejects config names that could escape the configurations dir
fn active_config_path(config_dir: &Path) -> Option<PathBuf> {
    let active = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let name = active.trim();
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }
    Some(
        config_dir
            .join("configurations")
            .join(format!("config_{}", name)),
    )
}

/// Look up `key` in an INI-style gcloud file, optionally within `section`
fn ini_value(content: &str, section: Option<&str>, key: &str) -> Option<String> {
    let mut current: Option<&str> = None;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(name.trim());
            continue;
        }
        if section.is_some() && current != section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}
