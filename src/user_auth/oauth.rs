//! OAuth identity provider port
//!
//! The provider exchanges a one-time session id for the signed-in identity.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::OAuthConfig;
use crate::error::{CoreError, CoreResult};

/// Identity returned by the provider for a session id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthIdentity {
    /// Provider-side user id
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    /// Becomes the login session's cookie value
    pub session_token: String,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    async fn session_data(&self, session_id: &str) -> CoreResult<OAuthIdentity>;
}

pub struct HttpOAuthProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOAuthProvider {
    pub fn new(endpoint: impl Into<String>) -> CoreResult<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                CoreError::ExternalServiceFailure(format!("Failed to create HTTP client: {}", e))
            })?;
        info!("OAuth session data via {}", endpoint);
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl OAuthProvider for HttpOAuthProvider {
    async fn session_data(&self, session_id: &str) -> CoreResult<OAuthIdentity> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Session-ID", session_id)
            .send()
            .await
            .map_err(|e| CoreError::ExternalServiceFailure(format!("oauth: {}", e)))?;

        // The provider answers non-200 for unknown or stale sessions
        if !response.status().is_success() {
            debug!(status = %response.status(), "OAuth session rejected");
            return Err(CoreError::Unauthenticated);
        }
        response
            .json::<OAuthIdentity>()
            .await
            .map_err(|e| CoreError::ExternalServiceFailure(format!("oauth payload: {}", e)))
    }
}

/// Used when `oauth.endpoint` is not configured
#[derive(Debug, Default)]
pub struct DisabledOAuthProvider;

#[async_trait]
impl OAuthProvider for DisabledOAuthProvider {
    async fn session_data(&self, _session_id: &str) -> CoreResult<OAuthIdentity> {
        Err(CoreError::ExternalServiceFailure(
            "OAuth sign-in is not configured".into(),
        ))
    }
}

/// Fixed session table for tests and local runs
#[derive(Debug, Default)]
pub struct StaticOAuthProvider {
    sessions: DashMap<String, OAuthIdentity>,
}

impl StaticOAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session_id: &str, identity: OAuthIdentity) {
        self.sessions.insert(session_id.to_string(), identity);
    }
}

#[async_trait]
impl OAuthProvider for StaticOAuthProvider {
    async fn session_data(&self, session_id: &str) -> CoreResult<OAuthIdentity> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or(CoreError::Unauthenticated)
    }
}

/// Pick the provider for the configured endpoint
pub fn provider_from_config(config: &OAuthConfig) -> CoreResult<std::sync::Arc<dyn OAuthProvider>> {
    Ok(match &config.endpoint {
        Some(endpoint) => std::sync::Arc::new(HttpOAuthProvider::new(endpoint.clone())?),
        None => std::sync::Arc::new(DisabledOAuthProvider),
    })
}
