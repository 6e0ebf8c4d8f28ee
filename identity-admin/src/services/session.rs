//! Session gateway: asks the IdP runtime who owns a session token.

use async_trait::async_trait;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::instrument;

use crate::config::IdpConfig;

/// Where the caller presented their session token.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionCredential {
    Bearer(String),
    Cookie(String),
}

impl SessionCredential {
    pub fn token(&self) -> &str {
        match self {
            SessionCredential::Bearer(t) | SessionCredential::Cookie(t) => t,
        }
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SessionCredential::Bearer(_) => f.write_str("Bearer(***)"),
            SessionCredential::Cookie(_) => f.write_str("Cookie(***)"),
        }
    }
}

#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Resolve a session token to the owning user id.
    ///
    /// `Ok(None)` means the IdP does not recognise the session. `Err` means
    /// the IdP could not be asked.
    async fn resolve_session(
        &self,
        credential: &SessionCredential,
        request_id: Option<&str>,
    ) -> Result<Option<String>, anyhow::Error>;
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    user: SessionUser,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: String,
}

/// HTTP client for the IdP runtime's session endpoint.
#[derive(Clone)]
pub struct IdpSessionClient {
    http: reqwest::Client,
    session_url: String,
    cookie_name: String,
}

impl IdpSessionClient {
    pub fn new(config: &IdpConfig) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build IdP HTTP client: {}", e))?;

        let session_url = format!(
            "{}{}",
            config.base_url.trim_end_matches('/'),
            config.session_path
        );
        tracing::info!(session_url = %session_url, "IdP session gateway configured");

        Ok(Self {
            http,
            session_url,
            cookie_name: config.session_cookie_name.clone(),
        })
    }
}

#[async_trait]
impl SessionGateway for IdpSessionClient {
    #[instrument(skip(self, credential))]
    async fn resolve_session(
        &self,
        credential: &SessionCredential,
        request_id: Option<&str>,
    ) -> Result<Option<String>, anyhow::Error> {
        let request = self.http.traced_get(&self.session_url);
        let request = match credential {
            SessionCredential::Bearer(token) => request.bearer_auth(token),
            SessionCredential::Cookie(token) => {
                request.header("cookie", &format!("{}={}", self.cookie_name, token))
            }
        };

        let response = request
            .send(request_id)
            .await
            .map_err(|e| anyhow::anyhow!("IdP session lookup failed: {}", e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "IdP session lookup returned status {}",
                status
            ));
        }

        let envelope: Option<SessionEnvelope> = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Malformed IdP session response: {}", e))?;

        Ok(envelope.map(|e| e.user.id))
    }
}

/// In-memory gateway for tests.
#[derive(Default)]
pub struct MockSessionGateway {
    sessions: Mutex<HashMap<String, String>>,
    unavailable: Mutex<bool>,
}

impl MockSessionGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: &str, user_id: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(token.to_string(), user_id.to_string());
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut flag) = self.unavailable.lock() {
            *flag = unavailable;
        }
    }
}

#[async_trait]
impl SessionGateway for MockSessionGateway {
    async fn resolve_session(
        &self,
        credential: &SessionCredential,
        _request_id: Option<&str>,
    ) -> Result<Option<String>, anyhow::Error> {
        if *self
            .unavailable
            .lock()
            .map_err(|_| anyhow::anyhow!("mutex poisoned"))?
        {
            return Err(anyhow::anyhow!("IdP unreachable"));
        }
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("mutex poisoned"))?;
        Ok(sessions.get(credential.token()).cloned())
    }
}
