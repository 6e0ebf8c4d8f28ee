//! OAuth2 client application model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Web,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Web => "web",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered OAuth2 client. Rows are soft-deleted through `disabled`.
#[derive(Debug, Clone, FromRow)]
pub struct OAuthClient {
    pub id: Uuid,
    pub client_id: String,
    /// Argon2 PHC string; the plaintext is never stored.
    pub client_secret_hash: String,
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub client_uri: Option<String>,
    pub contacts: Vec<String>,
    pub policy_uri: Option<String>,
    pub tos_uri: Option<String>,
    pub client_type: String,
    pub owner_id: Uuid,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthClient {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Validated registration metadata, ready to persist.
#[derive(Debug, Clone, Default)]
pub struct ClientMetadata {
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub client_uri: Option<String>,
    pub contacts: Vec<String>,
    pub policy_uri: Option<String>,
    pub tos_uri: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
}

impl ClientChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.redirect_uris.is_none()
            && self.scopes.is_none()
    }

    pub fn apply_to(&self, client: &mut OAuthClient, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        if let Some(description) = &self.description {
            client.description = Some(description.clone());
        }
        if let Some(uris) = &self.redirect_uris {
            client.redirect_uris = uris.clone();
        }
        if let Some(scopes) = &self.scopes {
            client.scopes = scopes.clone();
        }
        client.updated_at = now;
    }
}

/// Hashed form of a freshly issued secret.
#[derive(Debug, Clone)]
pub struct StoredSecret {
    /// Argon2 hash used for verification.
    pub hash: String,
    /// Hex SHA-256 of the plaintext, unique across every secret ever issued.
    pub digest: String,
}

/// Grants removed when a client was revoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevocationSummary {
    pub access_tokens: u64,
    pub consents: u64,
}

/// Client as returned by the admin API. Never carries the secret.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClientResponse {
    pub id: Uuid,
    pub client_id: String,
    pub name: String,
    pub description: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub client_uri: Option<String>,
    pub contacts: Vec<String>,
    pub policy_uri: Option<String>,
    pub tos_uri: Option<String>,
    #[serde(rename = "type")]
    pub client_type: String,
    pub owner_id: Uuid,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OAuthClient> for OAuthClientResponse {
    fn from(c: OAuthClient) -> Self {
        Self {
            id: c.id,
            client_id: c.client_id,
            name: c.name,
            description: c.description,
            redirect_uris: c.redirect_uris,
            scopes: c.scopes,
            client_uri: c.client_uri,
            contacts: c.contacts,
            policy_uri: c.policy_uri,
            tos_uri: c.tos_uri,
            client_type: c.client_type,
            owner_id: c.owner_id,
            disabled: c.disabled,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}
