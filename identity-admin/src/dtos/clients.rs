use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{ClientChanges, ClientMetadata, OAuthClientResponse};
use crate::services::IssuedClient;

/// Dynamic client registration body (snake_case, as sent by the admin
/// dashboard and by RFC 7591 tooling).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterClientRequest {
    #[validate(length(max = 200, message = "Client name is too long"))]
    #[schema(example = "Club Portal")]
    pub client_name: String,

    #[schema(example = "https://club.example.com")]
    pub client_uri: Option<String>,

    #[serde(default)]
    pub contacts: Vec<String>,

    pub policy_uri: Option<String>,
    pub tos_uri: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub metadata: Option<RegistrationMetadata>,

    #[schema(example = "[\"https://club.example.com/callback\"]")]
    pub redirect_uris: Option<Vec<String>>,

    /// Space-separated scope list.
    #[schema(example = "openid profile email")]
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RegistrationMetadata {
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
}

impl RegisterClientRequest {
    /// Top-level `redirect_uris` and `scope` win over their `metadata`
    /// counterparts.
    pub fn into_metadata(self) -> ClientMetadata {
        let metadata = self.metadata.unwrap_or_default();

        let scopes = match self.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => metadata.scopes.unwrap_or_default(),
        };

        ClientMetadata {
            name: self.client_name,
            description: metadata.description.filter(|d| !d.trim().is_empty()),
            redirect_uris: self
                .redirect_uris
                .or(metadata.redirect_uris)
                .unwrap_or_default(),
            scopes,
            client_uri: self.client_uri,
            contacts: self.contacts,
            policy_uri: self.policy_uri,
            tos_uri: self.tos_uri,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterClientResponse {
    #[schema(example = "vidya-ci-0f3a9c2b1d4e5f60718293a4")]
    pub client_id: String,
    /// Shown once; only a hash is kept.
    pub client_secret: String,
    pub client_id_issued_at: i64,
    /// Secrets do not expire.
    pub client_secret_expires_at: i64,
    pub client_name: String,
    pub client_uri: Option<String>,
    pub contacts: Vec<String>,
    pub policy_uri: Option<String>,
    pub tos_uri: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scope: String,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    #[serde(rename = "type")]
    pub client_type: String,
    pub disabled: bool,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResponseMetadata {
    pub description: Option<String>,
}

impl From<IssuedClient> for RegisterClientResponse {
    fn from(issued: IssuedClient) -> Self {
        let c = issued.client;
        Self {
            client_id: c.client_id,
            client_secret: issued.client_secret.into_string(),
            client_id_issued_at: c.created_at.timestamp(),
            client_secret_expires_at: 0,
            client_name: c.name,
            client_uri: c.client_uri,
            contacts: c.contacts,
            policy_uri: c.policy_uri,
            tos_uri: c.tos_uri,
            redirect_uris: c.redirect_uris,
            scope: c.scopes.join(" "),
            grant_types: vec!["authorization_code".into(), "refresh_token".into()],
            response_types: vec!["code".into()],
            token_endpoint_auth_method: "client_secret_basic".into(),
            client_type: c.client_type,
            disabled: c.disabled,
            metadata: ResponseMetadata {
                description: c.description,
            },
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListClientsQuery {
    /// Only clients owned by this user.
    pub owner: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListClientsResponse {
    pub clients: Vec<OAuthClientResponse>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdRequest {
    #[validate(length(min = 1, message = "clientId is required"))]
    #[schema(example = "vidya-ci-0f3a9c2b1d4e5f60718293a4")]
    pub client_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, message = "clientId is required"))]
    pub client_id: String,
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description is too long"))]
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub scopes: Option<Vec<String>>,
}

impl UpdateClientRequest {
    pub fn into_changes(self) -> (String, ClientChanges) {
        (
            self.client_id,
            ClientChanges {
                name: self.name,
                description: self.description,
                redirect_uris: self.redirect_uris,
                scopes: self.scopes,
            },
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateSecretResponse {
    pub client_id: String,
    /// Shown once; the previous secret is already invalid.
    pub client_secret: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifySecretRequest {
    #[validate(length(min = 1, message = "clientId is required"))]
    pub client_id: String,
    #[validate(length(min = 1, message = "clientSecret is required"))]
    pub client_secret: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifySecretResponse {
    pub valid: bool,
}
