//! OAuth2 client lifecycle: registration, metadata updates, secret rotation
//! and revocation.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    ClientChanges, ClientMetadata, ClientType, OAuthClient, StoredSecret, UserIdentity,
};
use crate::rbac::{self, PermissionRequest, Resource};
use crate::services::credentials::{
    generate_client_id, generate_client_secret, MAX_CREDENTIAL_ATTEMPTS,
};
use crate::services::error::StoreError;
use crate::services::store::ClientStore;
use crate::services::ServiceError;
use crate::utils::validation::{is_absolute_url, is_valid_email, is_valid_redirect_uri};
use crate::utils::{hash_secret, verify_secret, ClientSecret};

/// A client together with the plaintext secret issued for it. Only ever
/// produced by registration.
#[derive(Debug)]
pub struct IssuedClient {
    pub client: OAuthClient,
    pub client_secret: ClientSecret,
}

#[derive(Clone)]
pub struct ClientRegistry {
    store: Arc<dyn ClientStore>,
    scope_catalog: Arc<[String]>,
}

impl ClientRegistry {
    pub fn new(store: Arc<dyn ClientStore>, scope_catalog: Vec<String>) -> Self {
        Self {
            store,
            scope_catalog: scope_catalog.into(),
        }
    }

    pub async fn register(
        &self,
        actor: &UserIdentity,
        metadata: ClientMetadata,
    ) -> Result<IssuedClient, ServiceError> {
        rbac::require(actor, Resource::Oauth, &["create"])?;
        let metadata = self.validate_registration(metadata)?;

        for attempt in 1..=MAX_CREDENTIAL_ATTEMPTS {
            let secret = ClientSecret::new(generate_client_secret());
            let now = Utc::now();
            let client = OAuthClient {
                id: Uuid::new_v4(),
                client_id: generate_client_id(),
                client_secret_hash: hash_secret(&secret)?,
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                redirect_uris: metadata.redirect_uris.clone(),
                scopes: metadata.scopes.clone(),
                client_uri: metadata.client_uri.clone(),
                contacts: metadata.contacts.clone(),
                policy_uri: metadata.policy_uri.clone(),
                tos_uri: metadata.tos_uri.clone(),
                client_type: ClientType::Web.to_string(),
                owner_id: actor.id,
                disabled: false,
                created_at: now,
                updated_at: now,
            };

            match self.store.insert_client(&client, &secret.digest()).await {
                Ok(()) => {
                    tracing::info!(
                        client_id = %client.client_id,
                        owner_id = %client.owner_id,
                        name = %client.name,
                        "OAuth client registered"
                    );
                    metrics::counter!("oauth_clients_registered_total").increment(1);
                    return Ok(IssuedClient {
                        client,
                        client_secret: secret,
                    });
                }
                Err(StoreError::Conflict(constraint)) => {
                    tracing::warn!(
                        attempt,
                        constraint = %constraint,
                        "Generated client credentials collided, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(
            "Could not allocate unique client credentials".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: &UserIdentity,
        client_id: &str,
        changes: ClientChanges,
    ) -> Result<OAuthClient, ServiceError> {
        rbac::require(actor, Resource::Oauth, &["update"])?;
        let changes = self.validate_changes(changes)?;

        // Nothing to write; leave updated_at alone.
        if changes.is_empty() {
            return self
                .store
                .find_client(client_id)
                .await?
                .filter(|client| !client.disabled)
                .ok_or(ServiceError::NotFound("Client"));
        }

        let client = self
            .store
            .update_client(client_id, &changes, Utc::now())
            .await?
            .ok_or(ServiceError::NotFound("Client"))?;

        tracing::info!(
            client_id = %client_id,
            actor_id = %actor.id,
            "OAuth client updated"
        );
        Ok(client)
    }

    /// Issue a fresh secret; the previous one stops verifying immediately.
    pub async fn regenerate_secret(
        &self,
        actor: &UserIdentity,
        client_id: &str,
    ) -> Result<ClientSecret, ServiceError> {
        rbac::require(actor, Resource::Oauth, &["update"])?;

        for attempt in 1..=MAX_CREDENTIAL_ATTEMPTS {
            let secret = ClientSecret::new(generate_client_secret());
            let stored = StoredSecret {
                hash: hash_secret(&secret)?,
                digest: secret.digest(),
            };

            match self
                .store
                .replace_client_secret(client_id, &stored, Utc::now())
                .await
            {
                Ok(true) => {
                    tracing::info!(
                        client_id = %client_id,
                        actor_id = %actor.id,
                        "OAuth client secret rotated"
                    );
                    return Ok(secret);
                }
                Ok(false) => return Err(ServiceError::NotFound("Client")),
                Err(StoreError::Conflict(constraint)) => {
                    tracing::warn!(
                        attempt,
                        constraint = %constraint,
                        "Generated client secret collided, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(
            "Could not allocate a unique client secret".to_string(),
        ))
    }

    /// Disable the client and drop its outstanding grants.
    ///
    /// Owners may revoke their own clients with `oauth:delete-self`. A caller
    /// without `oauth:delete` learns nothing about clients they do not own.
    pub async fn revoke(&self, actor: &UserIdentity, client_id: &str) -> Result<(), ServiceError> {
        let can_delete_any = rbac::has_permission(
            actor.roles.iter().map(String::as_str),
            &PermissionRequest::new().with(Resource::Oauth, &["delete"]),
        );

        if !can_delete_any {
            rbac::require(actor, Resource::Oauth, &["delete-self"])?;
            let owned = self
                .store
                .find_client(client_id)
                .await?
                .is_some_and(|c| c.is_owned_by(actor.id));
            if !owned {
                tracing::warn!(
                    client_id = %client_id,
                    actor_id = %actor.id,
                    "Revocation of client not owned by caller denied"
                );
                return Err(ServiceError::AuthorizationDenied);
            }
        }

        let summary = self
            .store
            .disable_client(client_id, Utc::now())
            .await?
            .ok_or(ServiceError::NotFound("Client"))?;

        tracing::info!(
            client_id = %client_id,
            actor_id = %actor.id,
            access_tokens = summary.access_tokens,
            consents = summary.consents,
            "OAuth client revoked"
        );
        metrics::counter!("oauth_clients_revoked_total").increment(1);
        Ok(())
    }

    pub async fn get(
        &self,
        actor: &UserIdentity,
        client_id: &str,
    ) -> Result<OAuthClient, ServiceError> {
        rbac::require(actor, Resource::Oauth, &["read"])?;
        self.store
            .find_client(client_id)
            .await?
            .ok_or(ServiceError::NotFound("Client"))
    }

    pub async fn list(
        &self,
        actor: &UserIdentity,
        owner: Option<Uuid>,
    ) -> Result<Vec<OAuthClient>, ServiceError> {
        rbac::require(actor, Resource::Oauth, &["read"])?;
        Ok(self.store.list_clients(owner).await?)
    }

    /// Check a presented secret. Unknown and disabled clients never verify.
    pub async fn verify_secret(
        &self,
        client_id: &str,
        secret: &ClientSecret,
    ) -> Result<bool, ServiceError> {
        let Some(client) = self.store.find_client(client_id).await? else {
            return Ok(false);
        };
        if client.disabled {
            return Ok(false);
        }
        Ok(verify_secret(secret, &client.client_secret_hash)?)
    }

    fn validate_registration(&self, metadata: ClientMetadata) -> Result<ClientMetadata, ServiceError> {
        Ok(ClientMetadata {
            name: validate_name(&metadata.name)?,
            description: metadata.description,
            redirect_uris: validate_redirect_uris(metadata.redirect_uris)?,
            scopes: self.validate_scopes(metadata.scopes)?,
            client_uri: validate_optional_url("clientUri", metadata.client_uri)?,
            contacts: validate_contacts(metadata.contacts)?,
            policy_uri: validate_optional_url("policyUri", metadata.policy_uri)?,
            tos_uri: validate_optional_url("tosUri", metadata.tos_uri)?,
        })
    }

    fn validate_changes(&self, changes: ClientChanges) -> Result<ClientChanges, ServiceError> {
        Ok(ClientChanges {
            name: changes.name.as_deref().map(validate_name).transpose()?,
            description: changes.description,
            redirect_uris: changes.redirect_uris.map(validate_redirect_uris).transpose()?,
            scopes: changes
                .scopes
                .map(|scopes| self.validate_scopes(scopes))
                .transpose()?,
        })
    }

    /// Non-empty, drawn from the catalog, duplicates dropped in order.
    fn validate_scopes(&self, scopes: Vec<String>) -> Result<Vec<String>, ServiceError> {
        let mut accepted: Vec<String> = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let scope = scope.trim().to_string();
            if scope.is_empty() {
                continue;
            }
            if !self.scope_catalog.contains(&scope) {
                return Err(ServiceError::validation(
                    "scopes",
                    format!("Unsupported scope: {}", scope),
                ));
            }
            if !accepted.contains(&scope) {
                accepted.push(scope);
            }
        }

        if accepted.is_empty() {
            return Err(ServiceError::validation(
                "scopes",
                "At least one scope is required",
            ));
        }
        Ok(accepted)
    }
}

fn validate_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("name", "Name must not be empty"));
    }
    Ok(name.to_string())
}

fn validate_redirect_uris(uris: Vec<String>) -> Result<Vec<String>, ServiceError> {
    if uris.is_empty() {
        return Err(ServiceError::validation(
            "redirectUris",
            "At least one redirect URI is required",
        ));
    }
    for uri in &uris {
        if !is_valid_redirect_uri(uri) {
            return Err(ServiceError::validation(
                "redirectUris",
                format!("Invalid redirect URI: {}", uri),
            ));
        }
    }
    Ok(uris)
}

fn validate_optional_url(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<String>, ServiceError> {
    match value.map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if is_absolute_url(&v) => Ok(Some(v)),
        Some(v) => Err(ServiceError::validation(field, format!("Invalid URL: {}", v))),
    }
}

fn validate_contacts(contacts: Vec<String>) -> Result<Vec<String>, ServiceError> {
    for contact in &contacts {
        if !is_valid_email(contact) {
            return Err(ServiceError::validation(
                "contacts",
                format!("Invalid contact email: {}", contact),
            ));
        }
    }
    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::{GrantKind, InMemoryStore};

    fn registry() -> (ClientRegistry, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let scopes = ["openid", "profile", "email", "offline_access"]
            .map(String::from)
            .to_vec();
        (ClientRegistry::new(store.clone(), scopes), store)
    }

    fn developer() -> UserIdentity {
        UserIdentity::new("dev@chula.ac.th".into(), "Dev".into(), "dev".into())
            .with_roles(["developer"])
    }

    fn admin() -> UserIdentity {
        UserIdentity::new("root@chula.ac.th".into(), "Root".into(), "root".into())
            .with_roles(["admin", "user"])
    }

    fn metadata() -> ClientMetadata {
        ClientMetadata {
            name: "  Club Portal ".into(),
            redirect_uris: vec!["https://club.example.com/callback".into()],
            scopes: vec!["openid".into(), "email".into(), "openid".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_issues_credentials() {
        let (registry, _) = registry();
        let issued = registry.register(&developer(), metadata()).await.unwrap();

        assert_eq!(issued.client.name, "Club Portal");
        assert_eq!(issued.client.scopes, vec!["openid", "email"]);
        assert!(issued.client.client_id.starts_with("vidya-ci-"));
        assert_eq!(issued.client_secret.as_str().len(), 64);
        assert_ne!(issued.client.client_secret_hash, issued.client_secret.as_str());
    }

    #[tokio::test]
    async fn test_invalid_redirect_persists_nothing() {
        let (registry, store) = registry();
        let mut bad = metadata();
        bad.redirect_uris = vec!["not-a-url".into()];

        let err = registry.register(&developer(), bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "redirectUris", .. }));
        assert_eq!(store.client_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_scope_rejected() {
        let (registry, _) = registry();
        let mut bad = metadata();
        bad.scopes = vec!["admin".into()];
        let err = registry.register(&developer(), bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "scopes", .. }));
    }

    #[tokio::test]
    async fn test_rotation_invalidates_old_secret() {
        let (registry, _) = registry();
        let dev = developer();
        let issued = registry.register(&dev, metadata()).await.unwrap();
        let client_id = issued.client.client_id.clone();

        let rotated = registry.regenerate_secret(&dev, &client_id).await.unwrap();
        assert_ne!(rotated, issued.client_secret);
        assert!(!registry
            .verify_secret(&client_id, &issued.client_secret)
            .await
            .unwrap());
        assert!(registry.verify_secret(&client_id, &rotated).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_secret() {
        let (registry, _) = registry();
        let dev = developer();
        let issued = registry.register(&dev, metadata()).await.unwrap();

        let updated = registry
            .update(
                &dev,
                &issued.client.client_id,
                ClientChanges {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.redirect_uris, issued.client.redirect_uris);
        assert!(registry
            .verify_secret(&issued.client.client_id, &issued.client_secret)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_update_writes_nothing() {
        let (registry, _) = registry();
        let dev = developer();
        let issued = registry.register(&dev, metadata()).await.unwrap();
        let client_id = issued.client.client_id.clone();

        let unchanged = registry
            .update(&dev, &client_id, ClientChanges::default())
            .await
            .unwrap();
        assert_eq!(unchanged.updated_at, issued.client.updated_at);
        assert_eq!(unchanged.name, issued.client.name);

        registry.revoke(&admin(), &client_id).await.unwrap();
        let err = registry
            .update(&dev, &client_id, ClientChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_revoke_cascades_and_blocks_mutation() {
        let (registry, store) = registry();
        let dev = developer();
        let issued = registry.register(&dev, metadata()).await.unwrap();
        let client_id = issued.client.client_id.clone();
        store.seed_grant(&client_id, GrantKind::AccessToken);
        store.seed_grant(&client_id, GrantKind::Consent);

        registry.revoke(&admin(), &client_id).await.unwrap();
        assert_eq!(store.grant_count(&client_id), 0);

        // idempotent
        registry.revoke(&admin(), &client_id).await.unwrap();

        let err = registry.regenerate_secret(&dev, &client_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(!registry
            .verify_secret(&client_id, &issued.client_secret)
            .await
            .unwrap());
        assert!(registry.get(&admin(), &client_id).await.unwrap().disabled);
    }

    #[tokio::test]
    async fn test_revoke_without_delete_grant_reveals_nothing() {
        let (registry, _) = registry();
        let issued = registry.register(&developer(), metadata()).await.unwrap();
        let student = UserIdentity::new("x@chula.ac.th".into(), "X".into(), "x".into())
            .with_roles(["student"]);

        let existing = registry
            .revoke(&student, &issued.client.client_id)
            .await
            .unwrap_err();
        let missing = registry
            .revoke(&student, "vidya-ci-does-not-exist")
            .await
            .unwrap_err();
        assert!(matches!(existing, ServiceError::AuthorizationDenied));
        assert!(matches!(missing, ServiceError::AuthorizationDenied));
    }

    #[tokio::test]
    async fn test_rbac_checked_before_lookup() {
        let (registry, _) = registry();
        let student = UserIdentity::new("s@student.chula.ac.th".into(), "S".into(), "s".into())
            .with_roles(["student"]);
        let err = registry
            .update(&student, "vidya-ci-missing", ClientChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthorizationDenied));
    }
}
