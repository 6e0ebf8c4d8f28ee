//! Persistence seams for the registry and the directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    BanState, ClientChanges, OAuthClient, RevocationSummary, StoredSecret, UserIdentity, UserQuery,
};
use crate::services::error::StoreError;

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Persist a new client and record its secret digest.
    ///
    /// Fails with `StoreError::Conflict` when the client id or secret digest
    /// was already issued.
    async fn insert_client(&self, client: &OAuthClient, digest: &str) -> Result<(), StoreError>;

    async fn find_client(&self, client_id: &str) -> Result<Option<OAuthClient>, StoreError>;

    /// All clients, newest first, optionally restricted to one owner.
    async fn list_clients(&self, owner: Option<Uuid>) -> Result<Vec<OAuthClient>, StoreError>;

    /// Apply `changes` to an enabled client. `None` when no enabled client
    /// matches.
    async fn update_client(
        &self,
        client_id: &str,
        changes: &ClientChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthClient>, StoreError>;

    /// Swap in a new secret atomically. `false` when no enabled client
    /// matches.
    async fn replace_client_secret(
        &self,
        client_id: &str,
        secret: &StoredSecret,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Mark the client disabled and delete its outstanding grants in one
    /// transaction. Idempotent; `None` only when the client does not exist.
    async fn disable_client(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RevocationSummary>, StoreError>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with `StoreError::Conflict` on a duplicate email or OUID.
    async fn insert_identity(&self, identity: &UserIdentity) -> Result<(), StoreError>;

    async fn find_identity(&self, id: Uuid) -> Result<Option<UserIdentity>, StoreError>;

    /// Matching identities for the requested page plus the total match count.
    async fn list_identities(
        &self,
        query: &UserQuery,
    ) -> Result<(Vec<UserIdentity>, i64), StoreError>;

    /// Replace the role set. `false` when the identity does not exist.
    async fn set_roles(
        &self,
        id: Uuid,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn set_ban(
        &self,
        id: Uuid,
        state: &BanState,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
