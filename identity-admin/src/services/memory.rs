//! In-process store used by tests and local runs without Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    BanState, ClientChanges, OAuthClient, RevocationSummary, StoredSecret, UserIdentity, UserQuery,
};
use crate::services::error::StoreError;
use crate::services::store::{ClientStore, IdentityStore};

/// Kind of grant the IdP runtime keeps per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantKind {
    AccessToken,
    Consent,
}

#[derive(Default)]
struct Tables {
    clients: Vec<OAuthClient>,
    secret_digests: HashSet<String>,
    grants: HashMap<String, Vec<GrantKind>>,
    identities: Vec<UserIdentity>,
}

/// Mirrors the Postgres constraints: unique client id, unique secret digest,
/// unique email and OUID. Every write holds the lock for its whole duration.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable(anyhow::anyhow!("store lock poisoned")))
    }

    /// Record an outstanding grant for `client_id`, as the IdP runtime would.
    pub fn seed_grant(&self, client_id: &str, kind: GrantKind) {
        if let Ok(mut tables) = self.tables.lock() {
            tables
                .grants
                .entry(client_id.to_string())
                .or_default()
                .push(kind);
        }
    }

    pub fn grant_count(&self, client_id: &str) -> usize {
        self.tables
            .lock()
            .map(|t| t.grants.get(client_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn client_count(&self) -> usize {
        self.tables.lock().map(|t| t.clients.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn insert_client(&self, client: &OAuthClient, digest: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.clients.iter().any(|c| c.client_id == client.client_id) {
            return Err(StoreError::Conflict(
                "oauth_applications_client_id_key".to_string(),
            ));
        }
        if tables.secret_digests.contains(digest) {
            return Err(StoreError::Conflict("oauth_secret_history_pkey".to_string()));
        }
        tables.secret_digests.insert(digest.to_string());
        tables.clients.push(client.clone());
        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<OAuthClient>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .clients
            .iter()
            .find(|c| c.client_id == client_id)
            .cloned())
    }

    async fn list_clients(&self, owner: Option<Uuid>) -> Result<Vec<OAuthClient>, StoreError> {
        let tables = self.lock()?;
        let mut clients: Vec<OAuthClient> = tables
            .clients
            .iter()
            .filter(|c| owner.map_or(true, |o| c.owner_id == o))
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clients)
    }

    async fn update_client(
        &self,
        client_id: &str,
        changes: &ClientChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthClient>, StoreError> {
        let mut tables = self.lock()?;
        let Some(client) = tables
            .clients
            .iter_mut()
            .find(|c| c.client_id == client_id && !c.disabled)
        else {
            return Ok(None);
        };
        changes.apply_to(client, now);
        Ok(Some(client.clone()))
    }

    async fn replace_client_secret(
        &self,
        client_id: &str,
        secret: &StoredSecret,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        if tables.secret_digests.contains(&secret.digest) {
            return Err(StoreError::Conflict("oauth_secret_history_pkey".to_string()));
        }
        let Some(client) = tables
            .clients
            .iter_mut()
            .find(|c| c.client_id == client_id && !c.disabled)
        else {
            return Ok(false);
        };
        client.client_secret_hash = secret.hash.clone();
        client.updated_at = now;
        tables.secret_digests.insert(secret.digest.clone());
        Ok(true)
    }

    async fn disable_client(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RevocationSummary>, StoreError> {
        let mut tables = self.lock()?;
        let Some(client) = tables.clients.iter_mut().find(|c| c.client_id == client_id) else {
            return Ok(None);
        };
        client.disabled = true;
        client.updated_at = now;

        let grants = tables.grants.remove(client_id).unwrap_or_default();
        let access_tokens = grants
            .iter()
            .filter(|g| **g == GrantKind::AccessToken)
            .count() as u64;
        Ok(Some(RevocationSummary {
            access_tokens,
            consents: grants.len() as u64 - access_tokens,
        }))
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn insert_identity(&self, identity: &UserIdentity) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.identities.iter().any(|u| u.email == identity.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }
        if tables.identities.iter().any(|u| u.ouid == identity.ouid) {
            return Err(StoreError::Conflict("users_ouid_key".to_string()));
        }
        tables.identities.push(identity.clone());
        Ok(())
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<UserIdentity>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.identities.iter().find(|u| u.id == id).cloned())
    }

    async fn list_identities(
        &self,
        query: &UserQuery,
    ) -> Result<(Vec<UserIdentity>, i64), StoreError> {
        let tables = self.lock()?;
        let mut matched: Vec<&UserIdentity> = tables
            .identities
            .iter()
            .filter(|u| query.matches(u))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn set_roles(
        &self,
        id: Uuid,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        let Some(identity) = tables.identities.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        identity.roles = roles.iter().cloned().collect();
        identity.updated_at = now;
        Ok(true)
    }

    async fn set_ban(
        &self,
        id: Uuid,
        state: &BanState,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        let Some(identity) = tables.identities.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        identity.apply_ban(state, now);
        Ok(true)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str, ouid: &str) -> UserIdentity {
        UserIdentity::new(email.into(), "Test".into(), ouid.into())
    }

    #[tokio::test]
    async fn test_duplicate_ouid_conflicts() {
        let store = InMemoryStore::new();
        store
            .insert_identity(&identity("alice@chula.ac.th", "alice"))
            .await
            .unwrap();
        let err = store
            .insert_identity(&identity("alice@student.chula.ac.th", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(c) if c == "users_ouid_key"));
    }

    #[tokio::test]
    async fn test_paging_reports_total() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .insert_identity(&identity(&format!("u{}@chula.ac.th", i), &format!("u{}", i)))
                .await
                .unwrap();
        }
        let query = UserQuery {
            search: None,
            limit: 2,
            offset: 4,
        };
        let (page, total) = store.list_identities(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(total, 5);
    }
}
