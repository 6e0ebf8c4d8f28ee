//! Credential collision handling in the registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use identity_admin::{
    models::{
        ClientChanges, ClientMetadata, OAuthClient, RevocationSummary, StoredSecret, UserIdentity,
    },
    services::{ClientRegistry, ClientStore, InMemoryStore, ServiceError, StoreError},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Reports a unique-constraint collision on the first `failures` writes of
/// fresh credentials, then delegates.
struct FlakyClientStore {
    inner: InMemoryStore,
    pending_collisions: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyClientStore {
    fn new(failures: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            pending_collisions: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    fn fail_next(&self, failures: usize) {
        self.pending_collisions.store(failures, Ordering::SeqCst);
        self.attempts.store(0, Ordering::SeqCst);
    }

    fn collide(&self) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.pending_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ClientStore for FlakyClientStore {
    async fn insert_client(&self, client: &OAuthClient, digest: &str) -> Result<(), StoreError> {
        if self.collide() {
            return Err(StoreError::Conflict(
                "oauth_applications_client_id_key".to_string(),
            ));
        }
        self.inner.insert_client(client, digest).await
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<OAuthClient>, StoreError> {
        self.inner.find_client(client_id).await
    }

    async fn list_clients(&self, owner: Option<Uuid>) -> Result<Vec<OAuthClient>, StoreError> {
        self.inner.list_clients(owner).await
    }

    async fn update_client(
        &self,
        client_id: &str,
        changes: &ClientChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthClient>, StoreError> {
        self.inner.update_client(client_id, changes, now).await
    }

    async fn replace_client_secret(
        &self,
        client_id: &str,
        secret: &StoredSecret,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if self.collide() {
            return Err(StoreError::Conflict("oauth_secret_history_pkey".to_string()));
        }
        self.inner.replace_client_secret(client_id, secret, now).await
    }

    async fn disable_client(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RevocationSummary>, StoreError> {
        self.inner.disable_client(client_id, now).await
    }
}

fn developer() -> UserIdentity {
    UserIdentity::new("dev@chula.ac.th".into(), "Dev".into(), "dev".into())
        .with_roles(["developer"])
}

fn metadata() -> ClientMetadata {
    ClientMetadata {
        name: "Retry App".into(),
        redirect_uris: vec!["https://retry.example.com/cb".into()],
        scopes: vec!["openid".into()],
        ..Default::default()
    }
}

fn registry(store: Arc<FlakyClientStore>) -> ClientRegistry {
    ClientRegistry::new(store, vec!["openid".to_string(), "profile".to_string()])
}

#[tokio::test]
async fn test_registration_retries_after_collision() {
    let store = Arc::new(FlakyClientStore::new(2));
    let registry = registry(store.clone());

    let issued = registry.register(&developer(), metadata()).await.unwrap();

    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    assert!(store
        .inner
        .find_client(&issued.client.client_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_registration_gives_up_after_three_collisions() {
    let store = Arc::new(FlakyClientStore::new(3));
    let registry = registry(store.clone());

    let err = registry.register(&developer(), metadata()).await.unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(store.inner.client_count(), 0);
}

#[tokio::test]
async fn test_rotation_retries_after_collision() {
    let store = Arc::new(FlakyClientStore::new(0));
    let registry = registry(store.clone());
    let actor = developer();
    let issued = registry.register(&actor, metadata()).await.unwrap();

    store.fail_next(1);
    let secret = registry
        .regenerate_secret(&actor, &issued.client.client_id)
        .await
        .unwrap();
    assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    assert_ne!(secret, issued.client_secret);
    assert!(!registry
        .verify_secret(&issued.client.client_id, &issued.client_secret)
        .await
        .unwrap());
    assert!(registry
        .verify_secret(&issued.client.client_id, &secret)
        .await
        .unwrap());
}
