//! Admin user directory: listing, role assignment, bans and first-sign-in
//! provisioning.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{BanState, UserIdentity, UserQuery, DEFAULT_BAN_REASON};
use crate::rbac::{self, Resource, Role};
use crate::services::reconciler::OuidReconciler;
use crate::services::store::IdentityStore;
use crate::services::ServiceError;

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn IdentityStore>,
    reconciler: OuidReconciler,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn IdentityStore>, reconciler: OuidReconciler) -> Self {
        Self { store, reconciler }
    }

    pub async fn list_users(
        &self,
        actor: &UserIdentity,
        query: &UserQuery,
    ) -> Result<(Vec<UserIdentity>, i64), ServiceError> {
        rbac::require(actor, Resource::User, &["list"])?;
        Ok(self.store.list_identities(query).await?)
    }

    /// Replace the user's role set. Every name must be in the role catalog.
    pub async fn set_role(
        &self,
        actor: &UserIdentity,
        user_id: Uuid,
        roles: Vec<String>,
    ) -> Result<(), ServiceError> {
        rbac::require(actor, Resource::User, &["set-role"])?;

        let mut accepted: Vec<String> = Vec::with_capacity(roles.len());
        for name in roles {
            let role: Role = name
                .trim()
                .parse()
                .map_err(|e: String| ServiceError::validation("role", e))?;
            let name = role.as_str().to_string();
            if !accepted.contains(&name) {
                accepted.push(name);
            }
        }
        if accepted.is_empty() {
            return Err(ServiceError::validation("role", "At least one role is required"));
        }

        if !self.store.set_roles(user_id, &accepted, Utc::now()).await? {
            return Err(ServiceError::NotFound("User"));
        }

        tracing::info!(
            user_id = %user_id,
            actor_id = %actor.id,
            roles = %accepted.join(","),
            "User roles updated"
        );
        Ok(())
    }

    /// Ban a user. Re-banning overwrites reason and expiry.
    pub async fn ban_user(
        &self,
        actor: &UserIdentity,
        user_id: Uuid,
        reason: Option<String>,
        expires_in_seconds: Option<i64>,
    ) -> Result<(), ServiceError> {
        rbac::require(actor, Resource::User, &["ban"])?;

        if user_id == actor.id {
            return Err(ServiceError::validation("userId", "You cannot ban yourself"));
        }

        let now = Utc::now();
        let expires = match expires_in_seconds {
            None => None,
            Some(seconds) if seconds <= 0 => {
                return Err(ServiceError::validation(
                    "banExpiresIn",
                    "Ban expiry must be a positive number of seconds",
                ));
            }
            Some(seconds) => Some(
                Duration::try_seconds(seconds)
                    .and_then(|d| now.checked_add_signed(d))
                    .ok_or_else(|| {
                        ServiceError::validation("banExpiresIn", "Ban expiry is out of range")
                    })?,
            ),
        };

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_BAN_REASON.to_string());

        let state = BanState::Banned { reason, expires };
        if !self.store.set_ban(user_id, &state, now).await? {
            return Err(ServiceError::NotFound("User"));
        }

        tracing::info!(
            user_id = %user_id,
            actor_id = %actor.id,
            expires = ?expires,
            "User banned"
        );
        Ok(())
    }

    pub async fn unban_user(&self, actor: &UserIdentity, user_id: Uuid) -> Result<(), ServiceError> {
        rbac::require(actor, Resource::User, &["ban"])?;

        if !self
            .store
            .set_ban(user_id, &BanState::Active, Utc::now())
            .await?
        {
            return Err(ServiceError::NotFound("User"));
        }

        tracing::info!(user_id = %user_id, actor_id = %actor.id, "User unbanned");
        Ok(())
    }

    /// Create the identity for a first sign-in. The OUID is derived here and
    /// never again.
    pub async fn provision(&self, email: &str, name: &str) -> Result<UserIdentity, ServiceError> {
        let ouid = self.reconciler.derive_ouid(email)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "Name must not be empty"));
        }

        let identity = UserIdentity::new(email.trim().to_string(), name.to_string(), ouid);
        self.store.insert_identity(&identity).await?;

        tracing::info!(
            user_id = %identity.id,
            ouid = %identity.ouid,
            "User identity provisioned"
        );
        metrics::counter!("identities_provisioned_total").increment(1);
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStore;

    async fn setup() -> (UserDirectory, Arc<InMemoryStore>, UserIdentity, UserIdentity) {
        let store = Arc::new(InMemoryStore::new());
        let directory = UserDirectory::new(store.clone(), OuidReconciler::default());

        let admin = UserIdentity::new("root@chula.ac.th".into(), "Root".into(), "root".into())
            .with_roles(["admin"]);
        store.insert_identity(&admin).await.unwrap();
        let target = directory
            .provision("alice@student.chula.ac.th", "Alice")
            .await
            .unwrap();
        (directory, store, admin, target)
    }

    #[tokio::test]
    async fn test_provision_derives_ouid() {
        let (directory, _, _, alice) = setup().await;
        assert_eq!(alice.ouid, "alice");
        assert!(alice.roles.is_empty());

        let carol = directory.provision("carol@gmail.com", "Carol").await.unwrap();
        assert_eq!(carol.ouid, "carol@gmail.com");
    }

    #[tokio::test]
    async fn test_provision_ouid_collision_conflicts() {
        let (directory, _, _, _) = setup().await;
        let err = directory
            .provision("alice@chula.ac.th", "Alice Staff")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_role_validates_catalog() {
        let (directory, store, admin, alice) = setup().await;

        let err = directory
            .set_role(&admin, alice.id, vec!["superuser".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "role", .. }));

        let err = directory.set_role(&admin, alice.id, vec![]).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "role", .. }));

        directory
            .set_role(&admin, alice.id, vec!["student".into(), "staff".into()])
            .await
            .unwrap();
        let stored = store.find_identity(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.roles.len(), 2);
    }

    #[tokio::test]
    async fn test_ban_then_unban() {
        let (directory, store, admin, alice) = setup().await;

        directory
            .ban_user(&admin, alice.id, None, Some(3600))
            .await
            .unwrap();
        let banned = store.find_identity(alice.id).await.unwrap().unwrap();
        assert!(banned.banned);
        assert_eq!(banned.ban_reason.as_deref(), Some("No reason provided"));
        assert!(banned.ban_expires.is_some());

        directory.unban_user(&admin, alice.id).await.unwrap();
        let active = store.find_identity(alice.id).await.unwrap().unwrap();
        assert!(!active.banned);
        assert!(active.ban_reason.is_none());
        assert!(active.ban_expires.is_none());
    }

    #[tokio::test]
    async fn test_ban_rules() {
        let (directory, _, admin, alice) = setup().await;

        let err = directory.ban_user(&admin, admin.id, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "userId", .. }));

        let err = directory
            .ban_user(&admin, alice.id, None, Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "banExpiresIn", .. }));

        let err = directory
            .ban_user(&admin, Uuid::new_v4(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("User")));
    }

    #[tokio::test]
    async fn test_denied_caller_mutates_nothing() {
        let (directory, store, _, alice) = setup().await;
        let student = UserIdentity::new("s@student.chula.ac.th".into(), "S".into(), "s".into())
            .with_roles(["student"]);

        let err = directory
            .ban_user(&student, alice.id, Some("no".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthorizationDenied));
        let err = directory
            .set_role(&student, alice.id, vec!["admin".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthorizationDenied));

        let unchanged = store.find_identity(alice.id).await.unwrap().unwrap();
        assert_eq!(unchanged, alice);
    }
}
