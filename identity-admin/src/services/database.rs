//! PostgreSQL implementation of the client and identity stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::identity::IdentityRow;
use crate::models::{
    BanState, ClientChanges, OAuthClient, RevocationSummary, StoredSecret, UserIdentity, UserQuery,
};
use crate::services::error::StoreError;
use crate::services::store::{ClientStore, IdentityStore};

const CLIENT_COLUMNS: &str = "id, client_id, client_secret_hash, name, description, redirect_uris, \
     scopes, client_uri, contacts, policy_uri, tos_uri, client_type, owner_id, disabled, \
     created_at, updated_at";

const IDENTITY_COLUMNS: &str =
    "id, email, name, ouid, roles, banned, ban_reason, ban_expires, created_at, updated_at";

const IDENTITY_FILTER: &str = "$1::TEXT IS NULL \
     OR name ILIKE $1 \
     OR email ILIKE $1 \
     OR EXISTS (SELECT 1 FROM unnest(roles) AS r(role) WHERE r.role ILIKE $1)";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turn free text into an ILIKE substring pattern, escaping wildcards.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl ClientStore for Database {
    async fn insert_client(&self, client: &OAuthClient, digest: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        sqlx::query(
            "INSERT INTO oauth_secret_history (secret_digest, client_id, issued_at) VALUES ($1, $2, $3)",
        )
        .bind(digest)
        .bind(&client.client_id)
        .bind(client.created_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO oauth_applications (
                id, client_id, client_secret_hash, name, description, redirect_uris, scopes,
                client_uri, contacts, policy_uri, tos_uri, client_type, owner_id, disabled,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(client.id)
        .bind(&client.client_id)
        .bind(&client.client_secret_hash)
        .bind(&client.name)
        .bind(&client.description)
        .bind(&client.redirect_uris)
        .bind(&client.scopes)
        .bind(&client.client_uri)
        .bind(&client.contacts)
        .bind(&client.policy_uri)
        .bind(&client.tos_uri)
        .bind(&client.client_type)
        .bind(client.owner_id)
        .bind(client.disabled)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<OAuthClient>, StoreError> {
        let sql = format!(
            "SELECT {} FROM oauth_applications WHERE client_id = $1",
            CLIENT_COLUMNS
        );
        sqlx::query_as::<_, OAuthClient>(&sql)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn list_clients(&self, owner: Option<Uuid>) -> Result<Vec<OAuthClient>, StoreError> {
        let sql = format!(
            "SELECT {} FROM oauth_applications \
             WHERE $1::UUID IS NULL OR owner_id = $1 \
             ORDER BY created_at DESC",
            CLIENT_COLUMNS
        );
        sqlx::query_as::<_, OAuthClient>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update_client(
        &self,
        client_id: &str,
        changes: &ClientChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthClient>, StoreError> {
        // Only touches metadata columns; a concurrent secret rotation is
        // never overwritten.
        let sql = format!(
            r#"
            UPDATE oauth_applications SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                redirect_uris = COALESCE($4, redirect_uris),
                scopes = COALESCE($5, scopes),
                updated_at = $6
            WHERE client_id = $1 AND disabled = FALSE
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        );
        sqlx::query_as::<_, OAuthClient>(&sql)
            .bind(client_id)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(&changes.redirect_uris)
            .bind(&changes.scopes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn replace_client_secret(
        &self,
        client_id: &str,
        secret: &StoredSecret,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        sqlx::query(
            "INSERT INTO oauth_secret_history (secret_digest, client_id, issued_at) VALUES ($1, $2, $3)",
        )
        .bind(&secret.digest)
        .bind(client_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let result = sqlx::query(
            r#"
            UPDATE oauth_applications
            SET client_secret_hash = $2, updated_at = $3
            WHERE client_id = $1 AND disabled = FALSE
            "#,
        )
        .bind(client_id)
        .bind(&secret.hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(StoreError::from_sqlx)?;
            return Ok(false);
        }

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(true)
    }

    async fn disable_client(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RevocationSummary>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        let result = sqlx::query(
            "UPDATE oauth_applications SET disabled = TRUE, updated_at = $2 WHERE client_id = $1",
        )
        .bind(client_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(StoreError::from_sqlx)?;
            return Ok(None);
        }

        let access_tokens = sqlx::query("DELETE FROM oauth_access_tokens WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?
            .rows_affected();

        let consents = sqlx::query("DELETE FROM oauth_consents WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?
            .rows_affected();

        tx.commit().await.map_err(StoreError::from_sqlx)?;

        Ok(Some(RevocationSummary {
            access_tokens,
            consents,
        }))
    }
}

#[async_trait]
impl IdentityStore for Database {
    async fn insert_identity(&self, identity: &UserIdentity) -> Result<(), StoreError> {
        let roles: Vec<String> = identity.roles.iter().cloned().collect();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, name, ouid, roles, banned, ban_reason, ban_expires,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.name)
        .bind(&identity.ouid)
        .bind(&roles)
        .bind(identity.banned)
        .bind(&identity.ban_reason)
        .bind(identity.ban_expires)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<UserIdentity>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", IDENTITY_COLUMNS);
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(row.map(UserIdentity::from))
    }

    async fn list_identities(
        &self,
        query: &UserQuery,
    ) -> Result<(Vec<UserIdentity>, i64), StoreError> {
        let pattern = query.search.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM users WHERE {}",
            IDENTITY_FILTER
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            IDENTITY_COLUMNS, IDENTITY_FILTER
        );
        let rows = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(&pattern)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        Ok((rows.into_iter().map(UserIdentity::from).collect(), total))
    }

    async fn set_roles(
        &self,
        id: Uuid,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET roles = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(roles)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_ban(
        &self,
        id: Uuid,
        state: &BanState,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET banned = $2, ban_reason = $3, ban_expires = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state.banned_flag())
        .bind(state.reason())
        .bind(state.expires())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }
}
