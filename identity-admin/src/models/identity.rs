//! User identity model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// A federated user as seen by the admin plane.
///
/// `ouid` is assigned once at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub ouid: String,
    #[schema(value_type = Vec<String>)]
    pub roles: BTreeSet<String>,
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserIdentity {
    /// Build a fresh, unbanned identity with no roles.
    pub fn new(email: String, name: String, ouid: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            ouid,
            roles: BTreeSet::new(),
            banned: false,
            ban_reason: None,
            ban_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a ban is in force at `now`. An expired ban is treated as
    /// lifted even before the IdP runtime clears it.
    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.banned && self.ban_expires.map_or(true, |expires| expires > now)
    }

    /// Apply a ban state to the in-memory record.
    pub fn apply_ban(&mut self, state: &BanState, now: DateTime<Utc>) {
        match state {
            BanState::Active => {
                self.banned = false;
                self.ban_reason = None;
                self.ban_expires = None;
            }
            BanState::Banned { reason, expires } => {
                self.banned = true;
                self.ban_reason = Some(reason.clone());
                self.ban_expires = *expires;
            }
        }
        self.updated_at = now;
    }
}

pub const DEFAULT_BAN_REASON: &str = "No reason provided";

/// Ban lifecycle of an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanState {
    Active,
    Banned {
        reason: String,
        expires: Option<DateTime<Utc>>,
    },
}

impl BanState {
    pub fn banned_flag(&self) -> bool {
        matches!(self, BanState::Banned { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            BanState::Active => None,
            BanState::Banned { reason, .. } => Some(reason),
        }
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        match self {
            BanState::Active => None,
            BanState::Banned { expires, .. } => *expires,
        }
    }
}

/// Raw `users` row; roles arrive as a Postgres array.
#[derive(Debug, FromRow)]
pub(crate) struct IdentityRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub ouid: String,
    pub roles: Vec<String>,
    pub banned: bool,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IdentityRow> for UserIdentity {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            ouid: row.ouid,
            roles: row.roles.into_iter().collect(),
            banned: row.banned,
            ban_reason: row.ban_reason,
            ban_expires: row.ban_expires,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Free-text filter and paging for the user listing.
#[derive(Debug, Clone)]
pub struct UserQuery {
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl UserQuery {
    pub const DEFAULT_LIMIT: i64 = 100;

    /// Case-insensitive match over name, email and any role.
    pub fn matches(&self, identity: &UserIdentity) -> bool {
        let Some(needle) = self.search.as_deref().map(str::to_lowercase) else {
            return true;
        };
        identity.name.to_lowercase().contains(&needle)
            || identity.email.to_lowercase().contains(&needle)
            || identity
                .roles
                .iter()
                .any(|role| role.to_lowercase().contains(&needle))
    }
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            search: None,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
