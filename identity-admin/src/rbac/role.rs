//! Role catalog - fixed named roles and the actions each one grants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::permission::{Resource, SESSION_ACTIONS, USER_ACTIONS};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Impersonator,
    Developer,
    Officer,
    Student,
    Staff,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::User,
        Role::Impersonator,
        Role::Developer,
        Role::Officer,
        Role::Student,
        Role::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Impersonator => "impersonator",
            Role::Developer => "developer",
            Role::Officer => "officer",
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }

    /// Actions this role grants on `resource`. Empty when the role has no
    /// statement for it.
    ///
    /// Admin carries no `oauth:read`; deployments give admins the `user`
    /// role alongside to list clients.
    pub fn grants(&self, resource: Resource) -> &'static [&'static str] {
        match (self, resource) {
            (Role::Admin, Resource::Oauth) => &["create", "update", "delete"],
            (Role::Admin, Resource::Profile) => &["read", "update"],
            (Role::Admin, Resource::User) => USER_ACTIONS,
            (Role::Admin, Resource::Session) => SESSION_ACTIONS,

            (Role::User, Resource::Oauth) => &["read"],

            (Role::Impersonator, Resource::User) => &["impersonate", "list"],

            (Role::Developer, Resource::Oauth) => &["read", "create", "update"],

            (Role::Officer, Resource::Oauth) => &["read", "update"],
            (Role::Officer, Resource::Profile) => &["read", "update"],

            (Role::Student, Resource::Oauth) => &["read"],

            (Role::Staff, Resource::Oauth) => &["read"],
            (Role::Staff, Resource::Profile) => &["read", "update"],

            _ => &[],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}
