//! Permission catalog - the fixed resource/action vocabulary RBAC statements
//! are built from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Actions on user identities (admin baseline).
pub const USER_ACTIONS: &[&str] = &[
    "create",
    "list",
    "set-role",
    "ban",
    "impersonate",
    "delete",
    "set-password",
];

/// Actions on IdP sessions (admin baseline).
pub const SESSION_ACTIONS: &[&str] = &["list", "revoke", "delete"];

/// Actions on OAuth2 client applications.
pub const OAUTH_ACTIONS: &[&str] = &["create", "read", "update", "delete", "delete-self"];

/// Actions on user profiles.
pub const PROFILE_ACTIONS: &[&str] = &["create", "read", "update"];

/// A resource that RBAC statements refer to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    User,
    Session,
    Oauth,
    Profile,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::User,
        Resource::Session,
        Resource::Oauth,
        Resource::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::Session => "session",
            Resource::Oauth => "oauth",
            Resource::Profile => "profile",
        }
    }

    /// Every action this resource supports.
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Resource::User => USER_ACTIONS,
            Resource::Session => SESSION_ACTIONS,
            Resource::Oauth => OAUTH_ACTIONS,
            Resource::Profile => PROFILE_ACTIONS,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Resource::User),
            "session" => Ok(Resource::Session),
            "oauth" => Ok(Resource::Oauth),
            "profile" => Ok(Resource::Profile),
            _ => Err(format!("Unknown resource: {}", s)),
        }
    }
}

/// A requested (resource -> actions) set, as sent by callers of the
/// permission check.
///
/// Keys stay as raw strings: an unknown resource must evaluate to a denial,
/// not a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PermissionRequest(
    #[schema(value_type = Object)] BTreeMap<String, BTreeSet<String>>,
);

impl PermissionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add actions on a resource to the request.
    pub fn with(mut self, resource: Resource, actions: &[&str]) -> Self {
        self.0
            .entry(resource.as_str().to_string())
            .or_default()
            .extend(actions.iter().map(|a| a.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|actions| actions.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for PermissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (resource, actions) in &self.0 {
            for action in actions {
                if !first {
                    f.write_str(",")?;
                }
                write!(f, "{}:{}", resource, action)?;
                first = false;
            }
        }
        Ok(())
    }
}
