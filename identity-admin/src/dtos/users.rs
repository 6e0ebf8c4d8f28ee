use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{UserIdentity, UserQuery};
use crate::rbac::PermissionRequest;
use crate::services::ServiceError;

pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Case-insensitive match over name, email and roles.
    pub search_value: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListUsersQuery {
    pub fn into_query(self) -> Result<UserQuery, ServiceError> {
        let limit = self.limit.unwrap_or(UserQuery::DEFAULT_LIMIT);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ServiceError::validation(
                "limit",
                format!("limit must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ServiceError::validation("offset", "offset must not be negative"));
        }

        Ok(UserQuery {
            search: self
                .search_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            limit,
            offset,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListUsersResponse {
    pub users: Vec<UserIdentity>,
    pub total: i64,
}

/// A single role name or a list of them.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RoleInput {
    One(String),
    Many(Vec<String>),
}

impl RoleInput {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RoleInput::One(role) => vec![role],
            RoleInput::Many(roles) => roles,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleRequest {
    pub user_id: Uuid,
    pub role: RoleInput,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BanUserRequest {
    pub user_id: Uuid,
    #[validate(length(max = 500, message = "Ban reason is too long"))]
    pub ban_reason: Option<String>,
    /// Seconds until the ban lapses; omit for a permanent ban.
    #[schema(example = 86400)]
    pub ban_expires_in: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct HasPermissionRequest {
    #[serde(alias = "permissions")]
    pub permission: PermissionRequest,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProvisionUserRequest {
    #[validate(email(message = "Email is invalid"))]
    #[schema(example = "alice@student.chula.ac.th")]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}
