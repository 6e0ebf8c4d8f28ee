use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        users::{
            BanUserRequest, ListUsersQuery, ListUsersResponse, SetRoleRequest, UserIdRequest,
        },
        ErrorResponse, SuccessResponse,
    },
    middleware::CurrentUser,
    utils::ValidatedJson,
    AppState,
};

/// List users
#[utoipa::path(
    get,
    path = "/api/auth/admin/list-users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Matching users", body = ListUsersResponse),
        (status = 403, description = "Missing user:list", body = ErrorResponse),
        (status = 422, description = "Bad paging parameters", body = ErrorResponse)
    ),
    tag = "Users",
    security(("session_token" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, AppError> {
    let query = query.into_query()?;
    let (users, total) = state.directory.list_users(&actor, &query).await?;
    Ok(Json(ListUsersResponse { users, total }))
}

/// Replace a user's roles
#[utoipa::path(
    post,
    path = "/api/auth/admin/set-role",
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Roles replaced", body = SuccessResponse),
        (status = 403, description = "Missing user:set-role", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Unknown role", body = ErrorResponse)
    ),
    tag = "Users",
    security(("session_token" = []))
)]
pub async fn set_role(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<SetRoleRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .directory
        .set_role(&actor, req.user_id, req.role.into_vec())
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Ban a user
#[utoipa::path(
    post,
    path = "/api/auth/admin/ban-user",
    request_body = BanUserRequest,
    responses(
        (status = 200, description = "User banned", body = SuccessResponse),
        (status = 403, description = "Missing user:ban", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Users",
    security(("session_token" = []))
)]
pub async fn ban_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<BanUserRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .directory
        .ban_user(&actor, req.user_id, req.ban_reason, req.ban_expires_in)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Lift a ban
#[utoipa::path(
    post,
    path = "/api/auth/admin/unban-user",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "User unbanned", body = SuccessResponse),
        (status = 403, description = "Missing user:ban", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Users",
    security(("session_token" = []))
)]
pub async fn unban_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<UserIdRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.directory.unban_user(&actor, req.user_id).await?;
    Ok(Json(SuccessResponse::ok()))
}
