use axum::Json;
use service_core::error::AppError;

use crate::{
    dtos::{users::HasPermissionRequest, ErrorResponse, SuccessResponse},
    middleware::CurrentUser,
    rbac,
    services::ServiceError,
    utils::ValidatedJson,
};

/// Check the caller's permissions
///
/// `success` is true when the caller's roles together grant every requested
/// action.
#[utoipa::path(
    post,
    path = "/api/auth/admin/has-permission",
    request_body = HasPermissionRequest,
    responses(
        (status = 200, description = "Evaluation result", body = SuccessResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 422, description = "Empty permission request", body = ErrorResponse)
    ),
    tag = "Permissions",
    security(("session_token" = []))
)]
pub async fn has_permission(
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<HasPermissionRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.permission.is_empty() {
        return Err(ServiceError::validation("permission", "No permissions requested").into());
    }

    let success = rbac::has_permission(actor.roles.iter().map(String::as_str), &req.permission);
    tracing::debug!(
        actor_id = %actor.id,
        requested = %req.permission,
        success,
        "Permission check"
    );

    Ok(Json(SuccessResponse { success }))
}
