//! Hooks called by the IdP runtime, guarded by the shared hook key.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        clients::{VerifySecretRequest, VerifySecretResponse},
        users::ProvisionUserRequest,
        ErrorResponse,
    },
    models::UserIdentity,
    utils::{ClientSecret, ValidatedJson},
    AppState,
};

/// Provision an identity on first sign-in
///
/// Derives the OUID from the email before the identity is stored.
#[utoipa::path(
    post,
    path = "/api/auth/internal/provision-user",
    request_body = ProvisionUserRequest,
    responses(
        (status = 201, description = "Identity created", body = UserIdentity),
        (status = 401, description = "Invalid hook key", body = ErrorResponse),
        (status = 409, description = "Email or OUID already taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Internal",
    security(("hook_api_key" = []))
)]
pub async fn provision_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ProvisionUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = state.directory.provision(&req.email, &req.name).await?;
    Ok((StatusCode::CREATED, Json(identity)))
}

/// Verify a client secret
///
/// Revoked clients never verify.
#[utoipa::path(
    post,
    path = "/api/auth/internal/verify-client-secret",
    request_body = VerifySecretRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifySecretResponse),
        (status = 401, description = "Invalid hook key", body = ErrorResponse)
    ),
    tag = "Internal",
    security(("hook_api_key" = []))
)]
pub async fn verify_client_secret(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifySecretRequest>,
) -> Result<Json<VerifySecretResponse>, AppError> {
    let secret = ClientSecret::new(req.client_secret);
    let valid = state
        .registry
        .verify_secret(&req.client_id, &secret)
        .await?;
    if !valid {
        tracing::warn!(client_id = %req.client_id, "Client secret verification failed");
    }
    Ok(Json(VerifySecretResponse { valid }))
}
