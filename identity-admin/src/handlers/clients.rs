use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        clients::{
            ClientIdRequest, ListClientsQuery, ListClientsResponse, RegenerateSecretResponse,
            RegisterClientRequest, RegisterClientResponse, UpdateClientRequest,
        },
        ErrorResponse, SuccessResponse,
    },
    middleware::CurrentUser,
    models::OAuthClientResponse,
    utils::ValidatedJson,
    AppState,
};

/// Register a new OAuth2 client
///
/// The plaintext secret appears in this response only.
#[utoipa::path(
    post,
    path = "/api/auth/oauth2/register",
    request_body = RegisterClientRequest,
    responses(
        (status = 201, description = "Client registered", body = RegisterClientResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Missing oauth:create", body = ErrorResponse),
        (status = 409, description = "Credential allocation failed", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "OAuth Clients",
    security(("session_token" = []))
)]
pub async fn register_client(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<RegisterClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state
        .registry
        .register(&actor, req.into_metadata())
        .await?;

    Ok((StatusCode::CREATED, Json(RegisterClientResponse::from(issued))))
}

/// List OAuth2 clients
#[utoipa::path(
    get,
    path = "/api/auth/admin/list-oidc-clients",
    params(ListClientsQuery),
    responses(
        (status = 200, description = "Clients, newest first", body = ListClientsResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Missing oauth:read", body = ErrorResponse)
    ),
    tag = "OAuth Clients",
    security(("session_token" = []))
)]
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<ListClientsResponse>, AppError> {
    let clients = state.registry.list(&actor, query.owner).await?;

    Ok(Json(ListClientsResponse {
        clients: clients.into_iter().map(OAuthClientResponse::from).collect(),
    }))
}

/// Fetch one OAuth2 client
#[utoipa::path(
    post,
    path = "/api/auth/admin/get-oidc-client",
    request_body = ClientIdRequest,
    responses(
        (status = 200, description = "Client found", body = OAuthClientResponse),
        (status = 403, description = "Missing oauth:read", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    tag = "OAuth Clients",
    security(("session_token" = []))
)]
pub async fn get_client(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<ClientIdRequest>,
) -> Result<Json<OAuthClientResponse>, AppError> {
    let client = state.registry.get(&actor, &req.client_id).await?;
    Ok(Json(client.into()))
}

/// Update client metadata
///
/// Omitted fields are left unchanged. The secret is never touched.
#[utoipa::path(
    post,
    path = "/api/auth/admin/update-oidc-client",
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = SuccessResponse),
        (status = 403, description = "Missing oauth:update", body = ErrorResponse),
        (status = 404, description = "Client not found or revoked", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "OAuth Clients",
    security(("session_token" = []))
)]
pub async fn update_client(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let (client_id, changes) = req.into_changes();
    state.registry.update(&actor, &client_id, changes).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Rotate a client secret
#[utoipa::path(
    post,
    path = "/api/auth/admin/regenerate-oidc-secret",
    request_body = ClientIdRequest,
    responses(
        (status = 200, description = "New secret issued", body = RegenerateSecretResponse),
        (status = 403, description = "Missing oauth:update", body = ErrorResponse),
        (status = 404, description = "Client not found or revoked", body = ErrorResponse)
    ),
    tag = "OAuth Clients",
    security(("session_token" = []))
)]
pub async fn regenerate_secret(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<ClientIdRequest>,
) -> Result<Json<RegenerateSecretResponse>, AppError> {
    let secret = state
        .registry
        .regenerate_secret(&actor, &req.client_id)
        .await?;

    Ok(Json(RegenerateSecretResponse {
        client_id: req.client_id,
        client_secret: secret.into_string(),
    }))
}

/// Revoke a client
///
/// Disables the client and deletes its outstanding tokens and consents.
#[utoipa::path(
    post,
    path = "/api/auth/admin/revoke-oidc-client",
    request_body = ClientIdRequest,
    responses(
        (status = 200, description = "Client revoked", body = SuccessResponse),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    tag = "OAuth Clients",
    security(("session_token" = []))
)]
pub async fn revoke_client(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(req): ValidatedJson<ClientIdRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.registry.revoke(&actor, &req.client_id).await?;
    Ok(Json(SuccessResponse::ok()))
}
