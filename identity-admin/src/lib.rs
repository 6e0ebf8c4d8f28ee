pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rbac;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use service_core::observability::REQUEST_ID_HEADER;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AdminConfig;
use crate::services::{
    ClientRegistry, ClientStore, IdentityStore, OuidReconciler, SessionGateway, UserDirectory,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::clients::register_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::regenerate_secret,
        handlers::clients::revoke_client,
        handlers::users::list_users,
        handlers::users::set_role,
        handlers::users::ban_user,
        handlers::users::unban_user,
        handlers::permission::has_permission,
        handlers::internal::provision_user,
        handlers::internal::verify_client_secret,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::SuccessResponse,
            dtos::clients::RegisterClientRequest,
            dtos::clients::RegistrationMetadata,
            dtos::clients::RegisterClientResponse,
            dtos::clients::ResponseMetadata,
            dtos::clients::ListClientsResponse,
            dtos::clients::ClientIdRequest,
            dtos::clients::UpdateClientRequest,
            dtos::clients::RegenerateSecretResponse,
            dtos::clients::VerifySecretRequest,
            dtos::clients::VerifySecretResponse,
            dtos::users::ListUsersResponse,
            dtos::users::RoleInput,
            dtos::users::SetRoleRequest,
            dtos::users::BanUserRequest,
            dtos::users::UserIdRequest,
            dtos::users::HasPermissionRequest,
            dtos::users::ProvisionUserRequest,
            models::ClientType,
            models::OAuthClientResponse,
            models::UserIdentity,
            rbac::PermissionRequest,
            rbac::Resource,
            rbac::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "OAuth Clients", description = "OAuth2 client registry"),
        (name = "Users", description = "Admin user directory"),
        (name = "Permissions", description = "Role-based permission checks"),
        (name = "Internal", description = "Hooks called by the IdP runtime"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    config::DEFAULT_SESSION_COOKIE,
                ))),
            );
            components.add_security_scheme(
                "hook_api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    middleware::HOOK_API_KEY_HEADER,
                ))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AdminConfig,
    pub registry: ClientRegistry,
    pub directory: UserDirectory,
    pub identities: Arc<dyn IdentityStore>,
    pub sessions: Arc<dyn SessionGateway>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the registry and directory over one store that backs both
    /// clients and identities.
    pub fn new<S>(
        config: AdminConfig,
        store: Arc<S>,
        sessions: Arc<dyn SessionGateway>,
        metrics: Option<PrometheusHandle>,
    ) -> Self
    where
        S: ClientStore + IdentityStore + 'static,
    {
        let clients: Arc<dyn ClientStore> = store.clone();
        let identities: Arc<dyn IdentityStore> = store;

        let registry = ClientRegistry::new(clients, config.oauth.scopes.clone());
        let reconciler = OuidReconciler::new(&config.identity.institutional_domains);
        let directory = UserDirectory::new(identities.clone(), reconciler);

        Self {
            config,
            registry,
            directory,
            identities,
            sessions,
            metrics,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/oauth2/register", post(handlers::register_client))
        .route("/admin/list-oidc-clients", get(handlers::list_clients))
        .route("/admin/get-oidc-client", post(handlers::get_client))
        .route("/admin/update-oidc-client", post(handlers::update_client))
        .route(
            "/admin/regenerate-oidc-secret",
            post(handlers::regenerate_secret),
        )
        .route("/admin/revoke-oidc-client", post(handlers::revoke_client))
        .route("/admin/list-users", get(handlers::list_users))
        .route("/admin/set-role", post(handlers::set_role))
        .route("/admin/ban-user", post(handlers::ban_user))
        .route("/admin/unban-user", post(handlers::unban_user))
        .route("/admin/has-permission", post(handlers::has_permission))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    let internal_routes = Router::new()
        .route("/internal/provision-user", post(handlers::provision_user))
        .route(
            "/internal/verify-client-secret",
            post(handlers::verify_client_secret),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::hook_auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .nest("/api/auth", session_routes.merge(internal_routes));

    if state.config.swagger_enabled() {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors = cors_layer(&state.config.security.allowed_origins);

    app.with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middleware::HOOK_API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.identities.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable(anyhow::anyhow!("Store unavailable"))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
