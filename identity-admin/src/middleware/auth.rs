use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use service_core::error::AppError;
use service_core::middleware::tracing::RequestId;
use uuid::Uuid;

use crate::{
    models::UserIdentity,
    services::{ServiceError, SessionCredential},
    AppState,
};

/// Prefix the IdP runtime adds to its cookies when served over HTTPS.
const SECURE_COOKIE_PREFIX: &str = "__Secure-";

/// Resolve the caller's session through the IdP runtime and load their
/// identity.
///
/// 401 when no session resolves to a known identity, 403 when the identity
/// is banned, 503 when the IdP cannot be reached.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = extract_credential(&req, &jar, &state.config.idp.session_cookie_name)
        .ok_or(ServiceError::AuthenticationRequired)?;

    let request_id = req.extensions().get::<RequestId>().map(|r| r.0.clone());

    let user_id = state
        .sessions
        .resolve_session(&credential, request_id.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Session lookup failed");
            ServiceError::ExternalService(e)
        })?
        .ok_or(ServiceError::AuthenticationRequired)?;

    let user_id = Uuid::parse_str(&user_id).map_err(|_| {
        tracing::warn!(user_id = %user_id, "Session resolved to a malformed user id");
        ServiceError::AuthenticationRequired
    })?;

    let identity = state
        .identities
        .find_identity(user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::AuthenticationRequired)?;

    if identity.is_banned_at(Utc::now()) {
        tracing::warn!(user_id = %identity.id, "Banned user rejected");
        return Err(ServiceError::AuthorizationDenied.into());
    }

    req.extensions_mut().insert(CurrentUser(identity));
    Ok(next.run(req).await)
}

fn extract_credential(req: &Request, jar: &CookieJar, cookie_name: &str) -> Option<SessionCredential> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(SessionCredential::Bearer(token.to_string()));
    }

    jar.get(cookie_name)
        .or_else(|| jar.get(&format!("{}{}", SECURE_COOKIE_PREFIX, cookie_name)))
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .map(SessionCredential::Cookie)
}

/// The authenticated caller, as loaded by `session_auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserIdentity);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))
    }
}
