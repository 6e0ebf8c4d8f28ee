use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use subtle::ConstantTimeEq;

pub const HOOK_API_KEY_HEADER: &str = "x-hook-api-key";

/// Guards internal hooks called by the IdP runtime.
pub async fn hook_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let presented = headers
        .get(HOOK_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(key)
            if bool::from(
                key.as_bytes()
                    .ct_eq(state.config.security.hook_api_key.as_bytes()),
            ) =>
        {
            next.run(request).await
        }
        _ => {
            tracing::warn!("Failed hook authentication attempt");
            AppError::Unauthorized(anyhow::anyhow!("Invalid or missing hook API key"))
                .into_response()
        }
    }
}
