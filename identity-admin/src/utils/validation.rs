use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidateEmail};

/// JSON body extractor that runs `validator` rules before the handler.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e)))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Absolute URL with a scheme and a host.
pub fn is_absolute_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(parsed) => parsed.has_host() && !parsed.cannot_be_a_base(),
        Err(_) => false,
    }
}

/// Redirect targets must be absolute, fragment-free and wildcard-free.
pub fn is_valid_redirect_uri(uri: &str) -> bool {
    if uri.trim().is_empty() {
        return false;
    }

    if uri.contains('#') {
        tracing::warn!(redirect_uri = %uri, "Rejected redirect_uri with fragment");
        return false;
    }

    if uri.contains('*') {
        tracing::warn!(redirect_uri = %uri, "Rejected redirect_uri with wildcard");
        return false;
    }

    if !is_absolute_url(uri) {
        tracing::warn!(redirect_uri = %uri, "Rejected malformed redirect_uri");
        return false;
    }

    true
}

pub fn is_valid_email(value: &str) -> bool {
    value.validate_email()
}
