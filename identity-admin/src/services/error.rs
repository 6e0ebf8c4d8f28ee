use service_core::error::AppError;
use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint was violated; carries the constraint name.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Map a sqlx error, lifting unique violations and pool exhaustion into
    /// their own variants.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                StoreError::Unavailable(anyhow::Error::new(err))
            }
            other => StoreError::Database(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Forbidden")]
    AuthorizationDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Caller-facing text for a unique violation. Constraint names stay in logs.
fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "users_ouid_key" => "An identity with this OUID already exists",
        "users_email_key" => "An identity with this email already exists",
        "oauth_applications_client_id_key" | "oauth_secret_history_pkey" => {
            "Could not allocate unique client credentials"
        }
        _ => "Resource already exists",
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                tracing::info!(constraint = %constraint, "Unique constraint violated");
                ServiceError::Conflict(conflict_message(&constraint).to_string())
            }
            StoreError::Unavailable(e) => ServiceError::ExternalService(e),
            StoreError::Database(e) => ServiceError::Internal(anyhow::Error::new(e)),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { field, message } => {
                AppError::invalid_field(field, "invalid", message)
            }
            ServiceError::AuthenticationRequired => {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            // Never say which resource or why
            ServiceError::AuthorizationDenied => AppError::Forbidden(anyhow::anyhow!("Forbidden")),
            ServiceError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{} not found", what)),
            ServiceError::Conflict(e) => AppError::Conflict(anyhow::anyhow!(e)),
            ServiceError::ExternalService(e) => AppError::ServiceUnavailable(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
