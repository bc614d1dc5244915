use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure reported by an external metadata source
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection error, timeout, HTTP 5xx or HTTP 429. Worth retrying.
    #[error("Transient fetch error: {0}")]
    Transient(String),

    /// Any other client-side rejection. Retrying in the same run will not help.
    #[error("Permanent fetch error: {0}")]
    Permanent(String),

    /// The source has no record matching the query.
    #[error("No matching record: {0}")]
    NotFound(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Failure reported by the graph store
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Transient store error: {0}")]
    Transient(String),

    #[error("Fatal store error: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Job already running: {0}")]
    AlreadyRunning(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::AlreadyRunning(_) => StatusCode::CONFLICT,
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(StoreError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::Fatal(_))
            | AppError::Config(_)
            | AppError::Cancelled
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
pub type FetchResult<T> = Result<T, FetchError>;
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_fetch_errors_retry() {
        assert!(FetchError::Transient("timeout".to_string()).is_retryable());
        assert!(!FetchError::Permanent("400".to_string()).is_retryable());
        assert!(!FetchError::NotFound("tt0000001".to_string()).is_retryable());
    }

    #[test]
    fn test_already_running_maps_to_conflict() {
        let response = AppError::AlreadyRunning("similarities".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_transient_store_error_maps_to_unavailable() {
        let response = AppError::from(StoreError::Transient("leader switch".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
