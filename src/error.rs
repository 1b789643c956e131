use crate::types::{ApiResponse, EmptyData};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

/// Application-specific error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("User is already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Payment signature verification failed")]
    InvalidSignature,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Database connection failed")]
    DatabaseConnection,

    #[error("Database operation failed: {0}")]
    DatabaseOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyEnrolled => StatusCode::CONFLICT,
            AppError::InvalidSignature | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            AppError::DatabaseConnection
            | AppError::DatabaseOperation(_)
            | AppError::Config(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable identifier clients can match on
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::AlreadyEnrolled => "already_enrolled",
            AppError::InvalidSignature => "invalid_signature",
            AppError::Unauthorized => "unauthorized",
            AppError::PaymentGateway(_) => "payment_gateway_error",
            AppError::Validation(_) => "validation_error",
            AppError::DatabaseConnection
            | AppError::DatabaseOperation(_)
            | AppError::Config(_)
            | AppError::InternalError(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
            sentry::capture_error(&self);
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "request rejected");
        }

        let response_body = ApiResponse::<EmptyData>::error(self.kind(), self.to_string());

        (status_code, Json(response_body)).into_response()
    }
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types
impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        AppError::DatabaseOperation(err.to_string())
    }
}

impl From<diesel::ConnectionError> for AppError {
    fn from(err: diesel::ConnectionError) -> Self {
        tracing::error!(error = %err, "failed to open database connection");
        AppError::DatabaseConnection
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::PaymentGateway(format!("request timed out: {}", err))
        } else if err.is_connect() {
            AppError::PaymentGateway(format!("gateway unreachable: {}", err))
        } else {
            AppError::PaymentGateway(err.to_string())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
