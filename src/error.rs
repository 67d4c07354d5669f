use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// User-facing error messages shared across handlers.
pub mod msg {
    pub const AUTH_REQUIRED: &str = "Authentication required.";
    pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";
    pub const RECORD_NOT_FOUND: &str = "Contribution record not found";
    pub const INVALID_REQUEST_BODY: &str = "Invalid request body";
    pub const INVALID_QUERY: &str = "Invalid query parameters";
    pub const INVALID_PATH: &str = "Invalid path parameter";
    pub const BATCH_EXISTS: &str =
        "A batch already exists for this month. Resubmit with overwrite to replace it.";
    pub const CSV_MISSING: &str = "The csv file is required.";
    pub const BATCH_DATE_MISSING: &str = "The batch date field is required.";
    pub const CSV_EMPTY: &str = "The csv file has no contribution rows.";

    pub const CUSTOMER_ID_REQUIRED: &str = "The customer id field is required.";
    pub const PRICE_ID_REQUIRED: &str = "The price id field is required.";
    pub const AMOUNT_INVALID: &str = "The amount must be a positive integer in minor units.";
    pub const CURRENCY_REQUIRED: &str = "The currency field is required.";
    pub const INVALID_GATEWAY_ID: &str = "Invalid payment gateway object id";

    pub const CHECKOUT_FAILED: &str = "Failed to create checkout session";
    pub const SUBSCRIPTION_FAILED: &str = "Failed to create subscription";
    pub const SUBSCRIPTION_RETRIEVE_FAILED: &str = "Failed to retrieve subscription";
    pub const PAYMENT_FAILED: &str = "Failed to create payment";
    pub const PAYMENT_RETRIEVE_FAILED: &str = "Failed to retrieve payment";
    pub const PAYMENT_LINK_FAILED: &str = "Failed to create payment link";
    pub const PAYMENT_LINK_RETRIEVE_FAILED: &str = "Failed to retrieve payment link";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payment gateway rejected the call or could not be reached.
    #[error("{context}: {message}")]
    Gateway {
        context: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn gateway(context: &'static str, message: impl Into<String>) -> Self {
        AppError::Gateway {
            context,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": errors }),
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "status": "error", "message": message }),
            ),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": message }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "status": "error", "message": msg::AUTH_REQUIRED }),
            ),
            AppError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({ "status": "error", "message": message }),
            ),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                json!({ "status": "error", "message": message }),
            ),
            AppError::Gateway { context, message } => {
                tracing::error!("Payment gateway error ({}): {}", context, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": context, "error": message }),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                internal_error()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                internal_error()
            }
            AppError::Json(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": format!("Invalid JSON: {}", e) }),
            ),
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                internal_error()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal_error() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "status": "error", "message": "Internal server error" }),
    )
}

/// Converts `Option<T>` lookups into 404s.
pub trait OptionExt<T> {
    fn or_not_found(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, message: &str) -> Result<T> {
        self.ok_or_else(|| AppError::NotFound(message.into()))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
