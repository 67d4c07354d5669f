//! Error types for the paydesk client

use thiserror::Error;

/// Server message that means the session token is no longer accepted.
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required.";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The token is missing, unknown or revoked. The user has to sign in again.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The token is valid but lacks the permission for this action.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The server rejected the input. Carries every reported problem.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// An upload targeted a month that already has records.
    #[error("Batch conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// PDF export refused locally; the page holds too many records.
    #[error("Cannot generate a PDF with {count} rows (limit is fewer than {limit})")]
    TooManyRows { count: usize, limit: usize },

    /// The search keyword mixes digits and letters.
    #[error("Search keyword must be a Name or SSS Number")]
    InvalidKeyword,

    /// Any other non-success response.
    #[error("Request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status behind this error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthenticationRequired => Some(401),
            ClientError::PermissionDenied(_) => Some(403),
            ClientError::Validation(_) => Some(400),
            ClientError::NotFound(_) => Some(404),
            ClientError::Conflict(_) => Some(409),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map an error response to a `ClientError`.
///
/// `messages` are the entries of the body's `message` field, which the
/// server sends either as a string or as a list of strings.
pub(crate) fn map_status_to_error(status: u16, messages: Vec<String>) -> ClientError {
    let joined = if messages.is_empty() {
        format!("Request failed: {}", status)
    } else {
        messages.join("; ")
    };

    match status {
        401 => ClientError::AuthenticationRequired,
        403 => ClientError::PermissionDenied(joined),
        404 => ClientError::NotFound(joined),
        409 => ClientError::Conflict(joined),
        400 | 422 => ClientError::Validation(if messages.is_empty() {
            vec![joined]
        } else {
            messages
        }),
        _ => ClientError::Api {
            status,
            message: joined,
        },
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
